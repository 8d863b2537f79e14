pub mod directory;
pub mod rapi_client;

use crate::domain::entities::cluster_job::JobStatus;
use crate::domain::value_objects::ids::ClusterJobId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("cluster unreachable: {0}")]
    Unreachable(String),

    #[error("cluster server error: HTTP {status}")]
    Server { status: u16 },

    #[error("malformed cluster response: {0}")]
    Malformed(String),

    #[error("cluster rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("cluster registry unavailable")]
    Registry,
}

impl ClusterError {
    /// Failures that are expected to clear up on their own and are retried silently.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClusterError::Unreachable(_) | ClusterError::Server { .. } | ClusterError::Registry
        )
    }
}

/// Read-only view of one cluster's job API.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    fn slug(&self) -> &str;
    fn hostname(&self) -> &str;
    async fn get_job_status(&self, job_id: ClusterJobId) -> Result<JobStatus, ClusterError>;
}

/// Resolves cluster slugs to API clients.
#[async_trait]
pub trait ClusterResolver: Send + Sync {
    /// Returns `None` for slugs with no registered cluster.
    async fn resolve(&self, slug: &str) -> Result<Option<Arc<dyn ClusterApi>>, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::ClusterError;

    #[test]
    fn given_error_kinds_when_classified_should_only_retry_transient_ones() {
        assert!(ClusterError::Unreachable("timeout".to_string()).is_transient());
        assert!(ClusterError::Server { status: 502 }.is_transient());
        assert!(ClusterError::Registry.is_transient());
        assert!(!ClusterError::Malformed("eof".to_string()).is_transient());
        assert!(
            !ClusterError::Rejected {
                status: 404,
                body: "job not found".to_string()
            }
            .is_transient()
        );
    }
}
