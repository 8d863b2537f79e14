use crate::domain::entities::cluster::Cluster;
use crate::domain::entities::cluster_job::JobStatus;
use crate::domain::value_objects::ids::ClusterJobId;
use crate::infrastructure::cluster::{ClusterApi, ClusterError};
use async_trait::async_trait;
use std::time::Duration;

/// HTTPS client for a cluster's remote API.
pub struct RapiClient {
    cluster: Cluster,
    http: reqwest::Client,
}

impl RapiClient {
    pub fn new(cluster: Cluster, timeout: Duration, verify_tls: bool) -> Result<Self, ClusterError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| ClusterError::Unreachable(e.to_string()))?;

        Ok(Self { cluster, http })
    }

    fn job_url(&self, job_id: ClusterJobId) -> String {
        format!("{}/2/jobs/{}", self.cluster.rapi_base_url(), job_id.0)
    }
}

/// Decode a job status body.
pub fn decode_job_status(body: &str) -> Result<JobStatus, ClusterError> {
    serde_json::from_str(body).map_err(|e| ClusterError::Malformed(e.to_string()))
}

#[async_trait]
impl ClusterApi for RapiClient {
    fn slug(&self) -> &str {
        &self.cluster.slug
    }

    fn hostname(&self) -> &str {
        &self.cluster.hostname
    }

    async fn get_job_status(&self, job_id: ClusterJobId) -> Result<JobStatus, ClusterError> {
        // Step 1: Issue the request, with credentials when the cluster has them.
        let mut request = self.http.get(self.job_url(job_id));
        if let Some(username) = self.cluster.username.as_deref() {
            request = request.basic_auth(username, self.cluster.password.as_deref());
        }
        let response = request.send().await.map_err(|e| {
            if e.is_decode() {
                ClusterError::Malformed(e.to_string())
            } else {
                ClusterError::Unreachable(e.to_string())
            }
        })?;

        // Step 2: Classify non-success statuses.
        let status = response.status();
        if status.is_server_error() {
            return Err(ClusterError::Server {
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| ClusterError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(ClusterError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // Step 3: Decode the job status.
        decode_job_status(&body)
    }
}
