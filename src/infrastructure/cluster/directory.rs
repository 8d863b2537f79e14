use crate::infrastructure::cluster::rapi_client::RapiClient;
use crate::infrastructure::cluster::{ClusterApi, ClusterError, ClusterResolver};
use crate::infrastructure::db::repositories::cluster_repository::ClusterRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Resolves slugs against the cluster registry and keeps one client per cluster.
pub struct ClusterDirectory {
    clusters: Arc<ClusterRepository>,
    request_timeout: Duration,
    verify_tls: bool,
    clients: Mutex<HashMap<String, Arc<dyn ClusterApi>>>,
}

impl ClusterDirectory {
    pub fn new(clusters: Arc<ClusterRepository>, request_timeout: Duration, verify_tls: bool) -> Self {
        Self {
            clusters,
            request_timeout,
            verify_tls,
            clients: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ClusterResolver for ClusterDirectory {
    async fn resolve(&self, slug: &str) -> Result<Option<Arc<dyn ClusterApi>>, ClusterError> {
        if let Some(client) = self.clients.lock().await.get(slug) {
            return Ok(Some(client.clone()));
        }

        let Some(cluster) = self
            .clusters
            .get_by_slug(slug)
            .await
            .map_err(|_| ClusterError::Registry)?
        else {
            return Ok(None);
        };

        let client: Arc<dyn ClusterApi> = Arc::new(RapiClient::new(
            cluster,
            self.request_timeout,
            self.verify_tls,
        )?);
        self.clients
            .lock()
            .await
            .insert(slug.to_string(), client.clone());
        Ok(Some(client))
    }
}
