use crate::domain::entities::cluster::Cluster;
use crate::infrastructure::db::dto::ClusterRow;
use crate::infrastructure::db::stores::cluster_store::{ClusterRepositoryError, ClusterStore};
use std::sync::Arc;

pub struct ClusterRepository {
    store: Arc<dyn ClusterStore>,
}

impl ClusterRepository {
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Look up a cluster by slug. Returns `None` for unknown slugs.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Cluster>, ClusterRepositoryError> {
        let row = self.store.get_by_slug(slug).await?;
        Ok(row.map(ClusterRow::into_cluster))
    }
}
