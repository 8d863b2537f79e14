use std::sync::Arc;

use crate::infrastructure::db::database::{Database, DatabaseError};
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::postgres::application_store_postgres::ApplicationStorePostgres;
use crate::infrastructure::db::postgres::cluster_store_postgres::ClusterStorePostgres;
use crate::infrastructure::db::postgres::work_item_store_postgres::WorkItemStorePostgres;
use crate::infrastructure::db::repositories::application_repository::ApplicationRepository;
use crate::infrastructure::db::repositories::cluster_repository::ClusterRepository;
use crate::infrastructure::db::repositories::queue_repository::QueueRepository;

#[derive(Clone)]
pub struct Repositories {
    pub db: Option<Arc<dyn Database>>,
    pub queue: Arc<QueueRepository>,
    pub application: Arc<ApplicationRepository>,
    pub cluster: Arc<ClusterRepository>,
}

impl Repositories {
    /// Build all repositories backed by Postgres stores.
    pub fn postgres(db: Arc<PostgresDatabase>) -> Self {
        let queue_store = Arc::new(WorkItemStorePostgres::new(db.clone()));
        let application_store = Arc::new(ApplicationStorePostgres::new(db.clone()));
        let cluster_store = Arc::new(ClusterStorePostgres::new(db.clone()));

        Self {
            db: Some(db),
            queue: Arc::new(QueueRepository::new(queue_store)),
            application: Arc::new(ApplicationRepository::new(application_store)),
            cluster: Arc::new(ClusterRepository::new(cluster_store)),
        }
    }

    /// Check that the backing store answers.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let Some(db) = self.db.as_ref() else {
            return Err(DatabaseError::Connection("db_unavailable".to_string()));
        };
        db.ping().await
    }
}
