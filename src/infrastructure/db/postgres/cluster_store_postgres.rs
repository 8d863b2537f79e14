use crate::infrastructure::db::dto::ClusterRow;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::cluster_store::{ClusterRepositoryError, ClusterStore};
use async_trait::async_trait;
use sqlx::PgConnection;

#[derive(Clone)]
pub struct ClusterStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl ClusterStorePostgres {
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn get_by_slug_impl_conn(
        conn: &mut PgConnection,
        slug: &str,
    ) -> Result<Option<ClusterRow>, ClusterRepositoryError> {
        let row = sqlx::query_as::<_, ClusterRow>(
            "SELECT slug, hostname, port, username, password
            FROM clusters
            WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| ClusterRepositoryError::StorageUnavailable)?;

        Ok(row)
    }
}

#[async_trait]
impl ClusterStore for ClusterStorePostgres {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<ClusterRow>, ClusterRepositoryError> {
        let slug = slug.to_string();
        self.db
            .with_conn(move |conn| {
                Box::pin(async move { Self::get_by_slug_impl_conn(conn, &slug).await })
            })
            .await
    }
}
