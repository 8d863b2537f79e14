use crate::infrastructure::db::dto::ApplicationRow;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::application_store::{
    ApplicationRepositoryError, ApplicationStore,
};
use async_trait::async_trait;
use sqlx::PgConnection;

#[derive(Clone)]
pub struct ApplicationStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl ApplicationStorePostgres {
    /// Build a Postgres-backed application ledger.
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn get_impl_conn(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<ApplicationRow>, ApplicationRepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            "SELECT
                id,
                hostname,
                job_id,
                status,
                backend_message,
                applicant_username,
                applicant_email,
                cluster_slug,
                reviewer_username,
                updated_at
            FROM instance_applications
            WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| ApplicationRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn update_outcome_impl_conn(
        conn: &mut PgConnection,
        row: &ApplicationRow,
    ) -> Result<ApplicationRow, ApplicationRepositoryError> {
        // Step 1: Write only the columns the watcher owns.
        let stored = sqlx::query_as::<_, ApplicationRow>(
            "UPDATE instance_applications SET
                status = $2,
                backend_message = $3,
                updated_at = $4
            WHERE id = $1
            RETURNING
                id,
                hostname,
                job_id,
                status,
                backend_message,
                applicant_username,
                applicant_email,
                cluster_slug,
                reviewer_username,
                updated_at",
        )
        .bind(row.id)
        .bind(&row.status)
        .bind(&row.backend_message)
        .bind(row.updated_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| ApplicationRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Err(ApplicationRepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl ApplicationStore for ApplicationStorePostgres {
    async fn get(&self, id: i64) -> Result<Option<ApplicationRow>, ApplicationRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::get_impl_conn(conn, id)))
            .await
    }

    async fn update_outcome(
        &self,
        row: &ApplicationRow,
    ) -> Result<ApplicationRow, ApplicationRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                Box::pin(async move { Self::update_outcome_impl_conn(conn, &row).await })
            })
            .await
    }
}
