use crate::infrastructure::db::dto::WorkItemRow;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::work_item_store::{WorkItemRepositoryError, WorkItemStore};
use async_trait::async_trait;
use sqlx::PgConnection;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct WorkItemStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl WorkItemStorePostgres {
    /// Build a Postgres-backed work queue.
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn insert_impl_conn(
        conn: &mut PgConnection,
        row: &WorkItemRow,
    ) -> Result<WorkItemRow, WorkItemRepositoryError> {
        let stored = sqlx::query_as::<_, WorkItemRow>(
            "INSERT INTO work_items (
                id,
                body,
                state,
                reserve_count,
                lease_owner,
                lease_expires_at,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING
                id,
                body,
                state,
                reserve_count,
                lease_owner,
                lease_expires_at,
                created_at",
        )
        .bind(row.id)
        .bind(&row.body)
        .bind(&row.state)
        .bind(row.reserve_count)
        .bind(&row.lease_owner)
        .bind(row.lease_expires_at)
        .bind(row.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        Ok(stored)
    }

    async fn reserve_impl_conn(
        conn: &mut PgConnection,
        worker_id: &str,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<WorkItemRow>, WorkItemRepositoryError> {
        // Step 1: Claim the oldest ready item, or one whose holder let the lease lapse.
        let row = sqlx::query_as::<_, WorkItemRow>(
            "WITH next_item AS (
                SELECT id
                FROM work_items
                WHERE state = 'ready'
                   OR (state = 'reserved' AND lease_expires_at <= NOW())
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            UPDATE work_items
            SET state = 'reserved',
                reserve_count = reserve_count + 1,
                lease_owner = $1,
                lease_expires_at = $2,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_item)
            RETURNING
                id,
                body,
                state,
                reserve_count,
                lease_owner,
                lease_expires_at,
                created_at",
        )
        .bind(worker_id)
        .bind(lease_expires_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn get_impl_conn(
        conn: &mut PgConnection,
        id: uuid::Uuid,
    ) -> Result<Option<WorkItemRow>, WorkItemRepositoryError> {
        let row = sqlx::query_as::<_, WorkItemRow>(
            "SELECT
                id,
                body,
                state,
                reserve_count,
                lease_owner,
                lease_expires_at,
                created_at
            FROM work_items
            WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn touch_impl_conn(
        conn: &mut PgConnection,
        id: uuid::Uuid,
        worker_id: &str,
        lease_expires_at: OffsetDateTime,
    ) -> Result<(), WorkItemRepositoryError> {
        // Step 1: Extend the lease only for the worker that still holds it.
        let result = sqlx::query(
            "UPDATE work_items
            SET lease_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
              AND lease_owner = $2
              AND state = 'reserved'",
        )
        .bind(id)
        .bind(worker_id)
        .bind(lease_expires_at)
        .execute(&mut *conn)
        .await
        .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(WorkItemRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_impl_conn(
        conn: &mut PgConnection,
        id: uuid::Uuid,
    ) -> Result<(), WorkItemRepositoryError> {
        let result = sqlx::query("DELETE FROM work_items WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(WorkItemRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn bury_impl_conn(
        conn: &mut PgConnection,
        id: uuid::Uuid,
    ) -> Result<(), WorkItemRepositoryError> {
        let result = sqlx::query(
            "UPDATE work_items
            SET state = 'buried',
                lease_owner = NULL,
                lease_expires_at = NULL,
                buried_at = NOW(),
                updated_at = NOW()
            WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(WorkItemRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn queue_depth_impl_conn(
        conn: &mut PgConnection,
    ) -> Result<u64, WorkItemRepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)
            FROM work_items
            WHERE state = 'ready'
               OR (state = 'reserved' AND lease_expires_at <= NOW())",
        )
        .fetch_one(&mut *conn)
        .await
        .map_err(|_| WorkItemRepositoryError::StorageUnavailable)?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl WorkItemStore for WorkItemStorePostgres {
    async fn insert(&self, row: &WorkItemRow) -> Result<WorkItemRow, WorkItemRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| Box::pin(async move { Self::insert_impl_conn(conn, &row).await }))
            .await
    }

    async fn reserve(
        &self,
        worker_id: &str,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<WorkItemRow>, WorkItemRepositoryError> {
        let worker_id = worker_id.to_string();
        self.db
            .with_conn(move |conn| {
                Box::pin(async move {
                    Self::reserve_impl_conn(conn, &worker_id, lease_expires_at).await
                })
            })
            .await
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Option<WorkItemRow>, WorkItemRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::get_impl_conn(conn, id)))
            .await
    }

    async fn touch(
        &self,
        id: uuid::Uuid,
        worker_id: &str,
        lease_expires_at: OffsetDateTime,
    ) -> Result<(), WorkItemRepositoryError> {
        let worker_id = worker_id.to_string();
        self.db
            .with_conn(move |conn| {
                Box::pin(async move {
                    Self::touch_impl_conn(conn, id, &worker_id, lease_expires_at).await
                })
            })
            .await
    }

    async fn delete(&self, id: uuid::Uuid) -> Result<(), WorkItemRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::delete_impl_conn(conn, id)))
            .await
    }

    async fn bury(&self, id: uuid::Uuid) -> Result<(), WorkItemRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::bury_impl_conn(conn, id)))
            .await
    }

    async fn queue_depth(&self) -> Result<u64, WorkItemRepositoryError> {
        self.db
            .with_conn(|conn| Box::pin(Self::queue_depth_impl_conn(conn)))
            .await
    }
}
