use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::ApplicationRow;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationRepositoryError {
    NotFound,
    InvalidInput,
    StorageUnavailable,
}

impl From<DatabaseError> for ApplicationRepositoryError {
    fn from(_: DatabaseError) -> Self {
        ApplicationRepositoryError::StorageUnavailable
    }
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Fetch an application by its ID. Returns `None` if it doesn't exist.
    async fn get(&self, id: i64) -> Result<Option<ApplicationRow>, ApplicationRepositoryError>;
    /// Persist the watcher-owned fields (`status`, `backend_message`).
    async fn update_outcome(
        &self,
        row: &ApplicationRow,
    ) -> Result<ApplicationRow, ApplicationRepositoryError>;
}
