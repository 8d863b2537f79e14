use crate::domain::entities::application::Application;
use crate::domain::value_objects::ids::ApplicationId;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::ApplicationRow;
use crate::infrastructure::db::stores::application_store::{
    ApplicationRepositoryError, ApplicationStore,
};
use std::sync::Arc;

/// Ledger gateway for instance applications.
pub struct ApplicationRepository {
    store: Arc<dyn ApplicationStore>,
}

impl ApplicationRepository {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    /// Fetch an application by its ID. Returns `None` if it doesn't exist.
    pub async fn get(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, ApplicationRepositoryError> {
        let Some(row) = self.store.get(id.0).await? else {
            return Ok(None);
        };

        row.into_application()
            .map(Some)
            .map_err(|_| ApplicationRepositoryError::InvalidInput)
    }

    /// Persist the provisioning outcome and return what was stored.
    pub async fn update_outcome(
        &self,
        application: &Application,
    ) -> Result<Application, ApplicationRepositoryError> {
        let row = ApplicationRow::from_application(application, Timestamp::now_utc().as_inner());
        let stored = self.store.update_outcome(&row).await?;

        stored
            .into_application()
            .map_err(|_| ApplicationRepositoryError::InvalidInput)
    }
}
