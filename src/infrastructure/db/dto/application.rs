use crate::domain::entities::application::{Applicant, Application, ApplicationStatus};
use crate::domain::value_objects::ids::{ApplicationId, ClusterJobId};
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub hostname: String,
    pub job_id: Option<i64>,
    pub status: String,
    pub backend_message: Option<String>,
    pub applicant_username: String,
    pub applicant_email: String,
    pub cluster_slug: Option<String>,
    pub reviewer_username: Option<String>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationRowError {
    UnknownStatus(String),
}

impl ApplicationRow {
    pub fn from_application(application: &Application, updated_at: OffsetDateTime) -> Self {
        Self {
            id: application.id.0,
            hostname: application.hostname.clone(),
            job_id: application.job_id.map(|id| id.0),
            status: application.status.as_str().to_string(),
            backend_message: application.backend_message.clone(),
            applicant_username: application.applicant.username.clone(),
            applicant_email: application.applicant.email.clone(),
            cluster_slug: application.cluster.clone(),
            reviewer_username: application.reviewer.clone(),
            updated_at,
        }
    }

    pub fn into_application(self) -> Result<Application, ApplicationRowError> {
        let status = ApplicationStatus::parse(&self.status)
            .ok_or_else(|| ApplicationRowError::UnknownStatus(self.status.clone()))?;

        Ok(Application {
            id: ApplicationId(self.id),
            hostname: self.hostname,
            job_id: self.job_id.map(ClusterJobId),
            status,
            backend_message: self.backend_message,
            applicant: Applicant {
                username: self.applicant_username,
                email: self.applicant_email,
            },
            cluster: self.cluster_slug,
            reviewer: self.reviewer_username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationRow, ApplicationRowError};
    use crate::domain::entities::application::ApplicationStatus;
    use time::OffsetDateTime;

    fn row(status: &str) -> ApplicationRow {
        ApplicationRow {
            id: 42,
            hostname: "vm1.example.org".to_string(),
            job_id: Some(1001),
            status: status.to_string(),
            backend_message: None,
            applicant_username: "alice".to_string(),
            applicant_email: "alice@example.org".to_string(),
            cluster_slug: Some("athens".to_string()),
            reviewer_username: Some("bob".to_string()),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn given_row_when_converted_should_map_all_fields() {
        let app = row("submitted").into_application().unwrap();

        assert_eq!(app.id.0, 42);
        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert_eq!(app.job_id.map(|j| j.0), Some(1001));
        assert_eq!(app.applicant.email, "alice@example.org");
        assert_eq!(app.reviewer.as_deref(), Some("bob"));

        let back = ApplicationRow::from_application(&app, OffsetDateTime::now_utc());
        assert_eq!(back.status, "submitted");
        assert_eq!(back.cluster_slug.as_deref(), Some("athens"));
    }

    #[test]
    fn given_unknown_status_when_converted_should_fail() {
        let result = row("archived").into_application();
        assert_eq!(
            result,
            Err(ApplicationRowError::UnknownStatus("archived".to_string()))
        );
    }
}
