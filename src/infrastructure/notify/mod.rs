pub mod relay;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// One outgoing message, already rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification relay refused message: HTTP {status}")]
    Refused { status: u16 },

    #[error("notification has no recipients")]
    NoRecipients,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Addresses notifications and applies the subject prefix.
pub struct Mailer {
    notifier: Arc<dyn Notifier>,
    subject_prefix: String,
    admins: Vec<String>,
    managers: Vec<String>,
}

impl Mailer {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        subject_prefix: impl Into<String>,
        admins: Vec<String>,
        managers: Vec<String>,
    ) -> Self {
        Self {
            notifier,
            subject_prefix: subject_prefix.into(),
            admins,
            managers,
        }
    }

    pub async fn send_to(
        &self,
        recipients: Vec<String>,
        subject: &str,
        body: String,
    ) -> Result<(), NotifyError> {
        let recipients: Vec<String> = recipients
            .into_iter()
            .filter(|r| !r.trim().is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let notification = Notification {
            subject: format!("{}{}", self.subject_prefix, subject),
            body,
            recipients,
        };
        self.notifier.send(&notification).await
    }

    pub async fn mail_admins(&self, subject: &str, body: String) -> Result<(), NotifyError> {
        self.send_to(self.admins.clone(), subject, body).await
    }

    pub async fn mail_managers(&self, subject: &str, body: String) -> Result<(), NotifyError> {
        self.send_to(self.managers.clone(), subject, body).await
    }
}
