use crate::infrastructure::notify::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Hands notifications to an HTTP mail relay.
///
/// Without a relay URL the notifier only logs what it would have sent, which
/// keeps development deployments quiet.
pub struct HttpRelayNotifier {
    client: reqwest::Client,
    relay_url: Option<String>,
    from: String,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    body: &'a str,
}

impl HttpRelayNotifier {
    pub fn new(
        relay_url: Option<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            relay_url: relay_url.filter(|url| !url.trim().is_empty()),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for HttpRelayNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(url) = self.relay_url.as_deref() else {
            info!(
                subject = %notification.subject,
                recipients = ?notification.recipients,
                "notification_not_relayed"
            );
            return Ok(());
        };

        let message = RelayMessage {
            from: &self.from,
            to: &notification.recipients,
            subject: &notification.subject,
            body: &notification.body,
        };
        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Refused {
                status: response.status().as_u16(),
            });
        }

        info!(subject = %notification.subject, "notification_relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpRelayNotifier;
    use crate::infrastructure::notify::{Notification, Notifier, NotifyError};
    use std::time::Duration;

    fn notification() -> Notification {
        Notification {
            subject: "Instance vm1 is ready".to_string(),
            body: "hello".to_string(),
            recipients: vec!["alice@example.org".to_string()],
        }
    }

    #[tokio::test]
    async fn given_no_relay_when_sent_should_succeed_without_transport() {
        let notifier =
            HttpRelayNotifier::new(None, "portal@example.org", Duration::from_secs(1)).unwrap();
        assert!(notifier.send(&notification()).await.is_ok());
    }

    #[tokio::test]
    async fn given_unreachable_relay_when_sent_should_report_transport_error() {
        let notifier = HttpRelayNotifier::new(
            Some("http://127.0.0.1:1/send".to_string()),
            "portal@example.org",
            Duration::from_millis(500),
        )
        .unwrap();
        let result = notifier.send(&notification()).await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
