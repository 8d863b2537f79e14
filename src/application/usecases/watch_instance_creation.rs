// Use case: watch_instance_creation.

use crate::application::context::AppContext;
use crate::application::shared::job_poller::JobPoller;
use crate::application::shared::mail_templates::{self, Mail};
use crate::application::shared::outcome::HandlerOutcome;
use crate::application::shared::reservation::{Reservation, ReservationError};
use crate::domain::entities::application::{Application, ApplicationStatus};
use crate::domain::entities::cluster_job::JobStatus;
use crate::domain::entities::work_item::CreatePayload;
use crate::domain::value_objects::ids::ApplicationId;
use crate::domain::workflows::state_machine::{ApplicationStateMachine, TransitionError};
use crate::infrastructure::cluster::{ClusterApi, ClusterError};
use crate::infrastructure::notify::NotifyError;
use metrics::counter;
use tracing::{error, info, instrument, warn};

/// Follows an instance's creation job and records the outcome in the ledger.
pub struct WatchInstanceCreationUseCase;

#[derive(Debug)]
pub enum WatchInstanceCreationError {
    Storage(String),
    Cluster(ClusterError),
    Transition(TransitionError),
    Reservation(ReservationError),
}

impl From<ReservationError> for WatchInstanceCreationError {
    fn from(err: ReservationError) -> Self {
        WatchInstanceCreationError::Reservation(err)
    }
}

impl WatchInstanceCreationUseCase {
    /// Poll the application's cluster job until it ends, then reconcile and notify.
    #[instrument(skip(ctx, reservation), fields(delivery_id = %reservation.id))]
    pub async fn execute(
        ctx: &AppContext,
        reservation: &Reservation,
        payload: &CreatePayload,
    ) -> Result<HandlerOutcome, WatchInstanceCreationError> {
        // Step 1: Load the application; a missing row means it was deleted.
        let Some(mut application) = ctx
            .repos
            .application
            .get(payload.application_id)
            .await
            .map_err(|e| WatchInstanceCreationError::Storage(format!("{e:?}")))?
        else {
            return Self::give_up(
                ctx,
                reservation,
                payload.application_id,
                "missing_application",
                "application not found",
            )
            .await;
        };

        // Step 2: A redelivery after reconciliation only needs acknowledging.
        if application.status.is_finished() {
            reservation.delete().await?;
            info!(
                application_id = %application.id,
                status = application.status.as_str(),
                "application_already_finished"
            );
            return Ok(HandlerOutcome::AlreadyFinished);
        }
        if !ApplicationStateMachine::can_transition(application.status, ApplicationStatus::Success)
        {
            let reason = format!("application is {}", application.status.as_str());
            return Self::give_up(ctx, reservation, application.id, "unprocessable_application", &reason)
                .await;
        }

        // Step 3: Resolve the cluster job to follow.
        let Some(job_id) = application.job_id else {
            return Self::give_up(
                ctx,
                reservation,
                application.id,
                "unprocessable_application",
                "no cluster job recorded",
            )
            .await;
        };
        let Some(slug) = application.cluster.clone() else {
            return Self::give_up(
                ctx,
                reservation,
                application.id,
                "unprocessable_application",
                "no cluster assigned",
            )
            .await;
        };
        let Some(cluster) = ctx
            .clusters
            .resolve(&slug)
            .await
            .map_err(WatchInstanceCreationError::Cluster)?
        else {
            let reason = format!("unknown cluster {slug}");
            return Self::give_up(ctx, reservation, application.id, "unknown_cluster", &reason)
                .await;
        };

        // Step 4: Poll until the job is terminal, keeping the reservation alive.
        let mut poller = JobPoller::new(cluster.as_ref(), job_id);
        let status = loop {
            if let Some(status) = poller
                .next()
                .await
                .map_err(WatchInstanceCreationError::Cluster)?
            {
                break status;
            }
            reservation.touch().await?;
        };

        // Step 5: Persist the outcome, then notify.
        if status.is_error() {
            Self::record_failure(ctx, &mut application, cluster.as_ref(), &status).await?;
        } else {
            Self::record_success(ctx, &mut application, &slug).await?;
        }

        // Step 6: Acknowledge the work item.
        reservation.delete().await?;
        Ok(HandlerOutcome::Completed)
    }

    async fn record_failure(
        ctx: &AppContext,
        application: &mut Application,
        cluster: &dyn ClusterApi,
        status: &JobStatus,
    ) -> Result<(), WatchInstanceCreationError> {
        application
            .mark_failed(status.opresult_message())
            .map_err(WatchInstanceCreationError::Transition)?;
        ctx.repos
            .application
            .update_outcome(application)
            .await
            .map_err(|e| WatchInstanceCreationError::Storage(format!("{e:?}")))?;
        warn!(
            application_id = %application.id,
            hostname = %application.hostname,
            cluster = cluster.slug(),
            backend_message = application.backend_message.as_deref().unwrap_or(""),
            "instance_creation_failed"
        );

        let mail = mail_templates::creation_failure(application, cluster.hostname(), status);
        report_notification(ctx.mailer.mail_admins(&mail.subject, mail.body).await);
        Ok(())
    }

    async fn record_success(
        ctx: &AppContext,
        application: &mut Application,
        slug: &str,
    ) -> Result<(), WatchInstanceCreationError> {
        application
            .mark_succeeded()
            .map_err(WatchInstanceCreationError::Transition)?;
        ctx.repos
            .application
            .update_outcome(application)
            .await
            .map_err(|e| WatchInstanceCreationError::Storage(format!("{e:?}")))?;
        info!(
            application_id = %application.id,
            hostname = %application.hostname,
            cluster = slug,
            "instance_created"
        );

        let url = mail_templates::instance_url(&ctx.settings.portal.base_url, slug, &application.hostname);
        let Mail { subject, body } = mail_templates::instance_ready(application, slug, &url);
        report_notification(
            ctx.mailer
                .send_to(vec![application.applicant.email.clone()], &subject, body.clone())
                .await,
        );
        report_notification(ctx.mailer.mail_managers(&subject, body).await);
        Ok(())
    }

    /// Bury a poisoned item and tell the operators.
    async fn give_up(
        ctx: &AppContext,
        reservation: &Reservation,
        application_id: ApplicationId,
        label: &'static str,
        reason: &str,
    ) -> Result<HandlerOutcome, WatchInstanceCreationError> {
        error!(
            application_id = %application_id,
            delivery_id = %reservation.id,
            reason,
            "instance_creation_unprocessable"
        );
        reservation.bury().await?;

        // Only alert once the item can no longer come back.
        let mail = mail_templates::poisoned_creation(application_id.0, reason);
        report_notification(ctx.mailer.mail_admins(&mail.subject, mail.body).await);
        Ok(HandlerOutcome::Buried(label))
    }
}

/// Notifications are best-effort: failures are counted and logged only.
fn report_notification(result: Result<(), NotifyError>) {
    if let Err(err) = result {
        counter!("notifications_failed_total").increment(1);
        warn!(error = %err, "notification_failed");
    }
}

#[cfg(test)]
mod tests {
    use super::{WatchInstanceCreationError, WatchInstanceCreationUseCase};
    use crate::application::context::test_support::{Harness, finished, harness, running};
    use crate::application::shared::outcome::HandlerOutcome;
    use crate::application::shared::reservation::{Reservation, ReservationError};
    use crate::domain::entities::work_item::{CreatePayload, WorkItemState};
    use crate::domain::value_objects::ids::{ApplicationId, DeliveryId};
    use crate::infrastructure::cluster::ClusterError;
    use crate::infrastructure::db::dto::ApplicationRow;
    use time::{Duration, OffsetDateTime};

    fn application_row(status: &str) -> ApplicationRow {
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

    async fn reserve(h: &Harness) -> (DeliveryId, Reservation) {
        let id = h.queue.push(r#"{"type":"CREATE","application_id":42}"#, 0);
        h.ctx
            .repos
            .queue
            .reserve("worker-1", Duration::seconds(120))
            .await
            .unwrap();
        let reservation = Reservation::new(
            h.ctx.repos.queue.clone(),
            id,
            "worker-1",
            Duration::seconds(120),
        );
        (id, reservation)
    }

    fn payload() -> CreatePayload {
        CreatePayload {
            application_id: ApplicationId(42),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn given_job_fails_when_watched_should_record_failure_and_mail_admins() {
        let h = harness();
        h.applications.insert(application_row("submitted"));
        h.clusters
            .add("athens", "ganeti.example.org")
            .then(Ok(running()))
            .then(Ok(finished("error", serde_json::json!("disk full"))));
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Completed);
        let row = h.applications.row(42).unwrap();
        assert_eq!(row.status, "failed");
        assert_eq!(row.backend_message.as_deref(), Some("disk full"));
        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].subject,
            "[portal] Instance creation failure for vm1.example.org on ganeti.example.org"
        );
        assert_eq!(sent[0].recipients, vec!["ops@example.org".to_string()]);
        assert_eq!(h.queue.state(id), None);
        assert_eq!(h.queue.touches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn given_job_succeeds_when_watched_should_record_success_and_mail_applicant_and_managers()
    {
        let h = harness();
        let mut row = application_row("submitted");
        row.backend_message = Some("previous attempt".to_string());
        h.applications.insert(row);
        h.clusters
            .add("athens", "ganeti.example.org")
            .then(Ok(finished("success", serde_json::Value::Null)));
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Completed);
        let row = h.applications.row(42).unwrap();
        assert_eq!(row.status, "success");
        assert_eq!(row.backend_message, None);
        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipients, vec!["alice@example.org".to_string()]);
        assert_eq!(sent[0].subject, "[portal] Instance vm1.example.org is ready");
        assert!(
            sent[0]
                .body
                .contains("https://portal.example.org/cluster/athens/vm1.example.org/")
        );
        assert_eq!(sent[1].recipients, vec!["helpdesk@example.org".to_string()]);
        assert_eq!(h.queue.state(id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn given_finished_application_when_redelivered_should_only_acknowledge() {
        let h = harness();
        h.applications.insert(application_row("success"));
        let cluster = h.clusters.add("athens", "ganeti.example.org");
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::AlreadyFinished);
        assert_eq!(h.applications.row(42).unwrap().status, "success");
        assert_eq!(h.applications.updates(), 0);
        assert!(h.notifier.sent().is_empty());
        assert!(cluster.polls().is_empty());
        assert_eq!(h.queue.state(id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn given_missing_application_when_watched_should_bury_and_notify_operators() {
        let h = harness();
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Buried("missing_application"));
        assert_eq!(h.queue.state(id), Some(WorkItemState::Buried));
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn given_bury_fails_when_giving_up_should_not_notify_operators() {
        let h = harness();
        let reservation = Reservation::new(
            h.ctx.repos.queue.clone(),
            DeliveryId::new(),
            "worker-1",
            Duration::seconds(120),
        );

        let result = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload()).await;

        assert!(matches!(
            result,
            Err(WatchInstanceCreationError::Reservation(ReservationError::Storage(_)))
        ));
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn given_unknown_cluster_when_watched_should_bury() {
        let h = harness();
        h.applications.insert(application_row("submitted"));
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Buried("unknown_cluster"));
        assert_eq!(h.queue.state(id), Some(WorkItemState::Buried));
        assert_eq!(h.applications.row(42).unwrap().status, "submitted");
    }

    #[tokio::test(start_paused = true)]
    async fn given_refused_application_when_watched_should_bury_without_touching_ledger() {
        let h = harness();
        h.applications.insert(application_row("refused"));
        h.clusters.add("athens", "ganeti.example.org");
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Buried("unprocessable_application"));
        assert_eq!(h.queue.state(id), Some(WorkItemState::Buried));
        assert_eq!(h.applications.updates(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn given_relay_down_when_job_succeeds_should_still_complete() {
        let h = harness();
        h.applications.insert(application_row("submitted"));
        h.clusters
            .add("athens", "ganeti.example.org")
            .then(Ok(finished("success", serde_json::Value::Null)));
        h.notifier.fail_all();
        let (id, reservation) = reserve(&h).await;

        let outcome = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload())
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Completed);
        assert_eq!(h.applications.row(42).unwrap().status, "success");
        assert_eq!(h.queue.state(id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn given_malformed_cluster_answer_when_watched_should_leave_item_reserved() {
        let h = harness();
        h.applications.insert(application_row("submitted"));
        h.clusters
            .add("athens", "ganeti.example.org")
            .then(Err(ClusterError::Malformed("not json".to_string())));
        let (id, reservation) = reserve(&h).await;

        let result = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload()).await;

        assert!(matches!(result, Err(WatchInstanceCreationError::Cluster(_))));
        assert_eq!(h.queue.state(id), Some(WorkItemState::Reserved));
        assert_eq!(h.applications.updates(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn given_lost_lease_when_watched_should_stop_without_reconciling() {
        let h = harness();
        h.applications.insert(application_row("submitted"));
        h.clusters
            .add("athens", "ganeti.example.org")
            .then(Ok(running()))
            .then(Ok(finished("success", serde_json::Value::Null)));
        let (id, reservation) = reserve(&h).await;
        h.queue.steal(id);

        let result = WatchInstanceCreationUseCase::execute(&h.ctx, &reservation, &payload()).await;

        assert!(matches!(
            result,
            Err(WatchInstanceCreationError::Reservation(ReservationError::LeaseLost))
        ));
        assert_eq!(h.applications.updates(), 0);
    }
}
