use crate::domain::entities::cluster_job::JobStatus;
use crate::domain::value_objects::ids::ClusterJobId;
use crate::domain::workflows::poll_interval::PollIntervals;
use crate::infrastructure::cluster::{ClusterApi, ClusterError};
use metrics::counter;
use tracing::{debug, warn};

/// Polls one cluster job on the backoff schedule.
pub struct JobPoller<'a> {
    cluster: &'a dyn ClusterApi,
    job_id: ClusterJobId,
    intervals: PollIntervals,
}

impl<'a> JobPoller<'a> {
    pub fn new(cluster: &'a dyn ClusterApi, job_id: ClusterJobId) -> Self {
        Self {
            cluster,
            job_id,
            intervals: PollIntervals::new(),
        }
    }

    /// Sleep for the next interval of the schedule.
    pub async fn wait(&mut self) {
        let interval = self.intervals.next().unwrap_or_else(PollIntervals::steady);
        tokio::time::sleep(interval).await;
    }

    /// Ask the cluster once.
    ///
    /// `Ok(None)` means keep waiting: the job is still running or the
    /// cluster could not be reached this time.
    pub async fn poll(&self) -> Result<Option<JobStatus>, ClusterError> {
        match self.cluster.get_job_status(self.job_id).await {
            Ok(status) if status.is_terminal() => Ok(Some(status)),
            Ok(status) => {
                debug!(
                    cluster = self.cluster.slug(),
                    job_id = %self.job_id,
                    status = %status.status,
                    "cluster_job_running"
                );
                Ok(None)
            }
            Err(err) if err.is_transient() => {
                counter!("cluster_poll_errors_total", "transient" => "true").increment(1);
                warn!(
                    cluster = self.cluster.slug(),
                    job_id = %self.job_id,
                    error = %err,
                    "cluster_poll_failed"
                );
                Ok(None)
            }
            Err(err) => {
                counter!("cluster_poll_errors_total", "transient" => "false").increment(1);
                Err(err)
            }
        }
    }

    /// Wait, then poll.
    pub async fn next(&mut self) -> Result<Option<JobStatus>, ClusterError> {
        self.wait().await;
        self.poll().await
    }
}
