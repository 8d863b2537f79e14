use crate::domain::value_objects::ids::{ApplicationId, ClusterJobId};
use crate::domain::workflows::state_machine::{ApplicationStateMachine, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Submitted,
    Processing,
    Failed,
    Success,
    Refused,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::Success => "success",
            ApplicationStatus::Refused => "refused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "submitted" => Some(ApplicationStatus::Submitted),
            "processing" => Some(ApplicationStatus::Processing),
            "failed" => Some(ApplicationStatus::Failed),
            "success" => Some(ApplicationStatus::Success),
            "refused" => Some(ApplicationStatus::Refused),
            _ => None,
        }
    }

    /// Whether the provisioning outcome has already been recorded.
    pub fn is_finished(&self) -> bool {
        matches!(self, ApplicationStatus::Failed | ApplicationStatus::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicant {
    pub username: String,
    pub email: String,
}

/// Ledger record of a request for a new virtual machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: ApplicationId,
    pub hostname: String,
    pub job_id: Option<ClusterJobId>,
    pub status: ApplicationStatus,
    pub backend_message: Option<String>,
    pub applicant: Applicant,
    pub cluster: Option<String>,
    pub reviewer: Option<String>,
}

impl Application {
    /// Record a failed provisioning job together with the cluster's message.
    pub fn mark_failed(&mut self, message: String) -> Result<(), TransitionError> {
        self.status = ApplicationStateMachine::transition(self.status, ApplicationStatus::Failed)?;
        self.backend_message = Some(message);
        Ok(())
    }

    /// Record a successful provisioning job.
    pub fn mark_succeeded(&mut self) -> Result<(), TransitionError> {
        self.status = ApplicationStateMachine::transition(self.status, ApplicationStatus::Success)?;
        self.backend_message = None;
        Ok(())
    }
}
