use crate::domain::entities::application::ApplicationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Forbidden,
}

/// Allowed ledger transitions for an instance application.
///
/// The watcher only ever moves an application forward into `Failed` or
/// `Success`; once there, the status is final.
pub struct ApplicationStateMachine;

impl ApplicationStateMachine {
    pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (from, to),
            (Pending, Approved)
                | (Pending, Refused)
                | (Approved, Submitted)
                | (Approved, Refused)
                | (Submitted, Processing)
                | (Pending | Approved | Submitted | Processing, Failed | Success)
        )
    }

    pub fn transition(
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<ApplicationStatus, TransitionError> {
        if Self::can_transition(from, to) {
            return Ok(to);
        }

        Err(TransitionError::Forbidden)
    }
}
