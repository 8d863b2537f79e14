use crate::domain::value_objects::ids::{ApplicationId, ClusterJobId, DeliveryId};
use crate::domain::value_objects::timestamps::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemState {
    Ready,
    Reserved,
    Buried,
}

impl WorkItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemState::Ready => "ready",
            WorkItemState::Reserved => "reserved",
            WorkItemState::Buried => "buried",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ready" => Some(WorkItemState::Ready),
            "reserved" => Some(WorkItemState::Reserved),
            "buried" => Some(WorkItemState::Buried),
            _ => None,
        }
    }
}

/// A message delivered by the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: DeliveryId,
    pub body: String,
    pub state: WorkItemState,
    pub reserve_count: u32,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Queue-side bookkeeping for a single work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItemStats {
    pub reserve_count: u32,
    pub state: WorkItemState,
    pub age: time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayload {
    pub application_id: ApplicationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLockPayload {
    pub lock_key: String,
    pub instance: String,
    pub job_id: ClusterJobId,
    pub cluster: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flush_keys: Vec<String>,
}

/// Parsed body of a work item, one variant per handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum WorkPayload {
    #[serde(rename = "CREATE")]
    Create(CreatePayload),
    #[serde(rename = "JOB_LOCK")]
    JobLock(JobLockPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Not a JSON object, no `type`, or fields missing for a known type.
    Malformed(String),
    /// Well-formed, but no handler exists for this `type`.
    UnknownType(String),
}

impl WorkPayload {
    pub const CREATE: &'static str = "CREATE";
    pub const JOB_LOCK: &'static str = "JOB_LOCK";

    /// Decode a queue body into a payload.
    pub fn parse(body: &str) -> Result<Self, PayloadError> {
        // Step 1: Decode the raw JSON object.
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| PayloadError::Malformed(e.to_string()))?;

        // Step 2: Read the type tag.
        let Some(kind) = value.get("type").and_then(|v| v.as_str()) else {
            return Err(PayloadError::Malformed("missing type".to_string()));
        };

        // Step 3: Decode the variant-specific fields.
        match kind {
            Self::CREATE => serde_json::from_value(value)
                .map(WorkPayload::Create)
                .map_err(|e| PayloadError::Malformed(e.to_string())),
            Self::JOB_LOCK => serde_json::from_value(value)
                .map(WorkPayload::JobLock)
                .map_err(|e| PayloadError::Malformed(e.to_string())),
            other => Err(PayloadError::UnknownType(other.to_string())),
        }
    }

    /// Encode the payload in queue wire format.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkPayload::Create(_) => Self::CREATE,
            WorkPayload::JobLock(_) => Self::JOB_LOCK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_create_body_when_parsed_should_return_create_payload() {
        let payload = WorkPayload::parse(r#"{"type": "CREATE", "application_id": 42}"#).unwrap();
        assert_eq!(
            payload,
            WorkPayload::Create(CreatePayload {
                application_id: ApplicationId(42)
            })
        );
        assert_eq!(payload.kind(), "CREATE");
    }

    #[test]
    fn given_job_lock_body_without_flush_keys_when_parsed_should_default_to_empty() {
        let payload = WorkPayload::parse(
            r#"{"type": "JOB_LOCK", "lock_key": "cluster:athens:instance:vm1:lock",
                "instance": "vm1", "job_id": 77, "cluster": "athens"}"#,
        )
        .unwrap();

        let WorkPayload::JobLock(lock) = payload else {
            panic!("expected JOB_LOCK payload");
        };
        assert_eq!(lock.job_id, ClusterJobId(77));
        assert!(lock.flush_keys.is_empty());
    }

    #[test]
    fn given_unknown_type_when_parsed_should_report_unknown_type() {
        let result = WorkPayload::parse(r#"{"type": "BOGUS"}"#);
        assert_eq!(result, Err(PayloadError::UnknownType("BOGUS".to_string())));
    }

    #[test]
    fn given_broken_bodies_when_parsed_should_report_malformed() {
        for body in [
            "not json",
            "[]",
            r#"{"application_id": 1}"#,
            r#"{"type": 7}"#,
            r#"{"type": "CREATE"}"#,
            r#"{"type": "CREATE", "application_id": "forty-two"}"#,
            r#"{"type": "JOB_LOCK", "lock_key": "k", "job_id": 1}"#,
        ] {
            assert!(
                matches!(WorkPayload::parse(body), Err(PayloadError::Malformed(_))),
                "body {body} should be malformed"
            );
        }
    }

    #[test]
    fn given_job_lock_payload_when_encoded_should_carry_type_tag() {
        let payload = WorkPayload::JobLock(JobLockPayload {
            lock_key: "cluster:athens:instance:vm1:lock".to_string(),
            instance: "vm1".to_string(),
            job_id: ClusterJobId(9),
            cluster: "athens".to_string(),
            flush_keys: vec!["cluster:athens:instance:vm1".to_string()],
        });

        let body: serde_json::Value = serde_json::from_str(&payload.to_body().unwrap()).unwrap();
        assert_eq!(body["type"], "JOB_LOCK");
        assert_eq!(body["job_id"], 9);
        assert_eq!(body["flush_keys"][0], "cluster:athens:instance:vm1");
    }
}
