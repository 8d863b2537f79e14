use serde::{Deserialize, Serialize};

/// Status of a cluster-side asynchronous job as reported by the cluster API.
///
/// `end_ts` stays null until the job reaches a terminal state; its exact shape
/// (number or `[seconds, micros]`) is irrelevant beyond being present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub end_ts: Option<serde_json::Value>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub opresult: serde_json::Value,
}

impl JobStatus {
    pub const ERROR: &'static str = "error";

    pub fn is_terminal(&self) -> bool {
        self.end_ts.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.status == Self::ERROR
    }

    /// Human-readable rendering of `opresult` for the ledger.
    pub fn opresult_message(&self) -> String {
        match &self.opresult {
            serde_json::Value::String(message) => message.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Full job detail for operator mail.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
