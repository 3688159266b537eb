use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

/// One attempted step of a token deployment, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub deployment_id: Uuid,
    pub step: String, // e.g. "createMint", "mintTo"
    pub status: StepStatus,
    pub signature: Option<String>,
    pub details: Option<String>, // error message or skip reason
    pub timestamp: DateTime<Utc>,
}

impl StepEvent {
    pub fn new(deployment_id: Uuid, step: impl Into<String>, status: StepStatus) -> Self {
        Self {
            deployment_id,
            step: step.into(),
            status,
            signature: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
