use serde::Serialize;
use strum::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureClass {
    /// Worth retrying with the same idempotency key.
    Transient,
    Permanent,
}

/// Result of one transfer call. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RailOutcome {
    Success { transfer_id: String },
    Failure { class: FailureClass, reason: String },
}

impl RailOutcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        RailOutcome::Failure {
            class: FailureClass::Transient,
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        RailOutcome::Failure {
            class: FailureClass::Permanent,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RailOutcome::Success { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TransferInstruction {
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    pub idempotency_key: String,
    pub transfer_group: String,
}
