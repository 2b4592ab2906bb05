use crate::models::entities::enum_types::IntakeStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

pub const EVENT_PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_CHARGE_REFUNDED: &str = "charge.refunded";

/// Envelope of a payment provider webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ProviderEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEventData {
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount_received: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    pub amount_refunded: i64,
    pub currency: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored for the first time. `status` is `processed` or, for a
    /// dead-lettered event, `failed`.
    Accepted { event_id: Uuid, status: IntakeStatus },
    Duplicate { provider_event_id: String },
    /// Failed authenticity or shape checks; nothing was stored.
    Rejected { reason: String },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub outcome: String,
    pub event_id: Option<Uuid>,
}

impl From<&IngestOutcome> for WebhookAck {
    fn from(outcome: &IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Accepted { event_id, .. } => Self {
                outcome: "accepted".into(),
                event_id: Some(*event_id),
            },
            IngestOutcome::Duplicate { .. } => Self {
                outcome: "duplicate".into(),
                event_id: None,
            },
            IngestOutcome::Rejected { .. } => Self {
                outcome: "rejected".into(),
                event_id: None,
            },
        }
    }
}
