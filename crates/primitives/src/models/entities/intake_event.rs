use crate::models::entities::enum_types::IntakeStatus;
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::payment_intake_events)]
pub struct IntakeEvent {
    pub id: Uuid,
    pub provider_event_id: String,
    pub event_type: String,
    pub payload: Value,
    pub payload_hash: String,
    pub processing_status: IntakeStatus,
    pub error_detail: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::payment_intake_events)]
pub struct NewIntakeEvent<'a> {
    pub provider_event_id: &'a str,
    pub event_type: &'a str,
    pub payload: &'a Value,
    pub payload_hash: &'a str,
    pub processing_status: IntakeStatus,
}
