use crate::models::entities::enum_types::SettlementStatus;
use crate::models::entities::settlement_audit::{SettlementAudit, SettlementOutput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct StartSettlementRequest {
    pub contest_id: Uuid,
    pub run_id: Uuid,
    #[validate(length(min = 1, max = 64, message = "engine_version is required"))]
    pub engine_version: String,
    pub applied_input_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartSettlementResponse {
    pub audit_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct FailSettlementRequest {
    #[validate(length(min = 1, max = 2000, message = "reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettlementResponse {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub run_id: Uuid,
    pub engine_version: String,
    pub input_hash: String,
    pub status: SettlementStatus,
    pub output: Option<SettlementOutput>,
    pub output_hash: Option<String>,
    pub error_detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SettlementAudit> for SettlementResponse {
    type Error = crate::error::ApiError;

    fn try_from(audit: SettlementAudit) -> Result<Self, Self::Error> {
        let output = audit.parsed_output()?;
        Ok(Self {
            id: audit.id,
            contest_id: audit.contest_id,
            run_id: audit.run_id,
            engine_version: audit.engine_version,
            input_hash: audit.input_hash,
            status: audit.status,
            output,
            output_hash: audit.output_hash,
            error_detail: audit.error_detail,
            started_at: audit.started_at,
            completed_at: audit.completed_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompleteSettlementResponse {
    pub settlement: SettlementResponse,
    pub payout_job_id: Option<Uuid>,
    pub payout_job_created: bool,
}
