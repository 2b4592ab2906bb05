use crate::error::ApiError;
use crate::models::entities::enum_types::PayoutJobStatus;
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::payout_jobs)]
#[diesel(belongs_to(crate::models::entities::settlement_audit::SettlementAudit, foreign_key = settlement_id))]
pub struct PayoutJob {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub contest_id: Uuid,
    pub status: PayoutJobStatus,
    pub total_count: i32,
    pub completed_count: i32,
    pub failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::payout_jobs)]
pub struct NewPayoutJob {
    pub settlement_id: Uuid,
    pub contest_id: Uuid,
    pub status: PayoutJobStatus,
    pub total_count: i32,
}

/// Terminal tallies for a job, counted from its transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub total: i32,
    pub completed: i32,
    pub failed: i32,
}

impl JobProgress {
    pub fn new(total: i32, completed: i32, failed: i32) -> Result<Self, ApiError> {
        if completed + failed > total {
            return Err(ApiError::Aggregate(format!(
                "terminal transfers ({} completed, {} failed) exceed job total {}",
                completed, failed, total
            )));
        }
        Ok(Self {
            total,
            completed,
            failed,
        })
    }

    pub fn terminal(&self) -> i32 {
        self.completed + self.failed
    }

    pub fn is_finished(&self) -> bool {
        self.terminal() == self.total
    }

    /// Status the job should hold given these tallies, or `None` to leave it.
    pub fn next_status(&self, current: PayoutJobStatus) -> Result<Option<PayoutJobStatus>, ApiError> {
        if !self.is_finished() {
            return Ok(None);
        }
        current.ensure_transition(PayoutJobStatus::Complete)?;
        Ok(Some(PayoutJobStatus::Complete))
    }
}
