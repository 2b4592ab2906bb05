use crate::models::entities::enum_types::{PayoutJobStatus, PayoutTransferStatus};
use crate::models::entities::ledger_entry::LedgerEntry;
use crate::models::entities::payout_job::PayoutJob;
use crate::models::entities::payout_transfer::PayoutTransfer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScheduleResult {
    pub job_id: Uuid,
    /// False when the settlement already had a job.
    pub created: bool,
}

/// What a single engine pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Nothing was claimable.
    Idle,
    Finished {
        transfer_id: Uuid,
        status: PayoutTransferStatus,
    },
    /// The lease was lost before the result could be recorded.
    Superseded { transfer_id: Uuid },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SweepReport {
    pub jobs_scheduled: usize,
    pub leases_reaped: usize,
    pub attempted: usize,
    pub completed: usize,
    pub retryable: usize,
    pub failed_terminal: usize,
    pub superseded: usize,
    pub errors: usize,
}

impl SweepReport {
    pub fn record(&mut self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Idle => {}
            ExecutionOutcome::Superseded { .. } => {
                self.attempted += 1;
                self.superseded += 1;
            }
            ExecutionOutcome::Finished { status, .. } => {
                self.attempted += 1;
                match status {
                    PayoutTransferStatus::Completed => self.completed += 1,
                    PayoutTransferStatus::Retryable => self.retryable += 1,
                    PayoutTransferStatus::FailedTerminal => self.failed_terminal += 1,
                    PayoutTransferStatus::Pending | PayoutTransferStatus::Processing => {}
                }
            }
        }
    }

    pub fn merge(&mut self, other: &SweepReport) {
        self.jobs_scheduled += other.jobs_scheduled;
        self.leases_reaped += other.leases_reaped;
        self.attempted += other.attempted;
        self.completed += other.completed;
        self.retryable += other.retryable;
        self.failed_terminal += other.failed_terminal;
        self.superseded += other.superseded;
        self.errors += other.errors;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobSummary {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub contest_id: Uuid,
    pub status: PayoutJobStatus,
    pub total_count: i32,
    pub completed_count: i32,
    pub failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PayoutJob> for JobSummary {
    fn from(job: PayoutJob) -> Self {
        Self {
            id: job.id,
            settlement_id: job.settlement_id,
            contest_id: job.contest_id,
            status: job.status,
            total_count: job.total_count,
            completed_count: job.completed_count,
            failed_count: job.failed_count,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rank: i32,
    pub amount: i64,
    pub currency: String,
    pub status: PayoutTransferStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub external_transfer_id: Option<String>,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub ledger_trail: Vec<LedgerTrailItem>,
}

impl TransferView {
    pub fn new(transfer: PayoutTransfer, trail: Vec<LedgerEntry>) -> Self {
        Self {
            id: transfer.id,
            user_id: transfer.user_id,
            rank: transfer.rank,
            amount: transfer.amount,
            currency: transfer.currency,
            status: transfer.status,
            attempt_count: transfer.attempt_count,
            max_attempts: transfer.max_attempts,
            external_transfer_id: transfer.external_transfer_id,
            last_error: transfer.last_error,
            last_attempt_at: transfer.last_attempt_at,
            ledger_trail: trail.into_iter().map(LedgerTrailItem::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerTrailItem {
    pub idempotency_key: String,
    pub entry_type: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerTrailItem {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            idempotency_key: entry.idempotency_key,
            entry_type: entry.entry_type.to_string(),
            amount: entry.amount,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobDetail {
    pub job: JobSummary,
    pub transfers: Vec<TransferView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobsResponse {
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JobsQuery {
    pub status: Option<PayoutJobStatus>,
    pub limit: Option<i64>,
}
