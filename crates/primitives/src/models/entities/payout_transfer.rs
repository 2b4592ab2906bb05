use crate::canonical::sha256_hex;
use crate::models::dtos::rail_dto::{FailureClass, RailOutcome};
use crate::models::entities::enum_types::{LedgerEntryType, PayoutTransferStatus};
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::payout_transfers)]
#[diesel(belongs_to(crate::models::entities::payout_job::PayoutJob, foreign_key = job_id))]
pub struct PayoutTransfer {
    pub id: Uuid,
    pub job_id: Uuid,
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub rank: i32,
    pub amount: i64,
    pub currency: String,
    pub status: PayoutTransferStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub external_transfer_id: Option<String>,
    pub idempotency_key: String,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::payout_transfers)]
pub struct NewPayoutTransfer {
    pub job_id: Uuid,
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub rank: i32,
    pub amount: i64,
    pub currency: String,
    pub status: PayoutTransferStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub idempotency_key: String,
}

const TRANSFER_KEY_PREFIX: &str = "payout_";
const TRANSFER_KEY_HEX_LEN: usize = 48;

/// Rail idempotency key for a winner's transfer. Derived only from
/// (contest, user) so every retry and every reschedule reuses it.
pub fn transfer_idempotency_key(contest_id: Uuid, user_id: Uuid) -> String {
    let digest = sha256_hex(format!("payout-transfer|{}|{}", contest_id, user_id).as_bytes());
    format!("{}{}", TRANSFER_KEY_PREFIX, &digest[..TRANSFER_KEY_HEX_LEN])
}

/// What to persist after one rail call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDecision {
    pub status: PayoutTransferStatus,
    pub ledger_entry_type: LedgerEntryType,
    pub external_transfer_id: Option<String>,
    pub last_error: Option<String>,
    /// Suffix appended to the transfer key to form the ledger key.
    pub ledger_key_suffix: String,
}

impl TransferDecision {
    pub fn ledger_key(&self, transfer_key: &str) -> String {
        format!("{}:{}", transfer_key, self.ledger_key_suffix)
    }

    /// Terminal failure for a transfer whose worker vanished after its last
    /// permitted attempt.
    pub fn lease_expired(attempt_count: i32) -> Self {
        Self {
            status: PayoutTransferStatus::FailedTerminal,
            ledger_entry_type: LedgerEntryType::PayoutFailedTerminal,
            external_transfer_id: None,
            last_error: Some("lease expired".into()),
            ledger_key_suffix: format!("attempt:{}:lease_expired", attempt_count),
        }
    }
}

/// Classifies a rail outcome for a transfer whose attempt counter already
/// includes this attempt.
pub fn decide(attempt_count: i32, max_attempts: i32, outcome: &RailOutcome) -> TransferDecision {
    match outcome {
        RailOutcome::Success { transfer_id } => TransferDecision {
            status: PayoutTransferStatus::Completed,
            ledger_entry_type: LedgerEntryType::PayoutCompleted,
            external_transfer_id: Some(transfer_id.clone()),
            last_error: None,
            ledger_key_suffix: "completed".into(),
        },
        RailOutcome::Failure { class, reason } => {
            let status = match class {
                FailureClass::Transient if attempt_count < max_attempts => {
                    PayoutTransferStatus::Retryable
                }
                _ => PayoutTransferStatus::FailedTerminal,
            };
            let ledger_entry_type = if status == PayoutTransferStatus::Retryable {
                LedgerEntryType::PayoutAttemptFailed
            } else {
                LedgerEntryType::PayoutFailedTerminal
            };

            TransferDecision {
                status,
                ledger_entry_type,
                external_transfer_id: None,
                last_error: Some(format!("{}: {}", class, reason)),
                ledger_key_suffix: format!("attempt:{}:{}", attempt_count, status),
            }
        }
    }
}
