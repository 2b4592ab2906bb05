use crate::models::entities::ledger_entry::{Balance, LedgerEntry};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Created(LedgerEntry),
    /// The key was already recorded; carries the stored entry.
    AlreadyExists(LedgerEntry),
}

impl RecordOutcome {
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            RecordOutcome::Created(e) | RecordOutcome::AlreadyExists(e) => e,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, RecordOutcome::Created(_))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContestBalanceResponse {
    pub contest_id: Uuid,
    pub balance: Balance,
}
