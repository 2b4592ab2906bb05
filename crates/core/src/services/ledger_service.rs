use diesel::PgConnection;
use tracing::info;
use uuid::Uuid;

pub use crate::app_state::AppState;
use crate::repositories::ledger_repository::LedgerRepository;
pub use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::ledger_dto::{ContestBalanceResponse, RecordOutcome};
use purse_primitives::models::entities::ledger_entry::{Balance, LedgerEntry, NewLedgerEntry};

pub struct LedgerService;

impl LedgerService {
    pub fn validate(entry: &NewLedgerEntry) -> Result<(), ApiError> {
        if entry.idempotency_key.trim().is_empty() {
            return Err(ApiError::BadRequest("Ledger idempotency key is required".into()));
        }
        if entry.amount < 0 {
            return Err(ApiError::BadRequest(format!(
                "Ledger amount must be non-negative, got {}",
                entry.amount
            )));
        }
        Ok(())
    }

    /// Records an entry once per idempotency key.
    pub fn record(state: &AppState, entry: &NewLedgerEntry) -> Result<RecordOutcome, ApiError> {
        let mut conn = state.conn()?;
        let outcome = Self::record_in(&mut conn, entry)?;

        info!(
            ledger_key = %entry.idempotency_key,
            entry_type = %entry.entry_type,
            created = outcome.was_created(),
            "Ledger entry recorded"
        );

        Ok(outcome)
    }

    /// Same as [`LedgerService::record`] but inside the caller's transaction.
    pub fn record_in(conn: &mut PgConnection, entry: &NewLedgerEntry) -> Result<RecordOutcome, ApiError> {
        Self::validate(entry)?;
        LedgerRepository::record(conn, entry)
    }

    pub fn contest_balance(state: &AppState, contest_id: Uuid) -> Result<ContestBalanceResponse, ApiError> {
        let mut conn = state.conn()?;
        let balance = LedgerRepository::contest_balance(&mut conn, contest_id)?;
        Ok(ContestBalanceResponse {
            contest_id,
            balance,
        })
    }

    pub fn user_balance(state: &AppState, user_id: Uuid) -> Result<Balance, ApiError> {
        let mut conn = state.conn()?;
        LedgerRepository::user_balance(&mut conn, user_id)
    }

    pub fn entries_for_reference(
        state: &AppState,
        reference_type: &str,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, ApiError> {
        let mut conn = state.conn()?;
        LedgerRepository::entries_for_reference(&mut conn, reference_type, reference_id)
    }
}
