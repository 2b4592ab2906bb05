use chrono::Utc;
use diesel::prelude::*;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

pub use crate::app_state::AppState;
use crate::repositories::payout_destination_repository::PayoutDestinationRepository;
use crate::repositories::payout_job_repository::PayoutJobRepository;
use crate::repositories::payout_transfer_repository::PayoutTransferRepository;
use crate::services::ledger_service::LedgerService;
pub use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::payout_dto::ExecutionOutcome;
use purse_primitives::models::dtos::rail_dto::{RailOutcome, TransferInstruction};
use purse_primitives::models::entities::enum_types::{PayoutJobStatus, PayoutTransferStatus};
use purse_primitives::models::entities::ledger_entry::{NewLedgerEntry, REFERENCE_PAYOUT_TRANSFER};
use purse_primitives::models::entities::payout_job::{JobProgress, PayoutJob};
use purse_primitives::models::entities::payout_transfer::{decide, PayoutTransfer, TransferDecision};

const REAP_BATCH: i64 = 100;

struct Claim {
    transfer: PayoutTransfer,
    destination: Option<String>,
}

pub struct PayoutExecutionEngine;

impl PayoutExecutionEngine {
    /// Claims one transfer, calls the rail, and records the result.
    pub async fn execute_next(state: &AppState) -> Result<ExecutionOutcome, ApiError> {
        let Some(claim) = Self::claim(state)? else {
            return Ok(ExecutionOutcome::Idle);
        };

        let outcome = match claim.destination.as_deref() {
            Some(destination) => Self::call_rail(state, &claim.transfer, destination).await,
            None => {
                warn!(
                    transfer_id = %claim.transfer.id,
                    user_id = %claim.transfer.user_id,
                    "No payout destination on file"
                );
                RailOutcome::permanent("no payout destination on file")
            }
        };

        Self::record(state, &claim.transfer, &outcome)
    }

    fn claim(state: &AppState) -> Result<Option<Claim>, ApiError> {
        let lease = state.config.payout_details.lease();
        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let Some(candidate) = PayoutTransferRepository::claim_next(conn, Utc::now() - lease)?
            else {
                return Ok(None);
            };

            if candidate.status == PayoutTransferStatus::Processing {
                warn!(
                    transfer_id = %candidate.id,
                    attempt = candidate.attempt_count,
                    "Reclaiming transfer with expired lease"
                );
            }
            candidate
                .status
                .ensure_transition(PayoutTransferStatus::Processing)?;

            let transfer = PayoutTransferRepository::begin_attempt(conn, candidate.id)?;
            PayoutJobRepository::mark_processing(conn, transfer.job_id)?;
            let destination = PayoutDestinationRepository::account_for(conn, transfer.user_id)?;

            info!(
                transfer_id = %transfer.id,
                job_id = %transfer.job_id,
                attempt = transfer.attempt_count,
                max_attempts = transfer.max_attempts,
                "Payout transfer claimed"
            );

            Ok(Some(Claim {
                transfer,
                destination,
            }))
        })
    }

    async fn call_rail(state: &AppState, transfer: &PayoutTransfer, destination: &str) -> RailOutcome {
        let timeout = state.config.payout_details.rail_timeout();
        let instruction = TransferInstruction {
            amount: transfer.amount,
            currency: transfer.currency.clone(),
            destination: destination.to_string(),
            idempotency_key: transfer.idempotency_key.clone(),
            transfer_group: format!("contest_{}", transfer.contest_id),
        };

        match tokio::time::timeout(timeout, state.rail.create_transfer(&instruction, timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(transfer_id = %transfer.id, "Transfer rail call timed out");
                RailOutcome::transient("rail call timed out")
            }
        }
    }

    fn record(
        state: &AppState,
        claimed: &PayoutTransfer,
        outcome: &RailOutcome,
    ) -> Result<ExecutionOutcome, ApiError> {
        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let current = PayoutTransferRepository::find_for_update(conn, claimed.id)?;

            if current.status != PayoutTransferStatus::Processing
                || current.attempt_count != claimed.attempt_count
            {
                // another worker reclaimed the row after our lease ran out
                warn!(
                    transfer_id = %claimed.id,
                    our_attempt = claimed.attempt_count,
                    current_attempt = current.attempt_count,
                    status = %current.status,
                    success = outcome.is_success(),
                    "Payout result superseded"
                );
                return Ok(ExecutionOutcome::Superseded {
                    transfer_id: claimed.id,
                });
            }

            let decision = decide(current.attempt_count, current.max_attempts, outcome);
            let status = Self::apply(conn, &current, &decision)?;

            Ok(ExecutionOutcome::Finished {
                transfer_id: current.id,
                status,
            })
        })
    }

    /// Writes the ledger entry and status for a decision, then refreshes the
    /// parent job. Runs inside the caller's transaction with the row locked.
    fn apply(
        conn: &mut PgConnection,
        transfer: &PayoutTransfer,
        decision: &TransferDecision,
    ) -> Result<PayoutTransferStatus, ApiError> {
        transfer.status.ensure_transition(decision.status)?;

        let entry = NewLedgerEntry::of_type(
            decision.ledger_entry_type,
            decision.ledger_key(&transfer.idempotency_key),
            transfer.amount,
            transfer.currency.clone(),
        )
        .for_contest(transfer.contest_id)
        .for_user(transfer.user_id)
        .referencing(REFERENCE_PAYOUT_TRANSFER, transfer.id)
        .with_metadata(json!({
            "attempt": transfer.attempt_count,
            "external_transfer_id": decision.external_transfer_id,
            "error": decision.last_error,
        }));
        LedgerService::record_in(conn, &entry)?;

        let updated = PayoutTransferRepository::apply_decision(conn, transfer.id, decision)?;

        match updated.status {
            PayoutTransferStatus::Completed => info!(
                transfer_id = %updated.id,
                external_transfer_id = updated.external_transfer_id.as_deref().unwrap_or_default(),
                "Payout transfer completed"
            ),
            PayoutTransferStatus::Retryable => warn!(
                transfer_id = %updated.id,
                attempt = updated.attempt_count,
                error = updated.last_error.as_deref().unwrap_or_default(),
                "Payout transfer will be retried"
            ),
            _ => error!(
                transfer_id = %updated.id,
                attempt = updated.attempt_count,
                error = updated.last_error.as_deref().unwrap_or_default(),
                "Payout transfer failed terminally"
            ),
        }

        Self::finalize_job(conn, updated.job_id)?;
        Ok(updated.status)
    }

    /// Recounts a job's terminal transfers and completes it once all are done.
    pub fn finalize_job(conn: &mut PgConnection, job_id: Uuid) -> Result<PayoutJob, ApiError> {
        let job = PayoutJobRepository::find_for_update(conn, job_id)?;

        if job.status == PayoutJobStatus::Complete {
            return Err(ApiError::illegal_transition(
                "payout job",
                job.status,
                PayoutJobStatus::Complete,
            ));
        }

        let (completed, failed) = PayoutTransferRepository::terminal_counts(conn, job_id)?;
        let progress = JobProgress::new(job.total_count, completed, failed)?;
        let next = progress.next_status(job.status)?;

        let job = PayoutJobRepository::update_progress(conn, job_id, progress, next.is_some())?;
        if next.is_some() {
            info!(
                %job_id,
                completed = progress.completed,
                failed = progress.failed,
                "Payout job complete"
            );
        }
        Ok(job)
    }

    /// Fails transfers whose worker disappeared after their final attempt.
    pub fn reap_expired_leases(state: &AppState) -> Result<usize, ApiError> {
        let lease = state.config.payout_details.lease();
        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let stale =
                PayoutTransferRepository::expired_exhausted(conn, Utc::now() - lease, REAP_BATCH)?;

            for transfer in &stale {
                warn!(
                    transfer_id = %transfer.id,
                    attempt = transfer.attempt_count,
                    "Payout lease expired with no attempts left"
                );
                Self::apply(conn, transfer, &TransferDecision::lease_expired(transfer.attempt_count))?;
            }

            Ok(stale.len())
        })
    }
}
