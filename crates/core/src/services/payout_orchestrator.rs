use diesel::prelude::*;
use std::collections::HashSet;
use tracing::{error, info, warn};
use uuid::Uuid;

pub use crate::app_state::AppState;
use crate::repositories::payout_job_repository::PayoutJobRepository;
use crate::repositories::payout_transfer_repository::PayoutTransferRepository;
use crate::repositories::settlement_repository::SettlementRepository;
use crate::services::settlement_service::SettlementService;
pub use purse_primitives::error::ApiError;
use purse_primitives::models::app_state::payout_details::PayoutInfo;
use purse_primitives::models::dtos::payout_dto::ScheduleResult;
use purse_primitives::models::entities::enum_types::{
    PayoutJobStatus, PayoutTransferStatus, SettlementStatus,
};
use purse_primitives::models::entities::payout_job::NewPayoutJob;
use purse_primitives::models::entities::payout_transfer::{
    transfer_idempotency_key, NewPayoutTransfer,
};
use purse_primitives::models::entities::settlement_audit::{
    SettlementAudit, SettlementOutput, Winner,
};

pub const BACKFILL_BATCH: i64 = 100;

pub struct PayoutOrchestrator;

impl PayoutOrchestrator {
    pub fn validate_winners(winners: &[Winner]) -> Result<(), ApiError> {
        if winners.is_empty() {
            return Err(ApiError::BadRequest("Payout requires at least one winner".into()));
        }

        let mut seen = HashSet::with_capacity(winners.len());
        for w in winners {
            if w.amount_cents <= 0 {
                return Err(ApiError::BadRequest(format!(
                    "Payout amount for {} must be positive",
                    w.user_id
                )));
            }
            if !seen.insert(w.user_id) {
                return Err(ApiError::BadRequest(format!(
                    "Winner {} listed more than once",
                    w.user_id
                )));
            }
        }

        Ok(())
    }

    /// One pending transfer per winner, keyed by (contest, user).
    pub fn plan_transfers(
        job_id: Uuid,
        contest_id: Uuid,
        winners: &[Winner],
        payout: &PayoutInfo,
    ) -> Vec<NewPayoutTransfer> {
        winners
            .iter()
            .map(|w| NewPayoutTransfer {
                job_id,
                contest_id,
                user_id: w.user_id,
                rank: w.rank,
                amount: w.amount_cents,
                currency: payout.currency.clone(),
                status: PayoutTransferStatus::Pending,
                attempt_count: 0,
                max_attempts: payout.max_attempts,
                idempotency_key: transfer_idempotency_key(contest_id, w.user_id),
            })
            .collect()
    }

    pub fn schedule_for_settlement(
        state: &AppState,
        settlement_id: Uuid,
        contest_id: Uuid,
        winners: &[Winner],
    ) -> Result<ScheduleResult, ApiError> {
        Self::validate_winners(winners)?;

        let mut conn = state.conn()?;
        conn.transaction::<_, ApiError, _>(|conn| {
            Self::schedule_in(conn, &state.config.payout_details, settlement_id, contest_id, winners)
        })
    }

    fn schedule_in(
        conn: &mut PgConnection,
        payout: &PayoutInfo,
        settlement_id: Uuid,
        contest_id: Uuid,
        winners: &[Winner],
    ) -> Result<ScheduleResult, ApiError> {
        let settlement = SettlementRepository::find(conn, settlement_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Settlement {} not found", settlement_id)))?;

        if settlement.status != SettlementStatus::Complete {
            return Err(ApiError::Conflict(format!(
                "Settlement {} is {}, not COMPLETE",
                settlement_id, settlement.status
            )));
        }
        if settlement.contest_id != contest_id {
            return Err(ApiError::BadRequest(format!(
                "Settlement {} belongs to contest {}, not {}",
                settlement_id, settlement.contest_id, contest_id
            )));
        }

        let total_count = i32::try_from(winners.len())
            .map_err(|_| ApiError::BadRequest("Too many winners for one job".into()))?;

        let inserted = PayoutJobRepository::insert_if_new(
            conn,
            NewPayoutJob {
                settlement_id,
                contest_id,
                status: PayoutJobStatus::Pending,
                total_count,
            },
        )?;

        let Some(job) = inserted else {
            let existing = PayoutJobRepository::find_by_settlement(conn, settlement_id)?
                .ok_or_else(|| ApiError::Internal("Payout job vanished after conflict".into()))?;
            info!(
                job_id = %existing.id,
                %settlement_id,
                "Payout job already scheduled"
            );
            return Ok(ScheduleResult {
                job_id: existing.id,
                created: false,
            });
        };

        let transfers = Self::plan_transfers(job.id, contest_id, winners, payout);
        let written = PayoutTransferRepository::insert_all(conn, &transfers)?;

        info!(
            job_id = %job.id,
            %settlement_id,
            %contest_id,
            transfers = written,
            "Payout job scheduled"
        );

        Ok(ScheduleResult {
            job_id: job.id,
            created: true,
        })
    }

    fn payable_output(settlement: &SettlementAudit) -> Result<Option<SettlementOutput>, ApiError> {
        let Some(output) = settlement.parsed_output()? else {
            return Ok(None);
        };
        let payable = output.payable_winners();
        if payable.is_empty() {
            return Ok(None);
        }
        Ok(Some(SettlementOutput {
            winners: payable,
            ..output
        }))
    }

    /// Schedules every COMPLETE settlement that has no job yet. Returns the
    /// number of jobs created. Settlements that cannot be scheduled are paged
    /// past so they never hide newer ones.
    pub fn schedule_completed_settlements(state: &AppState) -> Result<usize, ApiError> {
        let mut conn = state.conn()?;
        let mut cursor = None;
        let mut created = 0;

        loop {
            let page =
                SettlementRepository::completed_without_job(&mut conn, cursor, BACKFILL_BATCH)?;
            let full_page = page.len() as i64 == BACKFILL_BATCH;
            cursor = match page.last() {
                Some(last) => last.completed_at.map(|at| (at, last.id)),
                None => None,
            };

            for settlement in page {
                if Self::backfill_one(state, &mut conn, &settlement) {
                    created += 1;
                }
            }

            if !full_page || cursor.is_none() {
                break;
            }
        }

        Ok(created)
    }

    fn backfill_one(state: &AppState, conn: &mut PgConnection, settlement: &SettlementAudit) -> bool {
        let output = match Self::payable_output(settlement) {
            Ok(Some(output)) => output,
            Ok(None) => {
                warn!(
                    settlement_id = %settlement.id,
                    "Complete settlement has no payable winners; skipping"
                );
                return false;
            }
            Err(e) => {
                error!(settlement_id = %settlement.id, error = %e, "Unreadable settlement output");
                return false;
            }
        };

        let result = conn.transaction::<_, ApiError, _>(|conn| {
            Self::schedule_in(
                conn,
                &state.config.payout_details,
                settlement.id,
                settlement.contest_id,
                &output.winners,
            )
        });

        match result {
            Ok(r) => r.created,
            Err(e) => {
                error!(settlement_id = %settlement.id, error = %e, "Failed to schedule payouts");
                false
            }
        }
    }

    /// Completes a settlement run and schedules its payouts.
    pub fn settle_and_schedule(
        state: &AppState,
        audit_id: Uuid,
        output: &SettlementOutput,
    ) -> Result<(SettlementAudit, Option<ScheduleResult>), ApiError> {
        let audit = SettlementService::complete_run(state, audit_id, output)?;

        let payable = output.payable_winners();
        if payable.is_empty() {
            info!(%audit_id, "Settlement has no payable winners; no payout job");
            return Ok((audit, None));
        }

        let scheduled = Self::schedule_for_settlement(state, audit.id, audit.contest_id, &payable)?;
        Ok((audit, Some(scheduled)))
    }
}
