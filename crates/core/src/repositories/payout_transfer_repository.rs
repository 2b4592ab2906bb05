use crate::repositories::aggregate::{coerce_count, TerminalCountRow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use purse_primitives::error::ApiError;
use purse_primitives::models::entities::enum_types::PayoutTransferStatus;
use purse_primitives::models::entities::payout_transfer::{
    NewPayoutTransfer, PayoutTransfer, TransferDecision,
};
use purse_primitives::schema::payout_transfers;
use uuid::Uuid;

pub struct PayoutTransferRepository;

impl PayoutTransferRepository {
    pub fn insert_all(
        conn: &mut PgConnection,
        transfers: &[NewPayoutTransfer],
    ) -> Result<usize, ApiError> {
        diesel::insert_into(payout_transfers::table)
            .values(transfers)
            .execute(conn)
            .map_err(ApiError::from)
    }

    pub fn find_for_update(conn: &mut PgConnection, id: Uuid) -> Result<PayoutTransfer, ApiError> {
        payout_transfers::table
            .find(id)
            .for_update()
            .select(PayoutTransfer::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("Payout transfer {} not found", id)))
    }

    pub fn for_job(conn: &mut PgConnection, job_id: Uuid) -> Result<Vec<PayoutTransfer>, ApiError> {
        payout_transfers::table
            .filter(payout_transfers::job_id.eq(job_id))
            .order((payout_transfers::rank.asc(), payout_transfers::id.asc()))
            .select(PayoutTransfer::as_select())
            .load(conn)
            .map_err(ApiError::from)
    }

    /// Locks the next transfer eligible for an attempt, skipping rows another
    /// worker holds. A `processing` row is eligible again once its lease
    /// (last update before `lease_cutoff`) has expired.
    pub fn claim_next(
        conn: &mut PgConnection,
        lease_cutoff: DateTime<Utc>,
    ) -> Result<Option<PayoutTransfer>, ApiError> {
        payout_transfers::table
            .filter(payout_transfers::external_transfer_id.is_null())
            .filter(payout_transfers::attempt_count.lt(payout_transfers::max_attempts))
            .filter(
                payout_transfers::status
                    .eq_any(PayoutTransferStatus::CLAIMABLE)
                    .or(payout_transfers::status
                        .eq(PayoutTransferStatus::Processing)
                        .and(payout_transfers::updated_at.lt(lease_cutoff))),
            )
            .order((payout_transfers::created_at.asc(), payout_transfers::id.asc()))
            .for_update()
            .skip_locked()
            .select(PayoutTransfer::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    /// Records the start of an attempt: bumps the counter and takes the lease.
    pub fn begin_attempt(conn: &mut PgConnection, id: Uuid) -> Result<PayoutTransfer, ApiError> {
        let now = Utc::now();

        diesel::update(payout_transfers::table.find(id))
            .set((
                payout_transfers::status.eq(PayoutTransferStatus::Processing),
                payout_transfers::attempt_count.eq(payout_transfers::attempt_count + 1),
                payout_transfers::last_attempt_at.eq(Some(now)),
                payout_transfers::updated_at.eq(now),
            ))
            .returning(PayoutTransfer::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    }

    pub fn apply_decision(
        conn: &mut PgConnection,
        id: Uuid,
        decision: &TransferDecision,
    ) -> Result<PayoutTransfer, ApiError> {
        let now = Utc::now();

        match &decision.external_transfer_id {
            Some(external_id) => diesel::update(payout_transfers::table.find(id))
                .filter(payout_transfers::external_transfer_id.is_null())
                .set((
                    payout_transfers::status.eq(decision.status),
                    payout_transfers::external_transfer_id.eq(Some(external_id)),
                    payout_transfers::last_error.eq(None::<String>),
                    payout_transfers::updated_at.eq(now),
                ))
                .returning(PayoutTransfer::as_returning())
                .get_result(conn)
                .map_err(ApiError::from),
            None => diesel::update(payout_transfers::table.find(id))
                .set((
                    payout_transfers::status.eq(decision.status),
                    payout_transfers::last_error.eq(decision.last_error.as_deref()),
                    payout_transfers::updated_at.eq(now),
                ))
                .returning(PayoutTransfer::as_returning())
                .get_result(conn)
                .map_err(ApiError::from),
        }
    }

    /// `processing` rows whose lease expired with no attempts left.
    pub fn expired_exhausted(
        conn: &mut PgConnection,
        lease_cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PayoutTransfer>, ApiError> {
        payout_transfers::table
            .filter(payout_transfers::status.eq(PayoutTransferStatus::Processing))
            .filter(payout_transfers::updated_at.lt(lease_cutoff))
            .filter(payout_transfers::attempt_count.ge(payout_transfers::max_attempts))
            .order(payout_transfers::updated_at.asc())
            .limit(limit)
            .for_update()
            .skip_locked()
            .select(PayoutTransfer::as_select())
            .load(conn)
            .map_err(ApiError::from)
    }

    /// Completed and failed-terminal counts for a job.
    pub fn terminal_counts(conn: &mut PgConnection, job_id: Uuid) -> Result<(i32, i32), ApiError> {
        let row = diesel::sql_query(
            "SELECT \
                COUNT(*) FILTER (WHERE status = 'completed')::TEXT AS completed, \
                COUNT(*) FILTER (WHERE status = 'failed_terminal')::TEXT AS failed \
             FROM payout_transfers \
             WHERE job_id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .get_result::<TerminalCountRow>(conn)?;

        Ok((
            coerce_count("completed", row.completed.as_deref())?,
            coerce_count("failed_terminal", row.failed.as_deref())?,
        ))
    }
}
