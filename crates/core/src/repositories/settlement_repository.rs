use chrono::{DateTime, Utc};
use diesel::dsl::{exists, not, sql};
use diesel::sql_types::Bool;
use diesel::prelude::*;
use purse_primitives::error::ApiError;
use purse_primitives::models::entities::enum_types::SettlementStatus;
use purse_primitives::models::entities::settlement_audit::{NewSettlementAudit, SettlementAudit};
use purse_primitives::schema::{payout_jobs, settlement_audits};
use serde_json::Value;
use uuid::Uuid;

pub struct SettlementRepository;

impl SettlementRepository {
    /// Inserts a run unless `(contest_id, run_id)` already exists.
    pub fn insert_if_new(
        conn: &mut PgConnection,
        audit: NewSettlementAudit,
    ) -> Result<Option<SettlementAudit>, ApiError> {
        diesel::insert_into(settlement_audits::table)
            .values(&audit)
            .on_conflict((settlement_audits::contest_id, settlement_audits::run_id))
            .do_nothing()
            .returning(SettlementAudit::as_returning())
            .get_result(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<SettlementAudit>, ApiError> {
        settlement_audits::table
            .find(id)
            .select(SettlementAudit::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<SettlementAudit>, ApiError> {
        settlement_audits::table
            .find(id)
            .for_update()
            .select(SettlementAudit::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_contest_run(
        conn: &mut PgConnection,
        contest_id: Uuid,
        run_id: Uuid,
    ) -> Result<Option<SettlementAudit>, ApiError> {
        settlement_audits::table
            .filter(settlement_audits::contest_id.eq(contest_id))
            .filter(settlement_audits::run_id.eq(run_id))
            .select(SettlementAudit::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn completed_for_contest(
        conn: &mut PgConnection,
        contest_id: Uuid,
    ) -> Result<Option<SettlementAudit>, ApiError> {
        settlement_audits::table
            .filter(settlement_audits::contest_id.eq(contest_id))
            .filter(settlement_audits::status.eq(SettlementStatus::Complete))
            .select(SettlementAudit::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    /// COMPLETE runs with at least one positive payout and no payout job,
    /// ordered by `(completed_at, id)` and resumed after `after`.
    pub fn completed_without_job(
        conn: &mut PgConnection,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<SettlementAudit>, ApiError> {
        let mut query = settlement_audits::table
            .filter(settlement_audits::status.eq(SettlementStatus::Complete))
            .filter(sql::<Bool>(
                "jsonb_path_exists(settlement_audits.output, '$.winners[*] ? (@.amountCents > 0)')",
            ))
            .filter(not(exists(
                payout_jobs::table.filter(payout_jobs::settlement_id.eq(settlement_audits::id)),
            )))
            .into_boxed();

        if let Some((completed_at, id)) = after {
            query = query.filter(
                settlement_audits::completed_at.gt(completed_at).or(settlement_audits::completed_at
                    .eq(completed_at)
                    .and(settlement_audits::id.gt(id))),
            );
        }

        query
            .order((settlement_audits::completed_at.asc(), settlement_audits::id.asc()))
            .limit(limit)
            .select(SettlementAudit::as_select())
            .load(conn)
            .map_err(ApiError::from)
    }

    /// STARTED -> COMPLETE. Returns the number of rows moved (0 or 1).
    pub fn mark_complete(
        conn: &mut PgConnection,
        id: Uuid,
        output: &Value,
        output_hash: &str,
    ) -> Result<usize, ApiError> {
        diesel::update(settlement_audits::table.find(id))
            .filter(settlement_audits::status.eq(SettlementStatus::Started))
            .set((
                settlement_audits::status.eq(SettlementStatus::Complete),
                settlement_audits::output.eq(Some(output)),
                settlement_audits::output_hash.eq(Some(output_hash)),
                settlement_audits::completed_at.eq(Some(Utc::now())),
            ))
            .execute(conn)
            .map_err(ApiError::from)
    }

    /// STARTED -> FAILED. Returns the number of rows moved (0 or 1).
    pub fn mark_failed(conn: &mut PgConnection, id: Uuid, reason: &str) -> Result<usize, ApiError> {
        diesel::update(settlement_audits::table.find(id))
            .filter(settlement_audits::status.eq(SettlementStatus::Started))
            .set((
                settlement_audits::status.eq(SettlementStatus::Failed),
                settlement_audits::error_detail.eq(Some(reason)),
                settlement_audits::completed_at.eq(Some(Utc::now())),
            ))
            .execute(conn)
            .map_err(ApiError::from)
    }
}
