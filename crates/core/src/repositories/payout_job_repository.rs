use chrono::Utc;
use diesel::prelude::*;
use purse_primitives::error::ApiError;
use purse_primitives::models::entities::enum_types::PayoutJobStatus;
use purse_primitives::models::entities::payout_job::{JobProgress, NewPayoutJob, PayoutJob};
use purse_primitives::schema::payout_jobs;
use uuid::Uuid;

pub struct PayoutJobRepository;

impl PayoutJobRepository {
    /// Inserts the job unless the settlement already has one.
    pub fn insert_if_new(
        conn: &mut PgConnection,
        job: NewPayoutJob,
    ) -> Result<Option<PayoutJob>, ApiError> {
        diesel::insert_into(payout_jobs::table)
            .values(&job)
            .on_conflict(payout_jobs::settlement_id)
            .do_nothing()
            .returning(PayoutJob::as_returning())
            .get_result(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<PayoutJob>, ApiError> {
        payout_jobs::table
            .find(id)
            .select(PayoutJob::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_for_update(conn: &mut PgConnection, id: Uuid) -> Result<PayoutJob, ApiError> {
        payout_jobs::table
            .find(id)
            .for_update()
            .select(PayoutJob::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("Payout job {} not found", id)))
    }

    pub fn find_by_settlement(
        conn: &mut PgConnection,
        settlement_id: Uuid,
    ) -> Result<Option<PayoutJob>, ApiError> {
        payout_jobs::table
            .filter(payout_jobs::settlement_id.eq(settlement_id))
            .select(PayoutJob::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn list(
        conn: &mut PgConnection,
        status: Option<PayoutJobStatus>,
        limit: i64,
    ) -> Result<Vec<PayoutJob>, ApiError> {
        let mut query = payout_jobs::table
            .select(PayoutJob::as_select())
            .order(payout_jobs::created_at.desc())
            .limit(limit)
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(payout_jobs::status.eq(status));
        }

        query.load(conn).map_err(ApiError::from)
    }

    /// pending -> processing; a no-op for jobs already past pending.
    pub fn mark_processing(conn: &mut PgConnection, id: Uuid) -> Result<(), ApiError> {
        diesel::update(payout_jobs::table.find(id))
            .filter(payout_jobs::status.eq(PayoutJobStatus::Pending))
            .set((
                payout_jobs::status.eq(PayoutJobStatus::Processing),
                payout_jobs::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn update_progress(
        conn: &mut PgConnection,
        id: Uuid,
        progress: JobProgress,
        complete: bool,
    ) -> Result<PayoutJob, ApiError> {
        let now = Utc::now();

        if complete {
            diesel::update(payout_jobs::table.find(id))
                .set((
                    payout_jobs::completed_count.eq(progress.completed),
                    payout_jobs::failed_count.eq(progress.failed),
                    payout_jobs::status.eq(PayoutJobStatus::Complete),
                    payout_jobs::completed_at.eq(Some(now)),
                    payout_jobs::updated_at.eq(now),
                ))
                .returning(PayoutJob::as_returning())
                .get_result(conn)
                .map_err(ApiError::from)
        } else {
            diesel::update(payout_jobs::table.find(id))
                .set((
                    payout_jobs::completed_count.eq(progress.completed),
                    payout_jobs::failed_count.eq(progress.failed),
                    payout_jobs::updated_at.eq(now),
                ))
                .returning(PayoutJob::as_returning())
                .get_result(conn)
                .map_err(ApiError::from)
        }
    }
}
