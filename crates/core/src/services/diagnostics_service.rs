use std::sync::Arc;
use uuid::Uuid;

pub use crate::app_state::AppState;
use crate::repositories::ledger_repository::LedgerRepository;
use crate::repositories::payout_job_repository::PayoutJobRepository;
use crate::repositories::payout_transfer_repository::PayoutTransferRepository;
use crate::services::payout_scheduler::PayoutScheduler;
pub use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::payout_dto::{
    JobDetail, JobSummary, JobsQuery, SweepReport, TransferView,
};
use purse_primitives::models::entities::ledger_entry::REFERENCE_PAYOUT_TRANSFER;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// Read-only views over payout state plus a manual sweep trigger.
pub struct DiagnosticsService;

impl DiagnosticsService {
    pub fn list_jobs(state: &AppState, query: &JobsQuery) -> Result<Vec<JobSummary>, ApiError> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let mut conn = state.conn()?;

        Ok(PayoutJobRepository::list(&mut conn, query.status, limit)?
            .into_iter()
            .map(JobSummary::from)
            .collect())
    }

    pub fn job_detail(state: &AppState, job_id: Uuid) -> Result<JobDetail, ApiError> {
        let mut conn = state.conn()?;

        let job = PayoutJobRepository::find(&mut conn, job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Payout job {} not found", job_id)))?;

        let transfers = PayoutTransferRepository::for_job(&mut conn, job_id)?
            .into_iter()
            .map(|t| {
                let trail = LedgerRepository::entries_for_reference(
                    &mut conn,
                    REFERENCE_PAYOUT_TRANSFER,
                    &t.id.to_string(),
                )?;
                Ok(TransferView::new(t, trail))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(JobDetail {
            job: job.into(),
            transfers,
        })
    }

    pub async fn run_now(state: Arc<AppState>) -> SweepReport {
        PayoutScheduler::run_sweep(state).await
    }
}
