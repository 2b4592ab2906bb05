use axum::extract::{Query, State};
use axum::Json;
use purse_core::services::diagnostics_service::{ApiError, AppState, DiagnosticsService};
use purse_primitives::models::dtos::payout_dto::{JobsQuery, JobsResponse};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/payouts/jobs",
    tag = "Payouts",
    summary = "List payout jobs",
    description = "Newest first. `limit` defaults to 50 and is capped at 500.",
    operation_id = "listPayoutJobs",
    params(
        ("status" = Option<String>, Query, description = "pending, processing or complete"),
        ("limit" = Option<i64>, Query, description = "Maximum number of jobs to return"),
    ),
    responses(
        (status = 200, body = JobsResponse),
        (status = 400, description = "Invalid query"),
    ),
)]
pub async fn list_payout_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<JobsResponse>, ApiError> {
    let jobs = DiagnosticsService::list_jobs(&state, &query)?;
    Ok(Json(JobsResponse { jobs }))
}
