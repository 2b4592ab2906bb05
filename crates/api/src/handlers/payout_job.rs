use axum::extract::{Path, State};
use axum::Json;
use purse_core::services::diagnostics_service::{ApiError, AppState, DiagnosticsService};
use purse_primitives::models::dtos::payout_dto::JobDetail;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/payouts/jobs/{id}",
    tag = "Payouts",
    summary = "Payout job with its transfers and ledger trail",
    operation_id = "getPayoutJob",
    params(("id" = Uuid, Path, description = "Payout job id")),
    responses(
        (status = 200, body = JobDetail),
        (status = 404, description = "Unknown payout job"),
    ),
)]
pub async fn get_payout_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetail>, ApiError> {
    Ok(Json(DiagnosticsService::job_detail(&state, id)?))
}
