use axum::extract::{Path, State};
use axum::Json;
use purse_core::services::payout_orchestrator::{ApiError, AppState, PayoutOrchestrator};
use purse_primitives::models::dtos::settlement_dto::{
    CompleteSettlementResponse, SettlementResponse,
};
use purse_primitives::models::entities::settlement_audit::SettlementOutput;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/settlements/{id}/complete",
    tag = "Settlements",
    summary = "Complete a settlement run and schedule payouts",
    operation_id = "completeSettlement",
    params(("id" = Uuid, Path, description = "Settlement audit id")),
    request_body = SettlementOutput,
    responses(
        (status = 200, description = "Run completed", body = CompleteSettlementResponse),
        (status = 400, description = "Output does not balance or lists a winner twice"),
        (status = 404, description = "Unknown settlement"),
        (status = 409, description = "Run is not STARTED or the contest is already settled"),
    ),
)]
pub async fn complete_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(output): Json<SettlementOutput>,
) -> Result<Json<CompleteSettlementResponse>, ApiError> {
    let (audit, scheduled) = PayoutOrchestrator::settle_and_schedule(&state, id, &output)?;

    Ok(Json(CompleteSettlementResponse {
        settlement: SettlementResponse::try_from(audit)?,
        payout_job_id: scheduled.map(|s| s.job_id),
        payout_job_created: scheduled.map(|s| s.created).unwrap_or(false),
    }))
}
