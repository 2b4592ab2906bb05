use axum::extract::State;
use axum::Json;
use http::StatusCode;
use purse_core::services::settlement_service::{ApiError, AppState, SettlementService};
use purse_primitives::models::dtos::settlement_dto::{
    StartSettlementRequest, StartSettlementResponse,
};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/settlements",
    tag = "Settlements",
    summary = "Start a settlement run",
    description = "Opens a settlement run for a contest. Repeating the call for the same \
                   `(contest_id, run_id)` with identical inputs returns the same audit id.",
    operation_id = "startSettlement",
    request_body = StartSettlementRequest,
    responses(
        (status = 201, description = "Run started (or already started)", body = StartSettlementResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown contest"),
        (status = 409, description = "Contest not eligible, already settled, or run identity mismatch"),
    ),
)]
pub async fn start_settlement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartSettlementRequest>,
) -> Result<(StatusCode, Json<StartSettlementResponse>), ApiError> {
    let audit_id = SettlementService::start_run(&state, &req)?;
    Ok((StatusCode::CREATED, Json(StartSettlementResponse { audit_id })))
}
