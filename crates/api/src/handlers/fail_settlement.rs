use axum::extract::{Path, State};
use axum::Json;
use purse_core::services::settlement_service::{ApiError, AppState, SettlementService};
use purse_primitives::models::dtos::settlement_dto::{FailSettlementRequest, SettlementResponse};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/settlements/{id}/fail",
    tag = "Settlements",
    summary = "Mark a settlement run as failed",
    operation_id = "failSettlement",
    params(("id" = Uuid, Path, description = "Settlement audit id")),
    request_body = FailSettlementRequest,
    responses(
        (status = 200, description = "Run failed", body = SettlementResponse),
        (status = 404, description = "Unknown settlement"),
        (status = 409, description = "Run is already terminal"),
    ),
)]
pub async fn fail_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<FailSettlementRequest>,
) -> Result<Json<SettlementResponse>, ApiError> {
    req.validate()?;
    let audit = SettlementService::fail_run(&state, id, &req.reason)?;
    Ok(Json(SettlementResponse::try_from(audit)?))
}
