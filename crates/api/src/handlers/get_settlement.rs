use axum::extract::{Path, State};
use axum::Json;
use purse_core::services::settlement_service::{ApiError, AppState, SettlementService};
use purse_primitives::models::dtos::settlement_dto::SettlementResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/settlements/{id}",
    tag = "Settlements",
    operation_id = "getSettlement",
    params(("id" = Uuid, Path, description = "Settlement audit id")),
    responses(
        (status = 200, body = SettlementResponse),
        (status = 404, description = "Unknown settlement"),
    ),
)]
pub async fn get_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementResponse>, ApiError> {
    let audit = SettlementService::get(&state, id)?;
    Ok(Json(SettlementResponse::try_from(audit)?))
}
