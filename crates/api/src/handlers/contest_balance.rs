use axum::extract::{Path, State};
use axum::Json;
use purse_core::services::ledger_service::{ApiError, AppState, LedgerService};
use purse_primitives::models::dtos::ledger_dto::ContestBalanceResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/ledger/contests/{id}/balance",
    tag = "Ledger",
    summary = "Contest pool balance",
    description = "Folds entry fees, refunds and completed payouts for the contest.",
    operation_id = "getContestBalance",
    params(("id" = Uuid, Path, description = "Contest id")),
    responses((status = 200, body = ContestBalanceResponse)),
)]
pub async fn contest_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContestBalanceResponse>, ApiError> {
    Ok(Json(LedgerService::contest_balance(&state, id)?))
}
