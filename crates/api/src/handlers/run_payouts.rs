use axum::extract::State;
use axum::Json;
use purse_core::services::diagnostics_service::{AppState, DiagnosticsService};
use purse_primitives::models::dtos::payout_dto::SweepReport;
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/payouts/run",
    tag = "Payouts",
    summary = "Run one payout sweep now",
    description = "Backfills missing payout jobs, reaps expired leases and executes claimable \
                   transfers up to the per-sweep limit. Safe to call while the periodic \
                   scheduler is running.",
    operation_id = "runPayouts",
    responses((status = 200, description = "Sweep finished", body = SweepReport)),
)]
pub async fn run_payouts(State(state): State<Arc<AppState>>) -> Json<SweepReport> {
    info!("Manual payout sweep requested");
    Json(DiagnosticsService::run_now(state).await)
}
