use crate::config::swagger_config::ApiDoc;
use crate::handlers::{
    complete_settlement::complete_settlement, contest_balance::contest_balance,
    fail_settlement::fail_settlement, get_settlement::get_settlement, health::health_check,
    payment_webhook::payment_webhook, payout_job::get_payout_job, payout_jobs::list_payout_jobs,
    run_payouts::run_payouts, start_settlement::start_settlement,
};
use axum::routing::{get, post};
use axum::Router;
use purse_core::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(webhook_routes())
        .merge(operator_routes())
        .route("/api/health", get(health_check))
        .layer(axum::extract::DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/webhooks/payments", post(payment_webhook))
}

fn operator_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/settlements", post(start_settlement))
        .route("/api/settlements/{id}", get(get_settlement))
        .route("/api/settlements/{id}/complete", post(complete_settlement))
        .route("/api/settlements/{id}/fail", post(fail_settlement))
        .route("/api/payouts/jobs", get(list_payout_jobs))
        .route("/api/payouts/jobs/{id}", get(get_payout_job))
        .route("/api/payouts/run", post(run_payouts))
        .route("/api/ledger/contests/{id}/balance", get(contest_balance))
}
