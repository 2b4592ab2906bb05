mod observability;

pub mod utility;

pub use purse_primitives::error::ApiError;

use crate::utility::db_pool::create_db_pool;
use crate::utility::logging::setup_logging;
use crate::utility::payout_task::spawn_payout_scheduler;
use crate::utility::server::serve;
use crate::utility::tasks::{build_router, load_env};
use eyre::Report;
use purse_core::app_state::AppState;
use purse_primitives::models::app_config::AppConfig;
use tracing::info;

pub async fn run() -> Result<(), Report> {
    // env first so RUST_LOG from .env is honoured
    load_env();

    setup_logging();

    info!("Starting Purse...");

    let config = AppConfig::from_env()?;

    let pool = create_db_pool()?;

    let state = AppState::new(pool, config)?;

    spawn_payout_scheduler(state.clone());

    let (metric_layer, metric_handle) = observability::metrics::setup_metrics();

    let app = build_router(state, metric_layer, metric_handle)?;

    serve(app).await?;

    info!("Purse shut down gracefully");
    Ok(())
}
