use purse_core::services::payout_scheduler::PayoutScheduler;
use purse_core::AppState;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Runs a payout sweep every `PAYOUT_SWEEP_INTERVAL_SECS`. A sweep that
/// overruns delays the next tick instead of stacking.
pub fn spawn_payout_scheduler(state: Arc<AppState>) {
    let period = state.config.payout_details.sweep_interval();

    tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "Starting payout scheduler task");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // skip the immediate tick on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            PayoutScheduler::run_sweep(state.clone()).await;
        }
    });
}
