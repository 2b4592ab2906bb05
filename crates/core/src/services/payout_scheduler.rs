use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

pub use crate::app_state::AppState;
use crate::services::payout_execution::PayoutExecutionEngine;
use crate::services::payout_orchestrator::PayoutOrchestrator;
pub use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::payout_dto::{ExecutionOutcome, SweepReport};

pub struct PayoutScheduler;

impl PayoutScheduler {
    /// One tick: backfill jobs for finished settlements, reap dead leases,
    /// then drain claimable transfers with a small worker pool.
    pub async fn run_sweep(state: Arc<AppState>) -> SweepReport {
        let mut report = SweepReport::default();

        match PayoutOrchestrator::schedule_completed_settlements(&state) {
            Ok(n) => report.jobs_scheduled = n,
            Err(e) => {
                report.errors += 1;
                error!(error = %e, "Scheduling completed settlements failed");
            }
        }

        match PayoutExecutionEngine::reap_expired_leases(&state) {
            Ok(n) => report.leases_reaped = n,
            Err(e) => {
                report.errors += 1;
                error!(error = %e, "Reaping expired payout leases failed");
            }
        }

        let payout = &state.config.payout_details;
        let budget = Arc::new(AtomicUsize::new(payout.max_per_sweep));
        let mut workers = JoinSet::new();

        for worker in 0..payout.workers {
            let state = state.clone();
            let budget = budget.clone();
            workers.spawn(async move { Self::drain(worker, state, budget).await });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(partial) => report.merge(&partial),
                Err(e) => {
                    report.errors += 1;
                    error!(error = %e, "Payout worker panicked");
                }
            }
        }

        info!(
            jobs_scheduled = report.jobs_scheduled,
            leases_reaped = report.leases_reaped,
            attempted = report.attempted,
            completed = report.completed,
            retryable = report.retryable,
            failed_terminal = report.failed_terminal,
            superseded = report.superseded,
            errors = report.errors,
            "Payout sweep finished"
        );

        report
    }

    async fn drain(worker: usize, state: Arc<AppState>, budget: Arc<AtomicUsize>) -> SweepReport {
        let mut report = SweepReport::default();

        while take_one(&budget) {
            match PayoutExecutionEngine::execute_next(&state).await {
                Ok(ExecutionOutcome::Idle) => break,
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.errors += 1;
                    error!(worker, error = %e, "Payout execution failed");
                    break;
                }
            }
        }

        report
    }
}

fn take_one(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}
