use crate::handlers::{
    complete_settlement::__path_complete_settlement, contest_balance::__path_contest_balance,
    fail_settlement::__path_fail_settlement, get_settlement::__path_get_settlement,
    health::__path_health_check, health::HealthStatus,
    payment_webhook::__path_payment_webhook, payout_job::__path_get_payout_job,
    payout_jobs::__path_list_payout_jobs, run_payouts::__path_run_payouts,
    start_settlement::__path_start_settlement,
};
use purse_primitives::models::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Purse",
        description = "Contest entry fee intake, settlement audit and winner payouts"
    ),
    paths(
        payment_webhook,
        start_settlement, complete_settlement, fail_settlement, get_settlement,
        list_payout_jobs, get_payout_job, run_payouts,
        contest_balance, health_check
    ),
    components(schemas(
        WebhookAck, IntakeStatus,
        StartSettlementRequest, StartSettlementResponse, FailSettlementRequest,
        SettlementResponse, CompleteSettlementResponse, SettlementOutput, Winner,
        SettlementStatus,
        JobsResponse, JobSummary, JobDetail, TransferView, LedgerTrailItem, SweepReport,
        PayoutJobStatus, PayoutTransferStatus,
        ContestBalanceResponse, Balance,
        HealthStatus
    )),
    tags(
        (name = "Webhooks", description = "Inbound payment provider events"),
        (name = "Settlements", description = "Settlement run lifecycle"),
        (name = "Payouts", description = "Payout jobs, transfers and manual sweeps"),
        (name = "Ledger", description = "Ledger balances"),
        (name = "Health", description = "Liveness and database reachability")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/webhooks/payments",
            "/api/settlements",
            "/api/settlements/{id}/complete",
            "/api/settlements/{id}/fail",
            "/api/settlements/{id}",
            "/api/payouts/jobs",
            "/api/payouts/jobs/{id}",
            "/api/payouts/run",
            "/api/ledger/contests/{id}/balance",
            "/api/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
