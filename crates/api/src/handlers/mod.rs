pub mod complete_settlement;
pub mod contest_balance;
pub mod fail_settlement;
pub mod get_settlement;
pub mod health;
pub mod payment_webhook;
pub mod payout_job;
pub mod payout_jobs;
pub mod run_payouts;
pub mod start_settlement;
