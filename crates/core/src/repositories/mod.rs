pub mod aggregate;
pub mod contest_repository;
pub mod intake_repository;
pub mod ledger_repository;
pub mod payout_destination_repository;
pub mod payout_job_repository;
pub mod payout_transfer_repository;
pub mod settlement_repository;
