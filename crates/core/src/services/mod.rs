pub mod diagnostics_service;
pub mod intake_service;
pub mod ledger_service;
pub mod payout_execution;
pub mod payout_orchestrator;
pub mod payout_scheduler;
pub mod settlement_service;
