pub mod enum_types;
pub mod intake_event;
pub mod ledger_entry;
pub mod payout_destination;
pub mod payout_job;
pub mod payout_transfer;
pub mod settlement_audit;

pub use enum_types::*;
pub use intake_event::*;
pub use ledger_entry::*;
pub use payout_destination::*;
pub use payout_job::*;
pub use payout_transfer::*;
pub use settlement_audit::*;
