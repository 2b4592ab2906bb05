pub mod contest_gate;
pub mod stripe_transfer;
pub mod transfer_rail;

pub use contest_gate::{ContestGate, PgContestGate};
pub use stripe_transfer::StripeTransferRail;
pub use transfer_rail::TransferRail;
