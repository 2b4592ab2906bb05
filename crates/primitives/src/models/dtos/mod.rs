pub mod intake_dto;
pub mod ledger_dto;
pub mod payout_dto;
pub mod rail_dto;
pub mod settlement_dto;

pub use intake_dto::*;
pub use ledger_dto::*;
pub use payout_dto::*;
pub use rail_dto::*;
pub use settlement_dto::*;
