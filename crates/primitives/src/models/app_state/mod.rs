pub mod app_config;
pub mod payout_details;
pub mod settlement_details;
pub mod stripe_details;

pub use app_config::*;
pub use payout_details::*;
pub use settlement_details::*;
pub use stripe_details::*;
