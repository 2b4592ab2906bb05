use crate::models::app_state::payout_details::PayoutInfo;
use crate::models::app_state::settlement_details::SettlementInfo;
use crate::models::app_state::stripe_details::StripeInfo;
use eyre::Report;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub stripe_details: StripeInfo,

    pub payout_details: PayoutInfo,

    pub settlement_details: SettlementInfo,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Report> {
        Ok(Self {
            stripe_details: StripeInfo::new()?,

            payout_details: PayoutInfo::new()?,

            settlement_details: SettlementInfo::new()?,
        })
    }
}
