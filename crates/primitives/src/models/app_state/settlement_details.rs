use eyre::{eyre, Report};
use std::env;

#[derive(Debug, Clone)]
pub struct SettlementInfo {
    /// Contest lifecycle statuses from which a settlement run may start.
    pub eligible_contest_statuses: Vec<String>,
}

impl SettlementInfo {
    pub fn new() -> Result<Self, Report> {
        let raw = env::var("SETTLEMENT_ELIGIBLE_STATUSES").unwrap_or_else(|_| "COMPLETE".into());

        let eligible_contest_statuses: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if eligible_contest_statuses.is_empty() {
            return Err(eyre!("SETTLEMENT_ELIGIBLE_STATUSES must name at least one status"));
        }

        Ok(Self {
            eligible_contest_statuses,
        })
    }
}
