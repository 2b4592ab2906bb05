use eyre::{eyre, Report};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PayoutInfo {
    /// Attempt ceiling stamped onto every transfer at creation.
    pub max_attempts: i32,
    pub currency: String,
    pub rail_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub workers: usize,
    pub max_per_sweep: usize,
    /// How long a `processing` transfer is left alone before it may be reclaimed.
    pub lease_secs: i64,
}

impl PayoutInfo {
    pub fn new() -> Result<Self, Report> {
        let info = Self {
            max_attempts: parse_var("PAYOUT_MAX_ATTEMPTS", "5")?,
            currency: env::var("PAYOUT_CURRENCY")
                .unwrap_or_else(|_| "usd".into())
                .to_lowercase(),
            rail_timeout_secs: parse_var("PAYOUT_RAIL_TIMEOUT_SECS", "30")?,
            sweep_interval_secs: parse_var("PAYOUT_SWEEP_INTERVAL_SECS", "180")?,
            workers: parse_var("PAYOUT_WORKERS", "4")?,
            max_per_sweep: parse_var("PAYOUT_MAX_PER_SWEEP", "500")?,
            lease_secs: parse_var("PAYOUT_LEASE_SECS", "300")?,
        };

        info.validate()?;
        Ok(info)
    }

    pub fn validate(&self) -> Result<(), Report> {
        if self.max_attempts < 1 {
            return Err(eyre!("PAYOUT_MAX_ATTEMPTS must be at least 1"));
        }
        if self.workers == 0 {
            return Err(eyre!("PAYOUT_WORKERS must be at least 1"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(eyre!("PAYOUT_SWEEP_INTERVAL_SECS must be at least 1"));
        }
        // a lease shorter than the rail timeout would let a live call be reclaimed
        if self.lease_secs <= self.rail_timeout_secs as i64 {
            return Err(eyre!(
                "PAYOUT_LEASE_SECS ({}) must exceed PAYOUT_RAIL_TIMEOUT_SECS ({})",
                self.lease_secs,
                self.rail_timeout_secs
            ));
        }

        Ok(())
    }

    pub fn rail_timeout(&self) -> Duration {
        Duration::from_secs(self.rail_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease_secs)
    }
}

impl Default for PayoutInfo {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            currency: "usd".into(),
            rail_timeout_secs: 30,
            sweep_interval_secs: 180,
            workers: 4,
            max_per_sweep: 500,
            lease_secs: 300,
        }
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, Report>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse::<T>()
        .map_err(|e| eyre!("Invalid {}: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PayoutInfo::default().validate().is_ok());
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let info = PayoutInfo {
            sweep_interval_secs: 0,
            ..PayoutInfo::default()
        };
        let err = info.validate().unwrap_err();
        assert!(err.to_string().contains("PAYOUT_SWEEP_INTERVAL_SECS"));
    }

    #[test]
    fn lease_must_outlast_the_rail_timeout() {
        let info = PayoutInfo {
            rail_timeout_secs: 30,
            lease_secs: 30,
            ..PayoutInfo::default()
        };
        assert!(info.validate().is_err());
    }
}
