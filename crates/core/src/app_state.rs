use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::PgConnection;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

use crate::clients::{ContestGate, PgContestGate, StripeTransferRail, TransferRail};
use eyre::Result;
use purse_primitives::error::ApiError;
pub use purse_primitives::models::app_config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rail: Arc<dyn TransferRail>,
    pub gate: Arc<dyn ContestGate>,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Result<Arc<Self>> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let rail = StripeTransferRail::new(
            http,
            &config.stripe_details.stripe_api_url,
            config.stripe_details.stripe_secret_key.clone(),
        )?;

        let gate = PgContestGate::new(config.settlement_details.eligible_contest_statuses.clone());

        Ok(Self::with_collaborators(db, config, Arc::new(rail), Arc::new(gate)))
    }

    /// Builds state around an explicit rail and gate.
    pub fn with_collaborators(
        db: DbPool,
        config: AppConfig,
        rail: Arc<dyn TransferRail>,
        gate: Arc<dyn ContestGate>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            rail,
            gate,
        })
    }

    pub fn conn(&self) -> Result<DbConn, ApiError> {
        self.db.get().map_err(ApiError::from)
    }
}
