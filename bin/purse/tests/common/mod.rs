#![allow(dead_code)]

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::{Text, Uuid as SqlUuid};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use purse_core::app_state::AppState;
use purse_core::clients::{ContestGate, PgContestGate, TransferRail};
use purse_core::security::compute_signature;
use purse_primitives::models::app_state::app_config::AppConfig;
use purse_primitives::models::app_state::payout_details::PayoutInfo;
use purse_primitives::models::app_state::settlement_details::SettlementInfo;
use purse_primitives::models::app_state::stripe_details::StripeInfo;
use purse_primitives::models::dtos::rail_dto::{RailOutcome, TransferInstruction};
use secrecy::SecretString;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use uuid::Uuid;

pub mod fixtures;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../../migrations");
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

static MIGRATE: Once = Once::new();

/// `None` when no test database is configured; callers return early.
pub fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok().filter(|s| !s.is_empty())
}

pub fn test_config(payout: PayoutInfo) -> AppConfig {
    AppConfig {
        stripe_details: StripeInfo {
            stripe_secret_key: SecretString::from("sk_test_fake_key_for_testing_only"),
            stripe_api_url: "http://localhost:0".to_string(),
            stripe_webhook_secret: SecretString::from(WEBHOOK_SECRET),
            webhook_tolerance_secs: 300,
        },
        payout_details: payout,
        settlement_details: SettlementInfo {
            eligible_contest_statuses: vec!["COMPLETE".to_string()],
        },
    }
}

pub fn test_payout_info() -> PayoutInfo {
    PayoutInfo {
        max_attempts: 3,
        currency: "usd".into(),
        rail_timeout_secs: 2,
        sweep_interval_secs: 60,
        workers: 2,
        max_per_sweep: 50,
        lease_secs: 30,
    }
}

/// A state wired to a clean database and the given rail, or `None` when
/// `TEST_DATABASE_URL` is unset.
pub fn setup_with(rail: Arc<dyn TransferRail>, payout: PayoutInfo) -> Option<Arc<AppState>> {
    let url = test_database_url()?;

    let pool = Pool::builder()
        .max_size(8)
        .build(ConnectionManager::<PgConnection>::new(url))
        .expect("Failed to create test database pool");

    let mut conn = pool.get().expect("Failed to get test connection");

    MIGRATE.call_once(|| {
        std::env::set_var("APP_ENV", "test");
        purse::utility::logging::setup_logging();
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations");
        // owned by the contest service in production
        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS contest_instances (id UUID PRIMARY KEY, status TEXT NOT NULL)",
        )
        .execute(&mut conn)
        .expect("Failed to create contest_instances");
    });

    clean_database(&mut conn);
    drop(conn);

    let config = test_config(payout);
    let gate = PgContestGate::new(config.settlement_details.eligible_contest_statuses.clone());

    Some(AppState::with_collaborators(
        pool,
        config,
        rail,
        Arc::new(gate) as Arc<dyn ContestGate>,
    ))
}

pub fn setup() -> Option<(Arc<AppState>, Arc<ScriptedRail>)> {
    let rail = Arc::new(ScriptedRail::default());
    let state = setup_with(rail.clone(), test_payout_info())?;
    Some((state, rail))
}

/// TRUNCATE skips the row-level append-only triggers.
pub fn clean_database(conn: &mut PgConnection) {
    diesel::sql_query(
        "TRUNCATE payout_transfers, payout_jobs, settlement_audits, ledger_entries, \
         payment_intake_events, payout_destinations, contest_instances CASCADE",
    )
    .execute(conn)
    .expect("Failed to clean test database");
}

pub fn insert_contest(state: &AppState, status: &str) -> Uuid {
    let id = Uuid::new_v4();
    let mut conn = state.conn().expect("conn");
    diesel::sql_query("INSERT INTO contest_instances (id, status) VALUES ($1, $2)")
        .bind::<SqlUuid, _>(id)
        .bind::<Text, _>(status)
        .execute(&mut conn)
        .expect("insert contest");
    id
}

pub fn insert_destination(state: &AppState, user_id: Uuid, account: &str) {
    let mut conn = state.conn().expect("conn");
    diesel::sql_query(
        "INSERT INTO payout_destinations (user_id, destination_account) VALUES ($1, $2)",
    )
    .bind::<SqlUuid, _>(user_id)
    .bind::<Text, _>(account)
    .execute(&mut conn)
    .expect("insert destination");
}

/// Pushes a transfer's lease into the past so it can be reclaimed or reaped.
pub fn expire_lease(state: &AppState, transfer_id: Uuid) {
    let mut conn = state.conn().expect("conn");
    diesel::sql_query(
        "UPDATE payout_transfers SET updated_at = now() - interval '1 hour' WHERE id = $1",
    )
    .bind::<SqlUuid, _>(transfer_id)
    .execute(&mut conn)
    .expect("expire lease");
}

/// Signs `body` the way the payment provider does.
pub fn sign(body: &[u8], timestamp: i64) -> String {
    let v1 = compute_signature(WEBHOOK_SECRET, timestamp, body).expect("sign");
    format!("t={},v1={}", timestamp, v1)
}

/// Rail double: replays queued outcomes per destination account, succeeding
/// once a queue is empty. Every call is recorded.
#[derive(Default)]
pub struct ScriptedRail {
    scripts: Mutex<HashMap<String, VecDeque<RailOutcome>>>,
    calls: Mutex<Vec<TransferInstruction>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedRail {
    pub fn script(&self, destination: &str, outcomes: impl IntoIterator<Item = RailOutcome>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default()
            .extend(outcomes);
    }

    pub fn delay_each_call(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<TransferInstruction> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, destination: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.destination == destination)
            .count()
    }
}

#[async_trait]
impl TransferRail for ScriptedRail {
    async fn create_transfer(
        &self,
        instruction: &TransferInstruction,
        _timeout: Duration,
    ) -> RailOutcome {
        self.calls.lock().unwrap().push(instruction.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&instruction.destination)
            .and_then(|q| q.pop_front());

        next.unwrap_or_else(|| RailOutcome::Success {
            transfer_id: format!("tr_{}", &instruction.idempotency_key[7..19]),
        })
    }
}
