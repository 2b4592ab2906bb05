mod common;

use common::fixtures::{output, started_run};
use common::{
    expire_lease, insert_contest, insert_destination, setup, setup_with, test_payout_info,
    ScriptedRail,
};
use diesel::prelude::*;
use diesel::sql_types::Uuid as SqlUuid;
use purse_core::clients::StripeTransferRail;
use purse_core::repositories::ledger_repository::LedgerRepository;
use purse_core::repositories::payout_job_repository::PayoutJobRepository;
use purse_core::repositories::payout_transfer_repository::PayoutTransferRepository;
use purse_core::services::ledger_service::LedgerService;
use purse_core::services::payout_execution::PayoutExecutionEngine;
use purse_core::services::payout_orchestrator::{PayoutOrchestrator, BACKFILL_BATCH};
use purse_core::services::payout_scheduler::PayoutScheduler;
use purse_core::services::settlement_service::SettlementService;
use purse_core::AppState;
use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::payout_dto::ExecutionOutcome;
use purse_primitives::models::dtos::rail_dto::RailOutcome;
use purse_primitives::models::entities::enum_types::{
    LedgerEntryType, PayoutJobStatus, PayoutTransferStatus,
};
use purse_primitives::models::entities::ledger_entry::{NewLedgerEntry, REFERENCE_PAYOUT_TRANSFER};
use purse_primitives::models::entities::payout_transfer::{transfer_idempotency_key, PayoutTransfer};
use secrecy::SecretString;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collect_entry_fee(state: &AppState, contest: Uuid, user: Uuid, amount: i64) {
    let entry = NewLedgerEntry::of_type(
        LedgerEntryType::EntryFee,
        format!("test:entry_fee:{}", user),
        amount,
        "usd",
    )
    .for_contest(contest)
    .for_user(user)
    .referencing("test_fixture", user);
    LedgerService::record(state, &entry).unwrap();
}

fn transfers_of(state: &AppState, job_id: Uuid) -> Vec<PayoutTransfer> {
    let mut conn = state.conn().unwrap();
    PayoutTransferRepository::for_job(&mut conn, job_id).unwrap()
}

fn ledger_keys_for(state: &AppState, transfer: &PayoutTransfer) -> Vec<String> {
    let mut keys: Vec<String> =
        LedgerService::entries_for_reference(state, REFERENCE_PAYOUT_TRANSFER, &transfer.id.to_string())
            .unwrap()
            .into_iter()
            .map(|e| e.idempotency_key)
            .collect();
    keys.sort();
    keys
}

#[tokio::test]
#[serial]
async fn scheduling_is_idempotent_per_settlement() {
    let Some((state, _rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let run = started_run(&state, contest);

    // zero-amount winners are recorded but not paid
    let result = output(&[(a, 1, 600), (b, 2, 400), (c, 3, 0)]);
    let (audit, scheduled) = PayoutOrchestrator::settle_and_schedule(&state, run, &result).unwrap();
    let scheduled = scheduled.unwrap();
    assert!(scheduled.created);

    let winners = result.payable_winners();
    let again =
        PayoutOrchestrator::schedule_for_settlement(&state, audit.id, contest, &winners).unwrap();
    assert_eq!(again.job_id, scheduled.job_id);
    assert!(!again.created);

    assert_eq!(PayoutOrchestrator::schedule_completed_settlements(&state).unwrap(), 0);

    let transfers = transfers_of(&state, scheduled.job_id);
    assert_eq!(transfers.len(), 2);
    for t in &transfers {
        assert_eq!(t.status, PayoutTransferStatus::Pending);
        assert_eq!(t.attempt_count, 0);
        assert_eq!(t.idempotency_key, transfer_idempotency_key(contest, t.user_id));
    }

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find(&mut conn, scheduled.job_id).unwrap().unwrap();
    assert_eq!(job.total_count, 2);
    assert_eq!(job.status, PayoutJobStatus::Pending);
}

#[tokio::test]
#[serial]
async fn complete_settlement_without_job_is_backfilled_by_the_sweep() {
    let Some((state, _rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let winner = Uuid::new_v4();
    insert_destination(&state, winner, "acct_backfill");

    // completion committed but scheduling never ran
    let run = started_run(&state, contest);
    SettlementService::complete_run(&state, run, &output(&[(winner, 1, 250)])).unwrap();

    let report = PayoutScheduler::run_sweep(state.clone()).await;
    assert_eq!(report.jobs_scheduled, 1);
    assert_eq!(report.completed, 1);

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find_by_settlement(&mut conn, run).unwrap().unwrap();
    assert_eq!(job.status, PayoutJobStatus::Complete);
}

#[tokio::test]
#[serial]
async fn unpayable_settlements_do_not_hide_newer_ones_from_backfill() {
    let Some((state, _rail)) = setup() else {
        return;
    };

    // more zero-payout settlements than one backfill page holds
    for _ in 0..=BACKFILL_BATCH {
        let contest = insert_contest(&state, "COMPLETE");
        let run = started_run(&state, contest);
        SettlementService::complete_run(&state, run, &output(&[(Uuid::new_v4(), 1, 0)])).unwrap();
    }

    let contest = insert_contest(&state, "COMPLETE");
    let winner = Uuid::new_v4();
    let run = started_run(&state, contest);
    SettlementService::complete_run(&state, run, &output(&[(winner, 1, 5000)])).unwrap();

    assert_eq!(PayoutOrchestrator::schedule_completed_settlements(&state).unwrap(), 1);
    assert_eq!(PayoutOrchestrator::schedule_completed_settlements(&state).unwrap(), 0);

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find_by_settlement(&mut conn, run).unwrap().unwrap();
    assert_eq!(job.total_count, 1);
    let transfers = transfers_of(&state, job.id);
    assert_eq!(transfers[0].user_id, winner);
    assert_eq!(transfers[0].amount, 5000);
}

#[tokio::test]
#[serial]
async fn one_transient_failure_then_both_winners_are_paid() {
    let Some((state, rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    collect_entry_fee(&state, contest, a, 500);
    collect_entry_fee(&state, contest, b, 500);
    insert_destination(&state, a, "acct_a");
    insert_destination(&state, b, "acct_b");
    rail.script("acct_b", [RailOutcome::transient("HTTP 503")]);

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(a, 1, 700), (b, 2, 300)]))
            .unwrap();
    let job_id = scheduled.unwrap().job_id;

    let report = PayoutScheduler::run_sweep(state.clone()).await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.completed, 2);
    assert_eq!(report.retryable, 1);
    assert_eq!(report.failed_terminal, 0);
    assert_eq!(report.errors, 0);

    let transfers = transfers_of(&state, job_id);
    for t in &transfers {
        assert_eq!(t.status, PayoutTransferStatus::Completed);
        assert!(t.external_transfer_id.is_some());
    }
    let tb = transfers.iter().find(|t| t.user_id == b).unwrap();
    assert_eq!(tb.attempt_count, 2);
    assert_eq!(
        ledger_keys_for(&state, tb),
        vec![
            format!("{}:attempt:1:retryable", tb.idempotency_key),
            format!("{}:completed", tb.idempotency_key),
        ]
    );

    // both calls for B carried the same key
    let b_keys: Vec<String> = rail
        .calls()
        .into_iter()
        .filter(|c| c.destination == "acct_b")
        .map(|c| c.idempotency_key)
        .collect();
    assert_eq!(b_keys, vec![tb.idempotency_key.clone(), tb.idempotency_key.clone()]);

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find(&mut conn, job_id).unwrap().unwrap();
    assert_eq!(job.status, PayoutJobStatus::Complete);
    assert_eq!(job.completed_count, 2);
    assert_eq!(job.failed_count, 0);
    assert!(job.completed_at.is_some());

    let balance = LedgerService::contest_balance(&state, contest).unwrap().balance;
    assert_eq!(balance.credits, 1000);
    assert_eq!(balance.debits, 1000);
    assert_eq!(balance.net, 0);

    // nothing left to do on the next tick
    let idle = PayoutScheduler::run_sweep(state.clone()).await;
    assert_eq!(idle.attempted, 0);
    assert_eq!(rail.calls().len(), 3);
}

#[tokio::test]
#[serial]
async fn transient_then_success_and_permanent_failure_complete_the_job() {
    let Some((state, rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    collect_entry_fee(&state, contest, a, 500);
    collect_entry_fee(&state, contest, b, 500);
    insert_destination(&state, a, "acct_a");
    insert_destination(&state, b, "acct_b");
    rail.script("acct_a", [RailOutcome::transient("HTTP 503")]);
    rail.script("acct_b", [RailOutcome::permanent("HTTP 400: account closed")]);

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(a, 1, 700), (b, 2, 300)]))
            .unwrap();
    let job_id = scheduled.unwrap().job_id;

    let report = PayoutScheduler::run_sweep(state.clone()).await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.completed, 1);
    assert_eq!(report.retryable, 1);
    assert_eq!(report.failed_terminal, 1);

    let transfers = transfers_of(&state, job_id);
    let ta = transfers.iter().find(|t| t.user_id == a).unwrap();
    let tb = transfers.iter().find(|t| t.user_id == b).unwrap();

    assert_eq!(ta.status, PayoutTransferStatus::Completed);
    assert_eq!(ta.attempt_count, 2);
    assert!(ta.external_transfer_id.is_some());
    assert_eq!(
        ledger_keys_for(&state, ta),
        vec![
            format!("{}:attempt:1:retryable", ta.idempotency_key),
            format!("{}:completed", ta.idempotency_key),
        ]
    );

    assert_eq!(tb.status, PayoutTransferStatus::FailedTerminal);
    assert_eq!(tb.attempt_count, 1);
    assert!(tb.external_transfer_id.is_none());
    assert!(tb.last_error.as_deref().unwrap().starts_with("permanent"));
    assert_eq!(
        ledger_keys_for(&state, tb),
        vec![format!("{}:attempt:1:failed_terminal", tb.idempotency_key)]
    );
    assert_eq!(rail.calls_to("acct_b"), 1);

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find(&mut conn, job_id).unwrap().unwrap();
    assert_eq!(job.status, PayoutJobStatus::Complete);
    assert_eq!(job.completed_count, 1);
    assert_eq!(job.failed_count, 1);

    // only the completed payout moves the pool
    let balance = LedgerService::contest_balance(&state, contest).unwrap().balance;
    assert_eq!(balance.debits, 700);
    assert_eq!(balance.net, 300);
}

#[tokio::test]
#[serial]
async fn perpetually_transient_rail_stops_at_max_attempts() {
    let Some((state, rail)) = setup() else {
        return;
    };
    let max = test_payout_info().max_attempts;
    let contest = insert_contest(&state, "COMPLETE");
    let user = Uuid::new_v4();
    insert_destination(&state, user, "acct_flaky");
    rail.script("acct_flaky", (0..10).map(|_| RailOutcome::transient("timeout")));

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(user, 1, 100)])).unwrap();
    let job_id = scheduled.unwrap().job_id;

    PayoutScheduler::run_sweep(state.clone()).await;
    PayoutScheduler::run_sweep(state.clone()).await;

    assert_eq!(rail.calls_to("acct_flaky"), max as usize);

    let transfer = transfers_of(&state, job_id).remove(0);
    assert_eq!(transfer.status, PayoutTransferStatus::FailedTerminal);
    assert_eq!(transfer.attempt_count, max);
    assert!(transfer.external_transfer_id.is_none());

    let keys = ledger_keys_for(&state, &transfer);
    assert_eq!(keys.len(), max as usize);
    assert!(keys.contains(&format!("{}:attempt:{}:failed_terminal", transfer.idempotency_key, max)));

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find(&mut conn, job_id).unwrap().unwrap();
    assert_eq!(job.status, PayoutJobStatus::Complete);
    assert_eq!(job.failed_count, 1);

    // failed attempts do not move the pool
    let balance = LedgerService::contest_balance(&state, contest).unwrap().balance;
    assert_eq!(balance.debits, 0);
}

#[tokio::test]
#[serial]
async fn missing_destination_fails_without_calling_the_rail() {
    let Some((state, rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let user = Uuid::new_v4();

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(user, 1, 100)])).unwrap();
    let job_id = scheduled.unwrap().job_id;

    let outcome = PayoutExecutionEngine::execute_next(&state).await.unwrap();
    assert!(matches!(
        outcome,
        ExecutionOutcome::Finished {
            status: PayoutTransferStatus::FailedTerminal,
            ..
        }
    ));
    assert!(rail.calls().is_empty());

    let transfer = transfers_of(&state, job_id).remove(0);
    assert_eq!(transfer.attempt_count, 1);
    assert!(transfer.last_error.unwrap().starts_with("permanent"));

    assert_eq!(
        PayoutExecutionEngine::execute_next(&state).await.unwrap(),
        ExecutionOutcome::Idle
    );
}

#[tokio::test]
#[serial]
async fn late_result_after_lease_reclaim_is_superseded() {
    let Some((state, rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let user = Uuid::new_v4();
    insert_destination(&state, user, "acct_slow");
    rail.delay_each_call(Duration::from_millis(400));

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(user, 1, 100)])).unwrap();
    let job_id = scheduled.unwrap().job_id;
    let transfer_id = transfers_of(&state, job_id)[0].id;

    let first = {
        let state = state.clone();
        tokio::spawn(async move { PayoutExecutionEngine::execute_next(&state).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // the first worker looks dead; a second one takes over
    expire_lease(&state, transfer_id);
    let second = {
        let state = state.clone();
        tokio::spawn(async move { PayoutExecutionEngine::execute_next(&state).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first, ExecutionOutcome::Superseded { transfer_id });
    assert_eq!(
        second,
        ExecutionOutcome::Finished {
            transfer_id,
            status: PayoutTransferStatus::Completed
        }
    );

    let calls = rail.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].idempotency_key, calls[1].idempotency_key);

    let transfer = transfers_of(&state, job_id).remove(0);
    assert_eq!(transfer.attempt_count, 2);
    assert_eq!(
        ledger_keys_for(&state, &transfer),
        vec![format!("{}:completed", transfer.idempotency_key)]
    );
}

#[tokio::test]
#[serial]
async fn reaper_fails_exhausted_transfers_with_dead_workers() {
    let Some((state, _rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let user = Uuid::new_v4();

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(user, 1, 100)])).unwrap();
    let job_id = scheduled.unwrap().job_id;
    let transfer_id = transfers_of(&state, job_id)[0].id;

    // a worker claimed the final attempt and vanished
    {
        let mut conn = state.conn().unwrap();
        diesel::sql_query(
            "UPDATE payout_transfers \
             SET status = 'processing', attempt_count = max_attempts, \
                 updated_at = now() - interval '1 hour' \
             WHERE id = $1",
        )
        .bind::<SqlUuid, _>(transfer_id)
        .execute(&mut conn)
        .unwrap();
    }

    let report = PayoutScheduler::run_sweep(state.clone()).await;
    assert_eq!(report.leases_reaped, 1);
    assert_eq!(report.attempted, 0);

    let transfer = transfers_of(&state, job_id).remove(0);
    assert_eq!(transfer.status, PayoutTransferStatus::FailedTerminal);
    assert_eq!(transfer.last_error.as_deref(), Some("lease expired"));
    assert_eq!(
        ledger_keys_for(&state, &transfer),
        vec![format!(
            "{}:attempt:{}:lease_expired",
            transfer.idempotency_key, transfer.max_attempts
        )]
    );

    let mut conn = state.conn().unwrap();
    let job = PayoutJobRepository::find(&mut conn, job_id).unwrap().unwrap();
    assert_eq!(job.status, PayoutJobStatus::Complete);
}

#[tokio::test]
#[serial]
async fn finalizing_a_complete_job_is_an_illegal_transition() {
    let Some((state, _rail)) = setup() else {
        return;
    };
    let contest = insert_contest(&state, "COMPLETE");
    let user = Uuid::new_v4();
    insert_destination(&state, user, "acct_ok");

    let run = started_run(&state, contest);
    let (_, scheduled) =
        PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(user, 1, 100)])).unwrap();
    let job_id = scheduled.unwrap().job_id;
    PayoutScheduler::run_sweep(state.clone()).await;

    let mut conn = state.conn().unwrap();
    let err = conn
        .transaction::<_, ApiError, _>(|conn| PayoutExecutionEngine::finalize_job(conn, job_id))
        .unwrap_err();
    assert!(matches!(err, ApiError::IllegalTransition { .. }), "{:?}", err);

    let entries = LedgerRepository::entries_for_contest(&mut conn, contest).unwrap();
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.entry_type == LedgerEntryType::PayoutCompleted)
            .count(),
        1
    );
}

#[tokio::test]
#[serial]
async fn stripe_rail_pays_out_with_the_transfer_key() {
    if common::test_database_url().is_none() {
        return;
    }
    let server = MockServer::start().await;
    let rail = StripeTransferRail::new(
        reqwest::Client::new(),
        &server.uri(),
        SecretString::from("sk_test_rail"),
    )
    .unwrap();
    let Some(state) = setup_with(Arc::new(rail), test_payout_info()) else {
        return;
    };

    let contest = insert_contest(&state, "COMPLETE");
    let user = Uuid::new_v4();
    insert_destination(&state, user, "acct_connect_1");
    let key = transfer_idempotency_key(contest, user);

    Mock::given(method("POST"))
        .and(path("/v1/transfers"))
        .and(header("Idempotency-Key", key.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "tr_live_1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let run = started_run(&state, contest);
    PayoutOrchestrator::settle_and_schedule(&state, run, &output(&[(user, 1, 4200)])).unwrap();

    let report = PayoutScheduler::run_sweep(state.clone()).await;
    assert_eq!(report.completed, 1);

    let mut conn = state.conn().unwrap();
    let completed = LedgerRepository::find_by_key(&mut conn, &format!("{}:completed", key))
        .unwrap()
        .unwrap();
    assert_eq!(completed.amount, 4200);
    assert_eq!(completed.metadata["external_transfer_id"], "tr_live_1");
}
