use purse_core::services::settlement_service::SettlementService;
use purse_core::AppState;
use purse_primitives::models::dtos::settlement_dto::StartSettlementRequest;
use purse_primitives::models::entities::settlement_audit::{SettlementOutput, Winner};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn payment_intent_succeeded(
    event_id: &str,
    intent_id: &str,
    amount: i64,
    contest_id: Uuid,
    user_id: Uuid,
) -> Value {
    json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "created": 1_700_000_000,
        "data": {
            "object": {
                "id": intent_id,
                "object": "payment_intent",
                "amount_received": amount,
                "currency": "usd",
                "metadata": {
                    "contest_id": contest_id.to_string(),
                    "user_id": user_id.to_string()
                }
            }
        }
    })
}

pub fn charge_refunded(
    event_id: &str,
    charge_id: &str,
    refunded: i64,
    contest_id: Uuid,
    user_id: Uuid,
) -> Value {
    json!({
        "id": event_id,
        "type": "charge.refunded",
        "data": {
            "object": {
                "id": charge_id,
                "object": "charge",
                "amount_refunded": refunded,
                "currency": "usd",
                "payment_intent": "pi_refunded",
                "metadata": {
                    "contest_id": contest_id.to_string(),
                    "user_id": user_id.to_string()
                }
            }
        }
    })
}

pub fn start_request(contest_id: Uuid, run_id: Uuid) -> StartSettlementRequest {
    StartSettlementRequest {
        contest_id,
        run_id,
        engine_version: "engine-1.4.0".into(),
        applied_input_ids: vec!["score_batch_1".into(), "score_batch_2".into()],
    }
}

pub fn output(winners: &[(Uuid, i32, i64)]) -> SettlementOutput {
    let winners: Vec<Winner> = winners
        .iter()
        .map(|&(user_id, rank, amount_cents)| Winner {
            user_id,
            rank,
            amount_cents,
        })
        .collect();
    let total_cents = winners.iter().map(|w| w.amount_cents).sum();

    SettlementOutput {
        winners,
        total_cents,
    }
}

/// Starts a run for an eligible contest and returns its audit id.
pub fn started_run(state: &AppState, contest_id: Uuid) -> Uuid {
    SettlementService::start_run(state, &start_request(contest_id, Uuid::new_v4()))
        .expect("start settlement run")
}
