use chrono::Utc;
use diesel::prelude::*;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

pub use crate::app_state::AppState;
use crate::repositories::intake_repository::IntakeRepository;
use crate::repositories::ledger_repository::LedgerRepository;
use crate::security::verify_webhook_signature;
use crate::services::ledger_service::LedgerService;
pub use purse_primitives::error::ApiError;
use purse_primitives::canonical::canonical_hash;
use purse_primitives::models::dtos::intake_dto::{
    ChargeObject, IngestOutcome, PaymentIntentObject, ProviderEvent, EVENT_CHARGE_REFUNDED,
    EVENT_PAYMENT_INTENT_SUCCEEDED,
};
use purse_primitives::models::entities::enum_types::{IntakeStatus, LedgerEntryType};
use purse_primitives::models::entities::intake_event::NewIntakeEvent;
use purse_primitives::models::entities::ledger_entry::{NewLedgerEntry, REFERENCE_INTAKE_EVENT};

/// Ledger consequence of one provider event.
#[derive(Debug)]
pub enum LedgerEffect {
    Entry(NewLedgerEntry),
    /// A charge's cumulative refunded total. Only the increase over what the
    /// ledger already holds for the charge is recorded.
    RefundTotal {
        charge_id: String,
        entry: NewLedgerEntry,
    },
}

pub fn refund_key_prefix(charge_id: &str) -> String {
    format!("stripe:charge:{}:refund:", charge_id)
}

pub struct IntakeService;

impl IntakeService {
    pub fn ingest(
        state: &AppState,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<IngestOutcome, ApiError> {
        Self::ingest_at(state, body, signature, Utc::now().timestamp())
    }

    /// Verifies, stores and applies one provider event. `now` is unix seconds.
    pub fn ingest_at(
        state: &AppState,
        body: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<IngestOutcome, ApiError> {
        let stripe = &state.config.stripe_details;

        let Some(signature) = signature else {
            warn!("Payment webhook without signature header rejected");
            return Ok(IngestOutcome::Rejected {
                reason: "Missing signature header".into(),
            });
        };

        if let Err(e) = verify_webhook_signature(
            stripe.stripe_webhook_secret.expose_secret(),
            body,
            signature,
            stripe.webhook_tolerance_secs,
            now,
        ) {
            warn!(error = %e, "Payment webhook signature rejected");
            return Ok(IngestOutcome::Rejected {
                reason: e.to_string(),
            });
        }

        let (payload, event) = match Self::parse(body) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(%reason, "Payment webhook payload rejected");
                return Ok(IngestOutcome::Rejected { reason });
            }
        };

        let payload_hash = canonical_hash(&payload);
        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let inserted = IntakeRepository::insert_if_new(
                conn,
                NewIntakeEvent {
                    provider_event_id: &event.id,
                    event_type: &event.event_type,
                    payload: &payload,
                    payload_hash: &payload_hash,
                    processing_status: IntakeStatus::Received,
                },
            )?;

            let Some(event_id) = inserted else {
                info!(provider_event_id = %event.id, "Duplicate payment event ignored");
                return Ok(IngestOutcome::Duplicate {
                    provider_event_id: event.id.clone(),
                });
            };

            let status = match Self::interpret(&event) {
                Ok(Some(effect)) => {
                    if let Some(entry) = Self::resolve(conn, effect)? {
                        let entry = entry.referencing(REFERENCE_INTAKE_EVENT, event_id);
                        let outcome = LedgerService::record_in(conn, &entry)?;
                        info!(
                            provider_event_id = %event.id,
                            ledger_key = %entry.idempotency_key,
                            amount = entry.amount,
                            created = outcome.was_created(),
                            "Payment event recorded to ledger"
                        );
                    }
                    IntakeRepository::mark_final(conn, event_id, IntakeStatus::Processed, None)?;
                    IntakeStatus::Processed
                }
                Ok(None) => {
                    info!(
                        provider_event_id = %event.id,
                        event_type = %event.event_type,
                        "Payment event stored without ledger effect"
                    );
                    IntakeRepository::mark_final(conn, event_id, IntakeStatus::Processed, None)?;
                    IntakeStatus::Processed
                }
                Err(reason) => {
                    warn!(
                        provider_event_id = %event.id,
                        %reason,
                        "Payment event dead-lettered"
                    );
                    IntakeRepository::mark_final(
                        conn,
                        event_id,
                        IntakeStatus::Failed,
                        Some(reason.as_str()),
                    )?;
                    IntakeStatus::Failed
                }
            };

            Ok(IngestOutcome::Accepted { event_id, status })
        })
    }

    /// Turns an effect into the entry to write, if any. Refund totals are
    /// reduced to their increase under a lock on the charge's key prefix.
    fn resolve(
        conn: &mut PgConnection,
        effect: LedgerEffect,
    ) -> Result<Option<NewLedgerEntry>, ApiError> {
        let (charge_id, mut entry) = match effect {
            LedgerEffect::Entry(entry) => return Ok(Some(entry)),
            LedgerEffect::RefundTotal { charge_id, entry } => (charge_id, entry),
        };

        let prefix = refund_key_prefix(&charge_id);
        LedgerRepository::lock_key_prefix(conn, &prefix)?;
        let recorded = LedgerRepository::sum_by_key_prefix(conn, &prefix)?;

        let increase = entry.amount - recorded;
        if increase <= 0 {
            info!(
                charge_id = %charge_id,
                refunded_total = entry.amount,
                recorded,
                "Refund total already on the ledger"
            );
            return Ok(None);
        }

        entry.amount = increase;
        Ok(Some(entry))
    }

    fn parse(body: &[u8]) -> Result<(Value, ProviderEvent), String> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|e| format!("Malformed JSON: {}", e))?;
        let event: ProviderEvent = serde_json::from_value(payload.clone())
            .map_err(|e| format!("Not a provider event: {}", e))?;

        if event.id.trim().is_empty() {
            return Err("Event id is empty".into());
        }

        Ok((payload, event))
    }

    /// Maps an event to the ledger entry it implies. `Err` is a deterministic
    /// business failure; the event is kept but marked failed.
    pub fn interpret(event: &ProviderEvent) -> Result<Option<LedgerEffect>, String> {
        match event.event_type.as_str() {
            EVENT_PAYMENT_INTENT_SUCCEEDED => {
                let intent: PaymentIntentObject = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| format!("Invalid payment intent: {}", e))?;

                if intent.amount_received < 0 {
                    return Err(format!("Negative amount_received {}", intent.amount_received));
                }

                let contest_id = metadata_uuid(&intent.metadata, "contest_id")?;
                let user_id = metadata_uuid(&intent.metadata, "user_id")?;

                Ok(Some(LedgerEffect::Entry(
                    NewLedgerEntry::of_type(
                        LedgerEntryType::EntryFee,
                        format!("stripe:payment_intent:{}:entry_fee", intent.id),
                        intent.amount_received,
                        intent.currency.to_lowercase(),
                    )
                    .for_contest(contest_id)
                    .for_user(user_id)
                    .with_metadata(json!({
                        "provider_event_id": event.id,
                        "payment_intent": intent.id,
                    })),
                )))
            }
            EVENT_CHARGE_REFUNDED => {
                let charge: ChargeObject = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| format!("Invalid charge: {}", e))?;

                if charge.amount_refunded < 0 {
                    return Err(format!("Negative amount_refunded {}", charge.amount_refunded));
                }

                let contest_id = metadata_uuid(&charge.metadata, "contest_id")?;
                let user_id = metadata_uuid(&charge.metadata, "user_id")?;

                if charge.amount_refunded == 0 {
                    return Ok(None);
                }

                let entry = NewLedgerEntry::of_type(
                    LedgerEntryType::EntryFeeRefund,
                    format!("{}{}", refund_key_prefix(&charge.id), charge.amount_refunded),
                    charge.amount_refunded,
                    charge.currency.to_lowercase(),
                )
                .for_contest(contest_id)
                .for_user(user_id)
                .with_metadata(json!({
                    "provider_event_id": event.id,
                    "charge": charge.id,
                    "payment_intent": charge.payment_intent,
                    "refunded_total": charge.amount_refunded,
                }));

                Ok(Some(LedgerEffect::RefundTotal {
                    charge_id: charge.id,
                    entry,
                }))
            }
            _ => Ok(None),
        }
    }
}

fn metadata_uuid(
    metadata: &std::collections::HashMap<String, String>,
    key: &str,
) -> Result<Uuid, String> {
    let raw = metadata
        .get(key)
        .ok_or_else(|| format!("Missing metadata.{}", key))?;
    Uuid::parse_str(raw).map_err(|_| format!("Invalid metadata.{}: {}", key, raw))
}
