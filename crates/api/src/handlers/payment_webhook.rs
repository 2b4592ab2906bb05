use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use http::{HeaderMap, StatusCode};
use purse_core::security::SIGNATURE_HEADER;
use purse_core::services::intake_service::{ApiError, AppState, IntakeService};
use purse_primitives::models::dtos::intake_dto::{IngestOutcome, WebhookAck};
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/webhooks/payments",
    tag = "Webhooks",
    summary = "Receive payment provider events",
    description = "Verifies the `Stripe-Signature` header over the raw body, stores the event once \
                   per provider event id and applies its ledger effect. Redelivered events are \
                   acknowledged without a second effect.",
    operation_id = "receivePaymentWebhook",
    request_body(content = String, description = "Raw JSON event body"),
    responses(
        (status = 200, description = "Event accepted or already seen", body = WebhookAck),
        (status = 400, description = "Signature or payload rejected; nothing stored", body = WebhookAck),
        (status = 503, description = "Storage unavailable; the provider should redeliver"),
    ),
    security(()),
)]
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = IntakeService::ingest(&state, &body, signature)?;
    let ack = WebhookAck::from(&outcome);

    match outcome {
        IngestOutcome::Accepted { event_id, status } => {
            info!(%event_id, %status, "Payment webhook accepted");
            Ok((StatusCode::OK, Json(ack)))
        }
        IngestOutcome::Duplicate { provider_event_id } => {
            info!(%provider_event_id, "Payment webhook duplicate");
            Ok((StatusCode::OK, Json(ack)))
        }
        IngestOutcome::Rejected { .. } => Ok((StatusCode::BAD_REQUEST, Json(ack))),
    }
}
