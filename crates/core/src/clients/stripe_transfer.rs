use crate::clients::transfer_rail::TransferRail;
use async_trait::async_trait;
use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::rail_dto::{RailOutcome, TransferInstruction};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct TransferCreated {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: Option<StripeErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

/// Stripe Connect transfers over plain HTTP.
#[derive(Clone)]
pub struct StripeTransferRail {
    http: Client,
    base_url: Url,
    secret_key: SecretString,
}

impl StripeTransferRail {
    pub fn new(http: Client, base_url: &str, secret_key: SecretString) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| ApiError::Internal("Invalid Stripe base URL".into()))?;

        Ok(Self {
            http,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self) -> Result<Url, String> {
        self.base_url
            .join("v1/transfers")
            .map_err(|e| format!("invalid transfer endpoint: {}", e))
    }
}

/// Whether an HTTP failure status is worth retrying with the same key.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS
        )
}

#[async_trait]
impl TransferRail for StripeTransferRail {
    async fn create_transfer(
        &self,
        instruction: &TransferInstruction,
        timeout: Duration,
    ) -> RailOutcome {
        let url = match self.endpoint() {
            Ok(url) => url,
            Err(e) => return RailOutcome::permanent(e),
        };

        let amount = instruction.amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", instruction.currency.as_str()),
            ("destination", instruction.destination.as_str()),
            ("transfer_group", instruction.transfer_group.as_str()),
        ];

        let resp = match self
            .http
            .post(url)
            .bearer_auth(self.secret_key.expose_secret())
            .header("Idempotency-Key", &instruction.idempotency_key)
            .form(&form)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                // nothing reached a definitive answer; the key makes a retry safe
                warn!(
                    idempotency_key = %instruction.idempotency_key,
                    error = %e,
                    "Stripe transfer request did not complete"
                );
                return RailOutcome::transient(format!("request failed: {}", e));
            }
        };

        let status = resp.status();

        if status.is_success() {
            return match resp.json::<TransferCreated>().await {
                Ok(TransferCreated { id: Some(id) }) if !id.is_empty() => {
                    RailOutcome::Success { transfer_id: id }
                }
                Ok(_) => RailOutcome::transient("transfer response missing id"),
                Err(e) => RailOutcome::transient(format!("unreadable transfer response: {}", e)),
            };
        }

        let detail = resp
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .map(|e| match (e.code, e.message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (None, Some(message)) => message,
                (Some(code), None) => code,
                (None, None) => "no detail".into(),
            })
            .unwrap_or_else(|| "no detail".into());

        let reason = format!("HTTP {}: {}", status.as_u16(), detail);

        warn!(
            idempotency_key = %instruction.idempotency_key,
            status = status.as_u16(),
            reason = %reason,
            "Stripe transfer rejected"
        );

        if is_transient_status(status) {
            RailOutcome::transient(reason)
        } else {
            RailOutcome::permanent(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use purse_primitives::models::dtos::rail_dto::FailureClass;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn instruction() -> TransferInstruction {
        TransferInstruction {
            amount: 1_000,
            currency: "usd".into(),
            destination: "acct_123".into(),
            idempotency_key: "payout_abc".into(),
            transfer_group: "contest_1".into(),
        }
    }

    fn rail(server: &MockServer) -> StripeTransferRail {
        StripeTransferRail::new(
            Client::new(),
            &server.uri(),
            SecretString::new("sk_test".into()),
        )
        .unwrap()
    }

    fn class_of(outcome: &RailOutcome) -> Option<FailureClass> {
        match outcome {
            RailOutcome::Failure { class, .. } => Some(*class),
            RailOutcome::Success { .. } => None,
        }
    }

    #[tokio::test]
    async fn success_returns_transfer_id_and_sends_idempotency_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/transfers"))
            .and(header("Idempotency-Key", "payout_abc"))
            .and(header("Authorization", "Bearer sk_test"))
            .and(body_string_contains("destination=acct_123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "tr_1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = rail(&server)
            .create_transfer(&instruction(), Duration::from_secs(5))
            .await;

        assert_eq!(
            outcome,
            RailOutcome::Success {
                transfer_id: "tr_1".into()
            }
        );
    }

    #[tokio::test]
    async fn server_errors_and_throttling_are_transient() {
        for code in [500u16, 503, 429, 409, 408] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(code))
                .mount(&server)
                .await;

            let outcome = rail(&server)
                .create_transfer(&instruction(), Duration::from_secs(5))
                .await;
            assert_eq!(class_of(&outcome), Some(FailureClass::Transient), "status {}", code);
        }
    }

    #[tokio::test]
    async fn client_errors_are_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": "account_invalid", "message": "No such destination"}
            })))
            .mount(&server)
            .await;

        let outcome = rail(&server)
            .create_transfer(&instruction(), Duration::from_secs(5))
            .await;

        match outcome {
            RailOutcome::Failure { class, reason } => {
                assert_eq!(class, FailureClass::Permanent);
                assert!(reason.contains("account_invalid"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "tr_late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let outcome = rail(&server)
            .create_transfer(&instruction(), Duration::from_millis(50))
            .await;
        assert_eq!(class_of(&outcome), Some(FailureClass::Transient));
    }

    #[tokio::test]
    async fn success_without_id_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let outcome = rail(&server)
            .create_transfer(&instruction(), Duration::from_secs(5))
            .await;
        assert_eq!(class_of(&outcome), Some(FailureClass::Transient));
    }
}
