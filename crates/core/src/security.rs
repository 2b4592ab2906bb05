use hmac::{Hmac, Mac};
use purse_primitives::error::ApiError;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Parsed `t=<unix>,v1=<hex>[,v1=<hex>...]` header.
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, ApiError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        ApiError::Signature("Malformed signature timestamp".into())
                    })?)
                }
                "v1" => signatures.push(value.to_string()),
                // other schemes are ignored
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| ApiError::Signature("Missing signature timestamp".into()))?;
        if signatures.is_empty() {
            return Err(ApiError::Signature("No v1 signature present".into()));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Internal("Invalid webhook secret".into()))?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a signed webhook body against the shared secret. `now` is unix
/// seconds; timestamps further than `tolerance_secs` from it are rejected.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), ApiError> {
    let parsed = SignatureHeader::parse(header)?;

    let tolerance = u64::try_from(tolerance_secs).unwrap_or(0);
    if now.abs_diff(parsed.timestamp) > tolerance {
        return Err(ApiError::Signature(
            "Signature timestamp outside tolerance".into(),
        ));
    }

    let expected = compute_signature(secret, parsed.timestamp, payload)?;

    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));

    if !matched {
        return Err(ApiError::Signature("No matching signature".into()));
    }

    Ok(())
}
