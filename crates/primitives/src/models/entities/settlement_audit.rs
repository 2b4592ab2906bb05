use crate::canonical::canonical_hash_of;
use crate::error::ApiError;
use crate::models::entities::enum_types::SettlementStatus;
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::settlement_audits)]
pub struct SettlementAudit {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub run_id: Uuid,
    pub engine_version: String,
    pub applied_input_ids: Value,
    pub input_hash: String,
    pub status: SettlementStatus,
    pub output: Option<Value>,
    pub output_hash: Option<String>,
    pub error_detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SettlementAudit {
    /// Whether a restart of this run carries the same identity.
    pub fn same_identity(&self, engine_version: &str, input_hash: &str) -> bool {
        self.engine_version == engine_version && self.input_hash == input_hash
    }

    pub fn parsed_output(&self) -> Result<Option<SettlementOutput>, ApiError> {
        self.output
            .clone()
            .map(serde_json::from_value::<SettlementOutput>)
            .transpose()
            .map_err(|e| {
                ApiError::Internal(format!("Stored settlement output for {} is invalid: {}", self.id, e))
            })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::settlement_audits)]
pub struct NewSettlementAudit<'a> {
    pub contest_id: Uuid,
    pub run_id: Uuid,
    pub engine_version: &'a str,
    pub applied_input_ids: Value,
    pub input_hash: &'a str,
    pub status: SettlementStatus,
}

/// What the scoring engine hands over: who won and how much each is owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutput {
    pub winners: Vec<Winner>,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub user_id: Uuid,
    pub rank: i32,
    pub amount_cents: i64,
}

impl SettlementOutput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.total_cents < 0 {
            return Err(ApiError::BadRequest("totalCents must be non-negative".into()));
        }

        let mut seen = HashSet::with_capacity(self.winners.len());
        let mut sum: i64 = 0;
        for w in &self.winners {
            if w.amount_cents < 0 {
                return Err(ApiError::BadRequest(format!(
                    "Winner {} has a negative amount",
                    w.user_id
                )));
            }
            if !seen.insert(w.user_id) {
                return Err(ApiError::BadRequest(format!(
                    "Winner {} appears more than once",
                    w.user_id
                )));
            }
            sum = sum
                .checked_add(w.amount_cents)
                .ok_or_else(|| ApiError::BadRequest("Winner amounts overflow".into()))?;
        }

        if sum != self.total_cents {
            return Err(ApiError::BadRequest(format!(
                "Winner amounts sum to {} but totalCents is {}",
                sum, self.total_cents
            )));
        }

        Ok(())
    }

    pub fn payable_winners(&self) -> Vec<Winner> {
        self.winners
            .iter()
            .filter(|w| w.amount_cents > 0)
            .cloned()
            .collect()
    }

    pub fn hash(&self) -> Result<String, ApiError> {
        Ok(canonical_hash_of(self)?)
    }
}

#[derive(Serialize)]
struct InputIdentity<'a> {
    contest_id: Uuid,
    engine_version: &'a str,
    applied_input_ids: &'a [String],
}

/// Replay fingerprint of everything a settlement run consumed.
pub fn settlement_input_hash(
    contest_id: Uuid,
    engine_version: &str,
    applied_input_ids: &[String],
) -> Result<String, ApiError> {
    Ok(canonical_hash_of(&InputIdentity {
        contest_id,
        engine_version,
        applied_input_ids,
    })?)
}
