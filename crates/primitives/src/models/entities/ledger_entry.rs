use crate::models::entities::enum_types::{LedgerDirection, LedgerEntryType};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

pub const REFERENCE_INTAKE_EVENT: &str = "payment_intake_event";
pub const REFERENCE_PAYOUT_TRANSFER: &str = "payout_transfer";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::ledger_entries)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub idempotency_key: String,
    pub entry_type: LedgerEntryType,
    pub direction: LedgerDirection,
    pub amount: i64,
    pub currency: String,
    pub contest_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub reference_type: String,
    pub reference_id: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::ledger_entries)]
pub struct NewLedgerEntry {
    pub idempotency_key: String,
    pub entry_type: LedgerEntryType,
    pub direction: LedgerDirection,
    pub amount: i64,
    pub currency: String,
    pub contest_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub reference_type: String,
    pub reference_id: String,
    pub metadata: Value,
}

impl NewLedgerEntry {
    /// Builds an entry whose direction follows from its type.
    pub fn of_type(
        entry_type: LedgerEntryType,
        idempotency_key: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            entry_type,
            direction: entry_type.direction(),
            amount,
            currency: currency.into(),
            contest_id: None,
            user_id: None,
            reference_type: String::new(),
            reference_id: String::new(),
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn for_contest(mut self, contest_id: Uuid) -> Self {
        self.contest_id = Some(contest_id);
        self
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn referencing(mut self, reference_type: &str, reference_id: impl ToString) -> Self {
        self.reference_type = reference_type.to_string();
        self.reference_id = reference_id.to_string();
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Credits, debits and their difference for one owner, in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Balance {
    pub credits: i64,
    pub debits: i64,
    pub net: i64,
}

impl Balance {
    pub fn new(credits: i64, debits: i64) -> Self {
        Self {
            credits,
            debits,
            net: credits - debits,
        }
    }

    /// Folds entries into a balance, skipping audit-only entry types.
    pub fn fold<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let (credits, debits) = entries
            .into_iter()
            .filter(|e| e.entry_type.affects_balance())
            .fold((0i64, 0i64), |(c, d), e| match e.direction {
                LedgerDirection::Credit => (c + e.amount, d),
                LedgerDirection::Debit => (c, d + e.amount),
            });

        Self::new(credits, debits)
    }
}
