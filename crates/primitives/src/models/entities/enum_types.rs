use crate::error::ApiError;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

// The database spellings below are part of the durable contract. Renaming a
// variant's stored value requires a migration.

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::IntakeStatus"]
#[DbValueStyle = "snake_case"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntakeStatus {
    Received,
    Processed,
    Failed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::LedgerDirection"]
#[DbValueStyle = "snake_case"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LedgerDirection {
    Credit,
    Debit,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::LedgerEntryType"]
#[DbValueStyle = "SCREAMING_SNAKE_CASE"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    EntryFee,
    EntryFeeRefund,
    PayoutCompleted,
    PayoutAttemptFailed,
    PayoutFailedTerminal,
}

impl LedgerEntryType {
    /// Entry types that represent money actually moving. Attempt records are
    /// audit-only and never contribute to a balance.
    pub const BALANCE_AFFECTING: [LedgerEntryType; 3] = [
        LedgerEntryType::EntryFee,
        LedgerEntryType::EntryFeeRefund,
        LedgerEntryType::PayoutCompleted,
    ];

    pub fn affects_balance(self) -> bool {
        Self::BALANCE_AFFECTING.contains(&self)
    }

    pub fn direction(self) -> LedgerDirection {
        match self {
            LedgerEntryType::EntryFee => LedgerDirection::Credit,
            LedgerEntryType::EntryFeeRefund
            | LedgerEntryType::PayoutCompleted
            | LedgerEntryType::PayoutAttemptFailed
            | LedgerEntryType::PayoutFailedTerminal => LedgerDirection::Debit,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::SettlementStatus"]
#[DbValueStyle = "SCREAMING_SNAKE_CASE"]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Started,
    Complete,
    Failed,
}

impl SettlementStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SettlementStatus::Started)
    }

    /// The only legal moves are STARTED -> COMPLETE and STARTED -> FAILED.
    pub fn ensure_transition(self, to: SettlementStatus) -> Result<(), ApiError> {
        match (self, to) {
            (SettlementStatus::Started, SettlementStatus::Complete)
            | (SettlementStatus::Started, SettlementStatus::Failed) => Ok(()),
            (from, to) => Err(ApiError::illegal_transition("settlement", from, to)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::PayoutJobStatus"]
#[DbValueStyle = "snake_case"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayoutJobStatus {
    Pending,
    Processing,
    Complete,
}

impl PayoutJobStatus {
    pub fn ensure_transition(self, to: PayoutJobStatus) -> Result<(), ApiError> {
        match (self, to) {
            (PayoutJobStatus::Pending, PayoutJobStatus::Processing)
            | (PayoutJobStatus::Pending, PayoutJobStatus::Complete)
            | (PayoutJobStatus::Processing, PayoutJobStatus::Complete) => Ok(()),
            (from, to) => Err(ApiError::illegal_transition("payout job", from, to)),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    DbEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::PayoutTransferStatus"]
#[DbValueStyle = "snake_case"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayoutTransferStatus {
    Pending,
    Processing,
    Retryable,
    Completed,
    FailedTerminal,
}

impl PayoutTransferStatus {
    pub const TERMINAL: [PayoutTransferStatus; 2] = [
        PayoutTransferStatus::Completed,
        PayoutTransferStatus::FailedTerminal,
    ];

    pub const CLAIMABLE: [PayoutTransferStatus; 2] = [
        PayoutTransferStatus::Pending,
        PayoutTransferStatus::Retryable,
    ];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    pub fn ensure_transition(self, to: PayoutTransferStatus) -> Result<(), ApiError> {
        use PayoutTransferStatus::*;

        match (self, to) {
            (Pending, Processing)
            | (Retryable, Processing)
            // reclaim after an expired lease
            | (Processing, Processing)
            | (Processing, Retryable)
            | (Processing, Completed)
            | (Processing, FailedTerminal) => Ok(()),
            (from, to) => Err(ApiError::illegal_transition("payout transfer", from, to)),
        }
    }
}
