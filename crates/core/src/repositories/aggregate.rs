//! Single coercion point for values produced by SQL aggregates.
//!
//! Aggregates are selected as `TEXT` so the driver never guesses a numeric
//! width. Every sum or count is parsed here exactly once and anything that is
//! not a plain integer in range surfaces as [`ApiError::Aggregate`].

use diesel::sql_types::{Nullable, Text};
use diesel::QueryableByName;
use purse_primitives::error::ApiError;

#[derive(Debug, QueryableByName)]
pub struct SumRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub credits: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub debits: Option<String>,
}

#[derive(Debug, QueryableByName)]
pub struct TotalRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub total: Option<String>,
}

#[derive(Debug, QueryableByName)]
pub struct TerminalCountRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub completed: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub failed: Option<String>,
}

/// A SUM over minor units. An empty set sums to NULL, which reads as zero.
pub fn coerce_i64(label: &str, raw: Option<&str>) -> Result<i64, ApiError> {
    let Some(raw) = raw else {
        return Ok(0);
    };

    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::Aggregate(format!("{} is not an integer: {:?}", label, raw)))
}

/// A COUNT. Must be present, non-negative and fit an `i32` column.
pub fn coerce_count(label: &str, raw: Option<&str>) -> Result<i32, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::Aggregate(format!("{} count was NULL", label)))?;

    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ApiError::Aggregate(format!("{} count is not an integer: {:?}", label, raw)))?;

    if value < 0 {
        return Err(ApiError::Aggregate(format!(
            "{} count is negative: {}",
            label, value
        )));
    }

    i32::try_from(value)
        .map_err(|_| ApiError::Aggregate(format!("{} count out of range: {}", label, value)))
}
