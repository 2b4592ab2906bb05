use diesel::PgConnection;
use purse_primitives::error::ApiError;
use uuid::Uuid;

use crate::repositories::contest_repository::ContestRepository;

/// Read-only view of the contest lifecycle.
pub trait ContestGate: Send + Sync {
    fn is_settlement_eligible(
        &self,
        conn: &mut PgConnection,
        contest_id: Uuid,
    ) -> Result<bool, ApiError>;
}

pub struct PgContestGate {
    eligible_statuses: Vec<String>,
}

impl PgContestGate {
    pub fn new(eligible_statuses: Vec<String>) -> Self {
        Self { eligible_statuses }
    }
}

impl ContestGate for PgContestGate {
    fn is_settlement_eligible(
        &self,
        conn: &mut PgConnection,
        contest_id: Uuid,
    ) -> Result<bool, ApiError> {
        let status = ContestRepository::status_of(conn, contest_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Contest {} not found", contest_id)))?;

        Ok(self.eligible_statuses.iter().any(|s| s == &status))
    }
}
