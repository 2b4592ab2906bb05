use async_trait::async_trait;
use purse_primitives::models::dtos::rail_dto::{RailOutcome, TransferInstruction};
use std::time::Duration;

/// The external money-movement call. Implementations never return errors:
/// every failure is classified into the outcome.
#[async_trait]
pub trait TransferRail: Send + Sync {
    async fn create_transfer(
        &self,
        instruction: &TransferInstruction,
        timeout: Duration,
    ) -> RailOutcome;
}
