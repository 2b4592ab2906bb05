use diesel::prelude::*;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

pub use crate::app_state::AppState;
use crate::repositories::settlement_repository::SettlementRepository;
pub use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::settlement_dto::StartSettlementRequest;
use purse_primitives::models::entities::enum_types::SettlementStatus;
use purse_primitives::models::entities::settlement_audit::{
    settlement_input_hash, NewSettlementAudit, SettlementAudit, SettlementOutput,
};

pub struct SettlementService;

impl SettlementService {
    /// Opens a settlement run, or returns the existing id when the same run is
    /// started again with the same identity.
    pub fn start_run(state: &AppState, req: &StartSettlementRequest) -> Result<Uuid, ApiError> {
        req.validate()?;

        let input_hash =
            settlement_input_hash(req.contest_id, &req.engine_version, &req.applied_input_ids)?;
        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            if let Some(existing) =
                SettlementRepository::find_by_contest_run(conn, req.contest_id, req.run_id)?
            {
                return Self::reuse_existing(existing, &req.engine_version, &input_hash);
            }

            if !state.gate.is_settlement_eligible(conn, req.contest_id)? {
                return Err(ApiError::Conflict(format!(
                    "Contest {} is not eligible for settlement",
                    req.contest_id
                )));
            }

            if let Some(done) = SettlementRepository::completed_for_contest(conn, req.contest_id)? {
                return Err(ApiError::Conflict(format!(
                    "Contest {} already settled by run {}",
                    req.contest_id, done.run_id
                )));
            }

            let inserted = SettlementRepository::insert_if_new(
                conn,
                NewSettlementAudit {
                    contest_id: req.contest_id,
                    run_id: req.run_id,
                    engine_version: &req.engine_version,
                    applied_input_ids: json!(req.applied_input_ids),
                    input_hash: &input_hash,
                    status: SettlementStatus::Started,
                },
            )?;

            match inserted {
                Some(audit) => {
                    info!(
                        audit_id = %audit.id,
                        contest_id = %audit.contest_id,
                        run_id = %audit.run_id,
                        input_hash = %audit.input_hash,
                        "Settlement run started"
                    );
                    Ok(audit.id)
                }
                // lost a race with a concurrent start of the same run
                None => {
                    let existing =
                        SettlementRepository::find_by_contest_run(conn, req.contest_id, req.run_id)?
                            .ok_or_else(|| {
                                ApiError::Internal("Settlement run vanished after conflict".into())
                            })?;
                    Self::reuse_existing(existing, &req.engine_version, &input_hash)
                }
            }
        })
    }

    fn reuse_existing(
        existing: SettlementAudit,
        engine_version: &str,
        input_hash: &str,
    ) -> Result<Uuid, ApiError> {
        if existing.same_identity(engine_version, input_hash) {
            info!(audit_id = %existing.id, "Settlement run already started");
            Ok(existing.id)
        } else {
            warn!(
                audit_id = %existing.id,
                "Settlement run restarted with different inputs"
            );
            Err(ApiError::Conflict(format!(
                "Run {} for contest {} already exists with different inputs",
                existing.run_id, existing.contest_id
            )))
        }
    }

    pub fn complete_run(
        state: &AppState,
        audit_id: Uuid,
        output: &SettlementOutput,
    ) -> Result<SettlementAudit, ApiError> {
        output.validate()?;

        let output_json = serde_json::to_value(output)?;
        let output_hash = output.hash()?;
        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let audit = Self::locked(conn, audit_id)?;
            audit.status.ensure_transition(SettlementStatus::Complete)?;

            if let Some(done) = SettlementRepository::completed_for_contest(conn, audit.contest_id)? {
                return Err(ApiError::Conflict(format!(
                    "Contest {} already settled by run {}",
                    audit.contest_id, done.run_id
                )));
            }

            let moved = SettlementRepository::mark_complete(conn, audit_id, &output_json, &output_hash)
                .map_err(|e| {
                    if e.is_unique_violation() {
                        ApiError::Conflict(format!(
                            "Contest {} already has a complete settlement",
                            audit.contest_id
                        ))
                    } else {
                        e
                    }
                })?;

            if moved == 0 {
                error!(%audit_id, "Settlement completion lost its STARTED guard");
                return Err(ApiError::illegal_transition(
                    "settlement",
                    audit.status,
                    SettlementStatus::Complete,
                ));
            }

            info!(
                %audit_id,
                contest_id = %audit.contest_id,
                winners = output.winners.len(),
                total_cents = output.total_cents,
                %output_hash,
                "Settlement run complete"
            );

            Self::require(conn, audit_id)
        })
    }

    pub fn fail_run(state: &AppState, audit_id: Uuid, reason: &str) -> Result<SettlementAudit, ApiError> {
        if reason.trim().is_empty() {
            return Err(ApiError::BadRequest("Failure reason is required".into()));
        }

        let mut conn = state.conn()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            let audit = Self::locked(conn, audit_id)?;
            audit.status.ensure_transition(SettlementStatus::Failed)?;

            if SettlementRepository::mark_failed(conn, audit_id, reason)? == 0 {
                return Err(ApiError::illegal_transition(
                    "settlement",
                    audit.status,
                    SettlementStatus::Failed,
                ));
            }

            warn!(%audit_id, contest_id = %audit.contest_id, %reason, "Settlement run failed");

            Self::require(conn, audit_id)
        })
    }

    pub fn get(state: &AppState, audit_id: Uuid) -> Result<SettlementAudit, ApiError> {
        let mut conn = state.conn()?;
        Self::require(&mut conn, audit_id)
    }

    pub fn completed_for_contest(
        state: &AppState,
        contest_id: Uuid,
    ) -> Result<Option<SettlementAudit>, ApiError> {
        let mut conn = state.conn()?;
        SettlementRepository::completed_for_contest(&mut conn, contest_id)
    }

    fn locked(conn: &mut PgConnection, audit_id: Uuid) -> Result<SettlementAudit, ApiError> {
        SettlementRepository::find_for_update(conn, audit_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Settlement {} not found", audit_id)))
    }

    fn require(conn: &mut PgConnection, audit_id: Uuid) -> Result<SettlementAudit, ApiError> {
        SettlementRepository::find(conn, audit_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Settlement {} not found", audit_id)))
    }
}
