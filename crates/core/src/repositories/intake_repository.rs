use chrono::Utc;
use diesel::prelude::*;
use purse_primitives::error::ApiError;
use purse_primitives::models::entities::enum_types::IntakeStatus;
use purse_primitives::models::entities::intake_event::{IntakeEvent, NewIntakeEvent};
use purse_primitives::schema::payment_intake_events;
use uuid::Uuid;

pub struct IntakeRepository;

impl IntakeRepository {
    /// Inserts the event unless its provider id was already seen. Returns the
    /// new row id, or `None` for a duplicate.
    pub fn insert_if_new(
        conn: &mut PgConnection,
        event: NewIntakeEvent,
    ) -> Result<Option<Uuid>, ApiError> {
        diesel::insert_into(payment_intake_events::table)
            .values(&event)
            .on_conflict(payment_intake_events::provider_event_id)
            .do_nothing()
            .returning(payment_intake_events::id)
            .get_result::<Uuid>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_provider_event_id(
        conn: &mut PgConnection,
        provider_event_id: &str,
    ) -> Result<Option<IntakeEvent>, ApiError> {
        payment_intake_events::table
            .filter(payment_intake_events::provider_event_id.eq(provider_event_id))
            .select(IntakeEvent::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    /// Moves a freshly received event to its final status. Only `received`
    /// rows are touched.
    pub fn mark_final(
        conn: &mut PgConnection,
        id: Uuid,
        status: IntakeStatus,
        error_detail: Option<&str>,
    ) -> Result<(), ApiError> {
        if status == IntakeStatus::Received {
            return Err(ApiError::illegal_transition(
                "intake event",
                IntakeStatus::Received,
                status,
            ));
        }

        let updated = diesel::update(payment_intake_events::table.find(id))
            .filter(payment_intake_events::processing_status.eq(IntakeStatus::Received))
            .set((
                payment_intake_events::processing_status.eq(status),
                payment_intake_events::error_detail.eq(error_detail),
                payment_intake_events::processed_at.eq(Some(Utc::now())),
            ))
            .execute(conn)?;

        if updated == 0 {
            return Err(ApiError::illegal_transition(
                "intake event",
                "final",
                status,
            ));
        }

        Ok(())
    }
}
