use diesel::prelude::*;
use purse_primitives::error::ApiError;
use purse_primitives::schema::contest_instances;
use uuid::Uuid;

pub struct ContestRepository;

impl ContestRepository {
    pub fn status_of(conn: &mut PgConnection, contest_id: Uuid) -> Result<Option<String>, ApiError> {
        contest_instances::table
            .find(contest_id)
            .select(contest_instances::status)
            .first::<String>(conn)
            .optional()
            .map_err(ApiError::from)
    }
}
