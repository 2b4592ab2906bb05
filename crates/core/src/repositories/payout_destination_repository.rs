use diesel::prelude::*;
use purse_primitives::error::ApiError;
use purse_primitives::schema::payout_destinations;
use uuid::Uuid;

pub struct PayoutDestinationRepository;

impl PayoutDestinationRepository {
    pub fn account_for(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<String>, ApiError> {
        payout_destinations::table
            .find(user_id)
            .select(payout_destinations::destination_account)
            .first::<String>(conn)
            .optional()
            .map_err(ApiError::from)
    }
}
