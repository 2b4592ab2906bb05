use chrono::{DateTime, Utc};
use diesel::{Queryable, Selectable};
use uuid::Uuid;

/// Connected account a winner is paid into. Rows are owned by onboarding.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::payout_destinations)]
pub struct PayoutDestination {
    pub user_id: Uuid,
    pub destination_account: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
