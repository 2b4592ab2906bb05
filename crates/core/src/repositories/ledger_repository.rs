use crate::repositories::aggregate::{coerce_i64, SumRow, TotalRow};
use diesel::prelude::*;
use diesel::sql_types::{Array, Text};
use purse_primitives::error::ApiError;
use purse_primitives::models::dtos::ledger_dto::RecordOutcome;
use purse_primitives::models::entities::enum_types::LedgerEntryType;
use purse_primitives::models::entities::ledger_entry::{Balance, LedgerEntry, NewLedgerEntry};
use purse_primitives::schema::ledger_entries;
use uuid::Uuid;

/// Append-only access to `ledger_entries`.
pub struct LedgerRepository;

enum BalanceOwner {
    Contest(Uuid),
    User(Uuid),
}

impl LedgerRepository {
    pub fn record(conn: &mut PgConnection, entry: &NewLedgerEntry) -> Result<RecordOutcome, ApiError> {
        // savepoint so a racing insert cannot poison the caller's transaction
        let inserted = conn.transaction::<_, ApiError, _>(|conn| {
            diesel::insert_into(ledger_entries::table)
                .values(entry)
                .on_conflict(ledger_entries::idempotency_key)
                .do_nothing()
                .returning(LedgerEntry::as_returning())
                .get_result(conn)
                .optional()
                .map_err(ApiError::from)
        });

        let inserted = match inserted {
            Ok(row) => row,
            Err(e) if e.is_unique_violation() => None,
            Err(e) => return Err(e),
        };

        match inserted {
            Some(row) => Ok(RecordOutcome::Created(row)),
            None => {
                let existing = Self::find_by_key(conn, &entry.idempotency_key)?.ok_or_else(|| {
                    ApiError::Internal(format!(
                        "Ledger key {} conflicted but no entry was found",
                        entry.idempotency_key
                    ))
                })?;
                Ok(RecordOutcome::AlreadyExists(existing))
            }
        }
    }

    pub fn find_by_key(conn: &mut PgConnection, key: &str) -> Result<Option<LedgerEntry>, ApiError> {
        ledger_entries::table
            .filter(ledger_entries::idempotency_key.eq(key))
            .select(LedgerEntry::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::from)
    }

    /// Serializes writers sharing a key prefix until the transaction ends.
    pub fn lock_key_prefix(conn: &mut PgConnection, prefix: &str) -> Result<(), ApiError> {
        diesel::sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind::<Text, _>(prefix)
            .execute(conn)?;
        Ok(())
    }

    pub fn sum_by_key_prefix(conn: &mut PgConnection, prefix: &str) -> Result<i64, ApiError> {
        let row = diesel::sql_query(
            "SELECT SUM(amount)::TEXT AS total \
             FROM ledger_entries \
             WHERE left(idempotency_key, length($1)) = $1",
        )
        .bind::<Text, _>(prefix)
        .get_result::<TotalRow>(conn)?;

        coerce_i64("total", row.total.as_deref())
    }

    pub fn entries_for_reference(
        conn: &mut PgConnection,
        reference_type: &str,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, ApiError> {
        ledger_entries::table
            .filter(ledger_entries::reference_type.eq(reference_type))
            .filter(ledger_entries::reference_id.eq(reference_id))
            .order((ledger_entries::created_at.asc(), ledger_entries::id.asc()))
            .select(LedgerEntry::as_select())
            .load(conn)
            .map_err(ApiError::from)
    }

    pub fn entries_for_contest(
        conn: &mut PgConnection,
        contest_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, ApiError> {
        ledger_entries::table
            .filter(ledger_entries::contest_id.eq(contest_id))
            .order((ledger_entries::created_at.asc(), ledger_entries::id.asc()))
            .select(LedgerEntry::as_select())
            .load(conn)
            .map_err(ApiError::from)
    }

    pub fn contest_balance(conn: &mut PgConnection, contest_id: Uuid) -> Result<Balance, ApiError> {
        Self::balance(conn, BalanceOwner::Contest(contest_id))
    }

    pub fn user_balance(conn: &mut PgConnection, user_id: Uuid) -> Result<Balance, ApiError> {
        Self::balance(conn, BalanceOwner::User(user_id))
    }

    fn balance(conn: &mut PgConnection, owner: BalanceOwner) -> Result<Balance, ApiError> {
        let (column, id) = match owner {
            BalanceOwner::Contest(id) => ("contest_id", id),
            BalanceOwner::User(id) => ("user_id", id),
        };

        let types: Vec<String> = LedgerEntryType::BALANCE_AFFECTING
            .iter()
            .map(|t| t.to_string())
            .collect();

        let query = format!(
            "SELECT \
                SUM(amount) FILTER (WHERE direction = 'credit')::TEXT AS credits, \
                SUM(amount) FILTER (WHERE direction = 'debit')::TEXT AS debits \
             FROM ledger_entries \
             WHERE {} = $1 AND entry_type::TEXT = ANY($2)",
            column
        );

        let row = diesel::sql_query(query)
            .bind::<diesel::sql_types::Uuid, _>(id)
            .bind::<Array<Text>, _>(types)
            .get_result::<SumRow>(conn)?;

        Ok(Balance::new(
            coerce_i64("credits", row.credits.as_deref())?,
            coerce_i64("debits", row.debits.as_deref())?,
        ))
    }
}
