use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::data::import::error::ImportError;
use crate::data::models::{ImportState, NewImportState};

const IMPORT_STATES_LIMIT: i64 = 50;

pub fn latest_import_state(
    conn: &mut SqliteConnection,
    fixture_name: &str
) -> QueryResult<Option<ImportState>> {
    use crate::data::schema::import_states::dsl::*;

    import_states
        .filter(fixture.eq(fixture_name))
        .order((imported_at.desc(), id.desc()))
        .first(conn)
        .optional()
}

pub fn recent_import_states(conn: &mut SqliteConnection) -> QueryResult<Vec<ImportState>> {
    use crate::data::schema::import_states::dsl::*;

    import_states
        .order((imported_at.desc(), id.desc()))
        .limit(IMPORT_STATES_LIMIT)
        .load(conn)
}

pub fn create_import_state(
    conn: &mut SqliteConnection,
    fixture_name: &str,
    countries: &[String],
    count: usize
) -> Result<usize, ImportError> {
    use crate::data::schema::import_states::dsl::*;

    let stored_count = i32::try_from(count).map_err(|_| ImportError::InvalidData(
        format!("{} postal codes of {} exceed the storable count", count, fixture_name)
    ))?;
    let joined_scope = countries.join(",");
    let new_state = NewImportState {
        fixture: fixture_name,
        scope: &joined_scope,
        record_count: stored_count,
        imported_at: Utc::now().naive_utc()
    };

    let inserted = diesel::insert_into(import_states)
        .values(&new_state)
        .execute(conn)?;
    Ok(inserted)
}

pub fn delete_all(conn: &mut SqliteConnection) -> QueryResult<usize> {
    use crate::data::schema::import_states::dsl::*;

    diesel::delete(import_states).execute(conn)
}
