use std::io::Write;
use std::path::{Path, PathBuf};

use diesel::{Connection, SqliteConnection};
use log::info;

use crate::data::geonames::read_postal_codes_from_path;
use crate::data::import::error::ImportError;
use crate::data::import::{Dataset, Importer, Purge, Scope, DEFAULT_BATCH_SIZE};
use crate::data::repo::import_states::{create_import_state, latest_import_state};
use crate::fixtures::error::FixtureError;
use crate::fixtures::Fixture;

/// Postal codes of one geonames file (plain or zipped).
///
/// Without a declared country the scope is made of the countries found in
/// the file.
#[derive(Debug, Clone)]
pub struct GeonamesPostalCodeData {
    name: String,
    source: PathBuf,
    country: Option<String>,
    groups: Vec<String>,
    batch_size: usize,
    purge: Purge
}

impl GeonamesPostalCodeData {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        GeonamesPostalCodeData {
            name: name.into(),
            source: source.into(),
            country: None,
            groups: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            purge: Purge::Scope
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_purge(mut self, purge: Purge) -> Self {
        self.purge = purge;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    fn dataset(&self) -> Result<Dataset, ImportError> {
        let records = read_postal_codes_from_path(&self.source)?;
        match &self.country {
            Some(country) => Dataset::new(Scope::country(country)?, records),
            None => Dataset::from_records(records),
        }
    }
}

impl Fixture for GeonamesPostalCodeData {
    fn name(&self) -> &str {
        &self.name
    }

    fn groups(&self) -> &[String] {
        &self.groups
    }

    fn load(&self, conn: &mut SqliteConnection, out: &mut dyn Write) -> Result<usize, FixtureError> {
        let dataset = self.dataset()?;
        if let Some(previous) = latest_import_state(conn, &self.name)? {
            info!(
                "Replacing {} postal codes of {} loaded at {}",
                previous.record_count, self.name, previous.imported_at
            );
        }

        // Postal codes and their import state are committed together
        conn.transaction::<_, FixtureError, _>(|conn| {
            let count = Importer::new()
                .with_batch_size(self.batch_size)
                .with_purge(self.purge)
                .import(conn, &dataset, out)?;

            create_import_state(conn, &self.name, dataset.scope().countries(), count)?;

            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use diesel::{RunQueryDsl, SqliteConnection};

    use crate::data::import::error::ImportError;
    use crate::data::import::{import, Dataset};
    use crate::data::models::PostalCodeRecord;
    use crate::data::repo::import_states::latest_import_state;
    use crate::data::repo::postal_codes::{count_all, count_by_country};
    use crate::db::establish_test_connection;
    use crate::fixtures::error::FixtureError;
    use crate::fixtures::{Fixture, GeonamesPostalCodeData};

    fn puerto_rico() -> GeonamesPostalCodeData {
        GeonamesPostalCodeData::new(
            "PuertoRico",
            Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/geonames/PR.txt")
        )
        .with_country("PR")
    }

    fn seed(conn: &mut SqliteConnection) {
        let dataset = Dataset::from_records(vec![
            PostalCodeRecord { country: "PR".into(), postal_code: "00999".into(), lat: 18.0, lng: -66.0 },
        ])
        .unwrap();
        import(conn, &dataset, &mut io::sink()).unwrap();
    }

    #[test]
    fn test_load_records_import_state() {
        let mut conn = establish_test_connection();

        let count = puerto_rico().load(&mut conn, &mut io::sink()).unwrap();

        assert_eq!(count, 177);
        let state = latest_import_state(&mut conn, "PuertoRico").unwrap().unwrap();
        assert_eq!(state.scope, "PR");
        assert_eq!(state.record_count, 177);
    }

    #[test]
    fn test_load_keeps_previous_data_when_state_cannot_be_stored() {
        let mut conn = establish_test_connection();
        seed(&mut conn);
        diesel::sql_query(
            "CREATE TRIGGER reject_import_state BEFORE INSERT ON import_states \
             BEGIN SELECT RAISE(ABORT, 'import states are read only'); END"
        )
        .execute(&mut conn)
        .unwrap();

        let result = puerto_rico().load(&mut conn, &mut io::sink());

        assert!(matches!(result, Err(FixtureError::Import(ImportError::Database(_)))));
        assert_eq!(count_by_country(&mut conn, "PR").unwrap(), 1);
        assert_eq!(count_all(&mut conn).unwrap(), 1);
        assert!(latest_import_state(&mut conn, "PuertoRico").unwrap().is_none());
    }
}
