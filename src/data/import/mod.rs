use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::io::Write;

use diesel::{Connection, SqliteConnection};
use log::{debug, info};
use serde::Deserialize;

use crate::data::import::error::ImportError;
use crate::data::models::{NewGeoPostalCode, PostalCodeRecord};
use crate::data::repo::postal_codes::{delete_all, delete_by_countries, insert_postal_codes};

pub mod error;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// The countries whose stored postal codes an import replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    countries: Vec<String>
}

impl Scope {
    pub fn new<I, S>(countries: I) -> Result<Self, ImportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut countries = countries
            .into_iter()
            .map(|c| normalize_country(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect::<Vec<String>>();
        countries.sort();
        countries.dedup();

        if countries.is_empty() {
            return Err(ImportError::EmptyScope);
        }
        Ok(Scope { countries })
    }

    pub fn country(code: &str) -> Result<Self, ImportError> {
        Scope::new(Some(code))
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn contains(&self, country: &str) -> bool {
        self.countries.iter().any(|c| c == country)
    }
}

fn normalize_country(country: &str) -> String {
    country.trim().to_ascii_uppercase()
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.countries.join(","))
    }
}

/// Records to import, all of them inside `scope`. Country codes are stored
/// trimmed and uppercased, the same way `Scope` holds them.
#[derive(Debug, Clone)]
pub struct Dataset {
    scope: Scope,
    records: Vec<PostalCodeRecord>
}

impl Dataset {
    pub fn new(scope: Scope, mut records: Vec<PostalCodeRecord>) -> Result<Self, ImportError> {
        for record in records.iter_mut() {
            record.country = normalize_country(&record.country);
        }
        if let Some(outsider) = records.iter().find(|r| !scope.contains(&r.country)) {
            return Err(ImportError::OutOfScope {
                country: outsider.country.clone(),
                postal_code: outsider.postal_code.clone()
            });
        }
        Ok(Dataset { scope, records })
    }

    /// Builds a dataset scoped to the countries its records belong to.
    pub fn from_records(records: Vec<PostalCodeRecord>) -> Result<Self, ImportError> {
        let scope = Scope::new(records.iter().map(|r| r.country.as_str()))?;
        Dataset::new(scope, records)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn records(&self) -> &[PostalCodeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Which stored postal codes are removed before inserting a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purge {
    /// Only the countries of the dataset's scope.
    #[default]
    Scope,
    /// Every stored postal code.
    All
}

#[derive(Debug, Clone)]
pub struct Importer {
    batch_size: usize,
    purge: Purge
}

impl Default for Importer {
    fn default() -> Self {
        Importer {
            batch_size: DEFAULT_BATCH_SIZE,
            purge: Purge::Scope
        }
    }
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_purge(mut self, purge: Purge) -> Self {
        self.purge = purge;
        self
    }

    /// Replaces the stored postal codes of the dataset's scope with the
    /// dataset's records and returns how many rows were inserted.
    ///
    /// A `.` is written to `out` after every full batch, followed by the
    /// inserted count on its own line (`" 177\n"`). Removal and insertion
    /// share one transaction.
    pub fn import(
        &self,
        conn: &mut SqliteConnection,
        dataset: &Dataset,
        out: &mut dyn Write
    ) -> Result<usize, ImportError> {
        info!("Importing {} postal codes for {}", dataset.len(), dataset.scope());

        let count = conn.transaction::<_, ImportError, _>(|conn| {
            let removed = match self.purge {
                Purge::Scope => delete_by_countries(conn, dataset.scope().countries())?,
                Purge::All => delete_all(conn)?,
            };
            info!("Removed {} stored postal codes", removed);

            // The same postal code can appear several times in a data file,
            // only its first occurrence is kept.
            let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(dataset.len());
            let mut batch = Vec::<NewGeoPostalCode>::with_capacity(self.batch_size);
            let mut count = 0;
            for record in dataset.records() {
                if !seen.insert((record.country.as_str(), record.postal_code.as_str())) {
                    debug!("Skipping duplicate postal code {}-{}", record.country, record.postal_code);
                    continue;
                }
                batch.push(NewGeoPostalCode::from(record));
                if batch.len() == self.batch_size {
                    count += process_batch(conn, &mut batch)?;
                    write!(out, ".")?;
                }
            }
            count += process_batch(conn, &mut batch)?;

            Ok(count)
        })?;

        writeln!(out, " {}", count)?;
        info!("Imported {} postal codes for {}", count, dataset.scope());

        Ok(count)
    }
}

fn process_batch(
    conn: &mut SqliteConnection,
    batch: &mut Vec<NewGeoPostalCode>
) -> Result<usize, ImportError> {
    let inserted = insert_postal_codes(conn, batch)?;
    batch.clear();

    Ok(inserted)
}

/// Imports `dataset` with the default batch size, replacing its scope.
pub fn import(
    conn: &mut SqliteConnection,
    dataset: &Dataset,
    out: &mut dyn Write
) -> Result<usize, ImportError> {
    Importer::default().import(conn, dataset, out)
}
