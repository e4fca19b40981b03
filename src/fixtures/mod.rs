//! Named, loadable postal code datasets.
//!
//! A [`Fixture`] knows how to replace its part of the store. Fixtures are
//! collected in a [`registry::FixtureRegistry`] (from a configuration file
//! or by scanning a directory) and run by an [`executor::FixtureExecutor`],
//! which prints the `> loading ...` progress lines.

use std::fmt::Debug;
use std::io::Write;

use diesel::SqliteConnection;

use crate::fixtures::error::FixtureError;

pub use crate::fixtures::geonames::GeonamesPostalCodeData;

pub mod error;
pub mod executor;
pub mod geonames;
pub mod registry;

pub trait Fixture: Debug {
    fn name(&self) -> &str;

    /// Groups this fixture can be selected by, besides its own name.
    fn groups(&self) -> &[String] {
        &[]
    }

    /// Loads the fixture, writing its progress to `out`, and returns the
    /// number of stored records.
    fn load(&self, conn: &mut SqliteConnection, out: &mut dyn Write) -> Result<usize, FixtureError>;

    fn in_group(&self, group: &str) -> bool {
        self.name() == group || self.groups().iter().any(|g| g == group)
    }
}
