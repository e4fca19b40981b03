use std::io::{self, Write};

use diesel::{Connection, SqliteConnection};
use log::info;

use crate::data::repo::{import_states, postal_codes};
use crate::fixtures::error::FixtureError;
use crate::fixtures::Fixture;

/// How progress lines are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    /// `  > loading NAME`, used when fixtures are selected by path.
    Legacy,
    /// `   > loading NAME` after a leading blank line, used when fixtures
    /// are selected by group.
    Grouped
}

pub struct FixtureExecutor<'a> {
    conn: &'a mut SqliteConnection,
    printer: Printer<'a>
}

struct Printer<'a> {
    out: &'a mut dyn Write,
    style: OutputStyle,
    printed: bool
}

impl<'a> FixtureExecutor<'a> {
    pub fn new(conn: &'a mut SqliteConnection, out: &'a mut dyn Write, style: OutputStyle) -> Self {
        FixtureExecutor {
            conn,
            printer: Printer { out, style, printed: false }
        }
    }

    /// Loads `fixtures` in order and returns the total number of stored
    /// records. Unless `append` is set the store is emptied first.
    ///
    /// The purge and every load share one transaction: if any fixture
    /// fails, the store is left as it was.
    pub fn execute(&mut self, fixtures: &[&dyn Fixture], append: bool) -> Result<usize, FixtureError> {
        let printer = &mut self.printer;

        self.conn.transaction::<_, FixtureError, _>(|conn| {
            if !append {
                printer.line("purging database")?;
                purge(conn)?;
            }

            let mut total = 0;
            for fixture in fixtures {
                printer.line(&format!("loading {}", fixture.name()))?;
                info!("Loading fixture {}", fixture.name());
                total += fixture.load(conn, printer.out)?;
            }
            Ok(total)
        })
    }
}

impl<'a> Printer<'a> {
    fn line(&mut self, message: &str) -> io::Result<()> {
        match self.style {
            OutputStyle::Legacy => writeln!(self.out, "  > {}", message),
            OutputStyle::Grouped => {
                if !self.printed {
                    writeln!(self.out)?;
                    self.printed = true;
                }
                writeln!(self.out, "   > {}", message)
            },
        }
    }
}

/// Removes every stored postal code and the import history.
pub fn purge(conn: &mut SqliteConnection) -> Result<(), FixtureError> {
    conn.transaction::<_, FixtureError, _>(|conn| {
        let removed = postal_codes::delete_all(conn)?;
        import_states::delete_all(conn)?;
        info!("Purged {} postal codes", removed);
        Ok(())
    })
}
