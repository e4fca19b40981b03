use std::io::{self, BufRead, Write};

use diesel::SqliteConnection;
use log::info;
use thiserror::Error;

use crate::cli::{Cli, Command, LoadArgs};
use crate::data::geonames::download_country_archive;
use crate::data::import::error::ImportError;
use crate::data::repo::import_states::recent_import_states;
use crate::db::{init_connection_pool, run_migrations, DbError};
use crate::distance::{distance_by_postal_code, find_within_radius};
use crate::fixtures::error::FixtureError;
use crate::fixtures::executor::{FixtureExecutor, OutputStyle};
use crate::fixtures::registry::FixtureRegistry;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Database: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("IO: {0}")]
    Io(#[from] io::Error),

    #[error("Aborted, nothing was loaded")]
    Aborted,

    #[error("Unknown postal code {0}")]
    UnknownPostalCode(String)
}

pub fn execute(cli: Cli) -> Result<(), CommandError> {
    if let Command::Fetch { country, output } = &cli.command {
        let path = download_country_archive(country, output)?;
        println!("{}", path.display());
        return Ok(());
    }

    let pool = init_connection_pool(&cli.database_url, cli.pool_size)?;
    let mut conn = pool.get().map_err(DbError::from)?;
    run_migrations(&mut conn)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Load(args) => {
            if !args.append && !args.no_interaction {
                let stdin = io::stdin();
                if !confirm_purge(&mut stdin.lock(), &mut out)? {
                    return Err(CommandError::Aborted);
                }
            }
            let total = load(&mut conn, &args, &mut out)?;
            info!("Loaded {} postal codes", total);
        },
        Command::Distance { from_country, from_postal_code, to_country, to_postal_code } => {
            distance(
                &mut conn,
                (from_country.as_str(), from_postal_code.as_str()),
                (to_country.as_str(), to_postal_code.as_str()),
                &mut out
            )?;
        },
        Command::Nearby { country, postal_code, radius } => {
            nearby(&mut conn, (country.as_str(), postal_code.as_str()), radius, &mut out)?;
        },
        Command::Status => status(&mut conn, &mut out)?,
        Command::Fetch { .. } => {},
    }
    Ok(())
}

pub fn confirm_purge(input: &mut dyn BufRead, out: &mut dyn Write) -> io::Result<bool> {
    write!(out, "Careful, database will be purged. Do you want to continue? (yes/no) [no]: ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Resolves the fixtures selected by `args` and loads them.
///
/// `--fixtures` paths are loaded with the legacy output; selecting by
/// `--group` switches to the grouped output. Groups are looked up among the
/// `--fixtures` paths when given, in the configuration file otherwise.
pub fn load(
    conn: &mut SqliteConnection,
    args: &LoadArgs,
    out: &mut dyn Write
) -> Result<usize, FixtureError> {
    let registry = if args.fixtures.is_empty() {
        FixtureRegistry::from_config_file(&args.config)?
    } else {
        let mut registry = FixtureRegistry::new();
        for path in &args.fixtures {
            registry.merge(FixtureRegistry::from_path(path)?)?;
        }
        registry
    };

    let (fixtures, style) = if args.group.is_empty() {
        (registry.fixtures(), OutputStyle::Legacy)
    } else {
        (registry.by_groups(&args.group)?, OutputStyle::Grouped)
    };

    FixtureExecutor::new(conn, out, style).execute(&fixtures, args.append)
}

pub fn distance(
    conn: &mut SqliteConnection,
    origin: (&str, &str),
    destination: (&str, &str),
    out: &mut dyn Write
) -> Result<(), CommandError> {
    match distance_by_postal_code(conn, origin, destination)? {
        Some(km) => {
            writeln!(out, "{:.2} km", km)?;
            Ok(())
        },
        None => Err(CommandError::UnknownPostalCode(format!(
            "{}-{} or {}-{}", origin.0, origin.1, destination.0, destination.1
        ))),
    }
}

pub fn nearby(
    conn: &mut SqliteConnection,
    origin: (&str, &str),
    radius_km: f64,
    out: &mut dyn Write
) -> Result<(), CommandError> {
    let postal_codes = find_within_radius(conn, origin, radius_km)?
        .ok_or_else(|| CommandError::UnknownPostalCode(format!("{}-{}", origin.0, origin.1)))?;

    for (postal_code, km) in postal_codes {
        writeln!(out, "{}\t{}\t{:.2}", postal_code.country, postal_code.postal_code, km)?;
    }
    Ok(())
}

pub fn status(conn: &mut SqliteConnection, out: &mut dyn Write) -> Result<(), CommandError> {
    for state in recent_import_states(conn)? {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            state.imported_at.format("%Y-%m-%d %H:%M:%S"),
            state.fixture,
            state.scope,
            state.record_count
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::commands::{confirm_purge, distance, nearby, status, CommandError};
    use crate::data::import::{import, Dataset};
    use crate::data::models::PostalCodeRecord;
    use crate::db::establish_test_connection;

    fn seed(conn: &mut diesel::SqliteConnection) {
        let dataset = Dataset::from_records(vec![
            PostalCodeRecord { country: "DE".into(), postal_code: "14473".into(), lat: 52.392759, lng: 13.065135 },
            PostalCodeRecord { country: "DE".into(), postal_code: "14469".into(), lat: 52.4235, lng: 13.0379 },
        ])
        .unwrap();
        import(conn, &dataset, &mut io::sink()).unwrap();
    }

    #[test]
    fn test_confirm_purge() {
        for (answer, expected) in &[("yes\n", true), ("Y\n", true), ("no\n", false), ("\n", false), ("", false)] {
            let mut out: Vec<u8> = Vec::new();
            let confirmed = confirm_purge(&mut answer.as_bytes(), &mut out).unwrap();
            assert_eq!(confirmed, *expected, "answer {:?}", answer);
            assert!(String::from_utf8(out).unwrap().starts_with("Careful, database will be purged."));
        }
    }

    #[test]
    fn test_distance_output() {
        let mut conn = establish_test_connection();
        seed(&mut conn);

        let mut out: Vec<u8> = Vec::new();
        distance(&mut conn, ("DE", "14473"), ("DE", "14473"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0.00 km\n");

        let unknown = distance(&mut conn, ("DE", "14473"), ("DE", "99999"), &mut io::sink());
        assert!(matches!(unknown, Err(CommandError::UnknownPostalCode(_))));
    }

    #[test]
    fn test_nearby_output() {
        let mut conn = establish_test_connection();
        seed(&mut conn);

        let mut out: Vec<u8> = Vec::new();
        nearby(&mut conn, ("DE", "14473"), 10.0, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        let lines = output.lines().collect::<Vec<&str>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "DE\t14473\t0.00");
        assert!(lines[1].starts_with("DE\t14469\t"));
    }

    #[test]
    fn test_status_output_is_empty_without_loads() {
        let mut conn = establish_test_connection();

        let mut out: Vec<u8> = Vec::new();
        status(&mut conn, &mut out).unwrap();

        assert!(out.is_empty());
    }
}
