use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::db::{DEFAULT_DATABASE_URL, DEFAULT_DB_POOL_SIZE};

#[derive(Parser, Debug)]
#[command(name = "geo-fixtures", version, about = "Imports geonames postal codes into a database")]
pub struct Cli {
    /// Database to work on
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    pub database_url: String,

    /// Maximum number of database connections
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = DEFAULT_DB_POOL_SIZE, global = true)]
    pub pool_size: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load postal code fixtures
    Load(LoadArgs),

    /// Download the geonames archive of a country
    Fetch {
        /// ISO country code, or allCountries
        country: String,

        /// Directory the archive is written to
        #[arg(long, default_value = "data")]
        output: PathBuf,
    },

    /// Distance in kilometers between two postal codes
    Distance {
        from_country: String,
        from_postal_code: String,
        to_country: String,
        to_postal_code: String,
    },

    /// Postal codes around a postal code
    Nearby {
        country: String,
        postal_code: String,

        /// Search radius in kilometers
        #[arg(long)]
        radius: f64,
    },

    /// Show the most recent fixture loads
    Status,
}

#[derive(Args, Debug, Clone, Default)]
#[command(group(ArgGroup::new("selection").required(true).multiple(true).args(["fixtures", "group"])))]
pub struct LoadArgs {
    /// Append the fixtures instead of deleting all postal codes first
    #[arg(long)]
    pub append: bool,

    /// Do not ask for confirmation before deleting all postal codes
    #[arg(long, short = 'n')]
    pub no_interaction: bool,

    /// Directory, geonames file or configuration file to load fixtures from
    #[arg(long, num_args = 1..)]
    pub fixtures: Vec<PathBuf>,

    /// Only load fixtures that belong to this group
    #[arg(long, num_args = 1..)]
    pub group: Vec<String>,

    /// Fixture configuration used when no --fixtures path is given
    #[arg(long, env = "FIXTURES_CONFIG", default_value = "fixtures.toml")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::cli::{Cli, Command};

    #[test]
    fn test_parse_load_by_path() {
        let cli = Cli::try_parse_from([
            "geo-fixtures", "--database-url", "test.sqlite",
            "load", "--append", "--fixtures", "fixtures/geonames",
        ])
        .unwrap();

        assert_eq!(cli.database_url, "test.sqlite");
        match cli.command {
            Command::Load(args) => {
                assert!(args.append);
                assert!(!args.no_interaction);
                assert_eq!(args.fixtures, vec![PathBuf::from("fixtures/geonames")]);
                assert!(args.group.is_empty());
            },
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_load_by_groups() {
        let cli = Cli::try_parse_from([
            "geo-fixtures", "load", "-n", "--group", "geo_test", "--group", "caribbean",
        ])
        .unwrap();

        match cli.command {
            Command::Load(args) => {
                assert!(!args.append);
                assert!(args.no_interaction);
                assert_eq!(args.group, vec!["geo_test".to_string(), "caribbean".to_string()]);
            },
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_load_requires_a_selection() {
        assert!(Cli::try_parse_from(["geo-fixtures", "load", "--append"]).is_err());
    }

    #[test]
    fn test_parse_nearby() {
        let cli = Cli::try_parse_from([
            "geo-fixtures", "nearby", "DE", "14473", "--radius", "12.5",
        ])
        .unwrap();

        match cli.command {
            Command::Nearby { country, postal_code, radius } => {
                assert_eq!(country, "DE");
                assert_eq!(postal_code, "14473");
                assert_eq!(radius, 12.5);
            },
            other => panic!("Unexpected command: {:?}", other),
        }
    }
}
