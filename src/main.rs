use clap::Parser;
use dotenv::dotenv;
use env_logger::Env;
use log::error;

use geo_postcode_fixtures::cli::Cli;
use geo_postcode_fixtures::commands;

fn main() {
    dotenv().ok();
    // Logs go to stderr, stdout only carries command output
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(err) = commands::execute(cli) {
        error!("{}", err);
        std::process::exit(1);
    }
}
