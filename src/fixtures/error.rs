use std::path::PathBuf;

use thiserror::Error;

use crate::data::import::error::ImportError;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Database: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error
    },

    #[error("Fixture \"{0}\" is already registered")]
    DuplicateFixture(String),

    #[error("Could not find any fixtures to load in the group \"{0}\"")]
    UnknownGroup(String),

    #[error("Could not find any fixtures to load in {}", .0.display())]
    NoFixtures(PathBuf)
}
