use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Invalid zip data file: {0}")]
    InvalidZip(#[from] zip::result::ZipError),

    #[error("Invalid postal code data: {0}")]
    InvalidData(String),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Could not find data file {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Could not find a postal code file in the archive")]
    NoDataFileInArchive,

    #[error("Scope must name at least one country")]
    EmptyScope,

    #[error("Postal code {country}-{postal_code} is outside of the import scope")]
    OutOfScope {
        country: String,
        postal_code: String
    }
}

impl From<csv::Error> for ImportError {
    fn from(error: csv::Error) -> Self {
        ImportError::InvalidData(error.to_string())
    }
}
