use std::{io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("invalid zip archive {origin}: {source}")]
    Archive {
        origin: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// Entry name is absolute or climbs out of the extraction directory.
    #[error("zip archive {origin} has an unsafe entry {entry:?}")]
    UnsafeEntry { origin: String, entry: String },

    #[error("schema mismatch in {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no data files found in {0}")]
    EmptyDirectory(PathBuf),

    #[error("{0} does not exist")]
    NotFound(PathBuf),

    #[error("{0} already exists")]
    OutputExists(PathBuf),

    #[error("invalid date filter {value:?}, expected YYYY-MM-DD: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: jiff::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Schema {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
