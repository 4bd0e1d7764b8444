use derive_more::Display;
use actix_web::error::BlockingError;
use diesel::r2d2;
use diesel::result::{ConnectionError, Error as DieselError};
use std::convert::From;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "database error: {}", _0)]
    DieselError(DieselError),

    #[display(fmt = "could not open database: {}", _0)]
    ConnectionError(ConnectionError),

    #[display(fmt = "connection pool error: {}", _0)]
    PoolError(r2d2::PoolError),

    #[display(fmt = "migration failed: {}", _0)]
    MigrationError(String),

    #[display(fmt = "blocking task was canceled")]
    BlockingCanceled,

    #[display(fmt = "{}", _0)]
    IoError(std::io::Error),

    #[display(fmt = "invalid JSON: {}", _0)]
    JsonError(serde_json::Error),

    #[display(fmt = "category not found: {}", _0)]
    CategoryNotFound(String),

    #[display(fmt = "unknown parent category id {}", _0)]
    UnknownParent(i32),

    #[display(fmt = "category '{}' would exceed the maximum taxonomy depth", _0)]
    TaxonomyTooDeep(String),

    #[display(fmt = "taxonomy has no catch-all category '{}'", _0)]
    MissingCatchAll(&'static str),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DieselError(e) => Some(e),
            Self::ConnectionError(e) => Some(e),
            Self::PoolError(e) => Some(e),
            Self::IoError(e) => Some(e),
            Self::JsonError(e) => Some(e),
            Self::MigrationError(_)
            | Self::BlockingCanceled
            | Self::CategoryNotFound(_)
            | Self::UnknownParent(_)
            | Self::TaxonomyTooDeep(_)
            | Self::MissingCatchAll(_) => None,
        }
    }
}

impl From<DieselError> for Error {
    fn from(e: DieselError) -> Error {
        Error::DieselError(e)
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Error {
        Error::ConnectionError(e)
    }
}

impl From<r2d2::PoolError> for Error {
    fn from(e: r2d2::PoolError) -> Error {
        Error::PoolError(e)
    }
}

impl From<BlockingError> for Error {
    fn from(_: BlockingError) -> Error {
        Error::BlockingCanceled
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IoError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::JsonError(e)
    }
}

/// Reasons a single raw record is rejected before it reaches the catalog.
///
/// These never abort an import; the record is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum NormalizationError {
    #[display(fmt = "record has no beer name")]
    MissingName,

    #[display(fmt = "record has no brewery name")]
    MissingBrewery,
}

impl std::error::Error for NormalizationError {}
