//! SQLite connection bootstrap for persistence units.
//!
//! # Responsibility
//! - Map a persistence unit onto a concrete SQLite database target.
//! - Open and configure connections with the unit's pragmas.
//!
//! # Invariants
//! - Returned connections have the unit's pragmas applied.
//! - Returned connections are in autocommit mode (no open transaction).

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_connection, DatabaseTarget};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
