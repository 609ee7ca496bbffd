//! Entity manager contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the factory/manager/transaction lifecycle used by units of work.
//! - Keep SQLite connection details behind those contracts.
//!
//! # Invariants
//! - `close(self)` consumes the handle, so each handle closes at most once.
//! - At most one transaction is active per entity manager.
//! - Closing a manager with an active transaction rolls it back first.

use crate::db::DbError;
use crate::unit::DescriptorError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod factory;
mod manager;

pub use factory::SqliteEntityManagerFactory;
pub use manager::SqliteEntityManager;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Error returned by factory, manager and transaction operations.
#[derive(Debug)]
pub enum PersistenceError {
    Descriptor(DescriptorError),
    Db(DbError),
    /// Operation is not valid in the current transaction/manager state.
    IllegalState(&'static str),
    /// Commit was requested on a rollback-only transaction; it was rolled
    /// back instead.
    RolledBack,
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Descriptor(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::IllegalState(message) => write!(f, "illegal state: {message}"),
            Self::RolledBack => write!(
                f,
                "transaction was marked rollback-only and has been rolled back"
            ),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Descriptor(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::IllegalState(_) | Self::RolledBack => None,
        }
    }
}

impl From<DescriptorError> for PersistenceError {
    fn from(value: DescriptorError) -> Self {
        Self::Descriptor(value)
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Process-wide handle producing entity managers for one persistence unit.
pub trait EntityManagerFactory {
    type Manager: EntityManager;

    fn unit_name(&self) -> &str;
    fn create_entity_manager(&self) -> PersistenceResult<Self::Manager>;
    fn close(self) -> PersistenceResult<()>;
}

/// One unit of work with its resource-local transaction.
///
/// Transaction control takes `&mut self`; business logic only ever sees
/// `&Self`, so it can mark the transaction rollback-only but cannot end it.
pub trait EntityManager {
    fn begin(&mut self) -> PersistenceResult<()>;
    fn commit(&mut self) -> PersistenceResult<()>;
    fn rollback(&mut self) -> PersistenceResult<()>;
    fn is_active(&self) -> bool;
    fn set_rollback_only(&self) -> PersistenceResult<()>;
    fn is_rollback_only(&self) -> bool;
    fn close(self) -> PersistenceResult<()>;
}
