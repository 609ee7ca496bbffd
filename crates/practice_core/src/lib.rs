//! Persistence bootstrap core for the `practice` unit.
//! Owns the entity manager lifecycle and the transactional unit of work.

pub mod config;
pub mod db;
pub mod em;
pub mod logging;
pub mod service;
pub mod unit;

pub use config::{ConfigError, DescriptorSource, RuntimeConfig};
pub use em::{
    EntityManager, EntityManagerFactory, PersistenceError, PersistenceResult, SqliteEntityManager,
    SqliteEntityManagerFactory,
};
pub use logging::{default_log_level, flush_logging, init_logging, logging_status};
pub use service::practice_logic::logic;
pub use service::unit_of_work::{
    error_chain, run_persistence_unit, run_unit_of_work, run_with_factory, LogicError,
    UnitOfWorkOutcome,
};
pub use unit::{
    DescriptorError, JournalMode, PersistenceDescriptor, PersistenceUnit, DEFAULT_UNIT_NAME,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
