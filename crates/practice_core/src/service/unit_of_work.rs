//! Transactional unit-of-work runner.
//!
//! # Responsibility
//! - Begin, run business logic, and commit on one entity manager.
//! - Turn any failure into a logged rollback.
//! - Release the manager and then the factory on every path.
//!
//! # Invariants
//! - Rollback is attempted only while a transaction is active.
//! - Teardown failures are logged and do not change the reported outcome.

use crate::em::{
    EntityManager, EntityManagerFactory, PersistenceResult, SqliteEntityManager,
    SqliteEntityManagerFactory,
};
use crate::unit::PersistenceDescriptor;
use log::{error, info, warn};
use std::error::Error;
use std::time::Instant;

/// Error type business logic hooks may return.
pub type LogicError = Box<dyn Error + Send + Sync + 'static>;

/// How a unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOfWorkOutcome {
    Committed,
    /// The work failed; `cause` is the rendered error chain.
    RolledBack { cause: String },
}

impl UnitOfWorkOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Runs `logic` inside a new transaction on `em`.
///
/// Begin, hook, and commit failures are logged with their full source chain
/// and the transaction is rolled back if still active. The error is reported
/// through the returned outcome only.
pub fn run_unit_of_work<M, L>(em: &mut M, logic: L) -> UnitOfWorkOutcome
where
    M: EntityManager,
    L: FnOnce(&M) -> Result<(), LogicError>,
{
    let started_at = Instant::now();
    info!("event=unit_of_work module=service status=start");

    let err = match execute(em, logic) {
        Ok(()) => {
            info!(
                "event=unit_of_work module=service status=committed duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return UnitOfWorkOutcome::Committed;
        }
        Err(err) => err,
    };

    let cause = error_chain(err.as_ref());
    error!(
        "event=unit_of_work module=service status=error duration_ms={} error={}",
        started_at.elapsed().as_millis(),
        cause
    );

    if em.is_active() {
        match em.rollback() {
            Ok(()) => info!("event=unit_of_work module=service status=rolled_back"),
            Err(rollback_err) => error!(
                "event=unit_of_work module=service status=error error_code=rollback_failed error={}",
                error_chain(&rollback_err)
            ),
        }
    }

    UnitOfWorkOutcome::RolledBack { cause }
}

fn execute<M, L>(em: &mut M, logic: L) -> Result<(), LogicError>
where
    M: EntityManager,
    L: FnOnce(&M) -> Result<(), LogicError>,
{
    em.begin()?;
    logic(&*em)?;
    em.commit()?;
    Ok(())
}

/// Creates one entity manager from `factory`, runs a unit of work on it,
/// then closes the manager and finally the factory.
///
/// # Errors
/// - Returns the manager creation error; the factory is still closed.
pub fn run_with_factory<F, L>(factory: F, logic: L) -> PersistenceResult<UnitOfWorkOutcome>
where
    F: EntityManagerFactory,
    L: FnOnce(&F::Manager) -> Result<(), LogicError>,
{
    let mut em = match factory.create_entity_manager() {
        Ok(em) => em,
        Err(err) => {
            error!(
                "event=em_create module=service status=error unit={} error={}",
                factory.unit_name(),
                error_chain(&err)
            );
            close_factory(factory);
            return Err(err);
        }
    };

    let outcome = run_unit_of_work(&mut em, logic);

    if let Err(err) = em.close() {
        error!(
            "event=teardown module=service status=error step=em_close unit={} error={}",
            factory.unit_name(),
            error_chain(&err)
        );
    }
    close_factory(factory);

    Ok(outcome)
}

/// Bootstraps the SQLite-backed unit `unit_name` and runs `logic` once.
///
/// # Errors
/// - Returns unit lookup, factory creation, or manager creation failures.
pub fn run_persistence_unit<L>(
    descriptor: &PersistenceDescriptor,
    unit_name: &str,
    logic: L,
) -> PersistenceResult<UnitOfWorkOutcome>
where
    L: FnOnce(&SqliteEntityManager) -> Result<(), LogicError>,
{
    let factory = SqliteEntityManagerFactory::from_descriptor(descriptor, unit_name)?;
    run_with_factory(factory, logic)
}

fn close_factory<F: EntityManagerFactory>(factory: F) {
    let unit_name = factory.unit_name().to_string();
    if let Err(err) = factory.close() {
        warn!(
            "event=teardown module=service status=error step=emf_close unit={} error={}",
            unit_name,
            error_chain(&err)
        );
    }
}

/// Renders an error and all of its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Wrapper errors often render their source verbatim.
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
