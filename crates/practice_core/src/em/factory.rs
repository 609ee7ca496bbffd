//! SQLite-backed entity manager factory.
//!
//! # Invariants
//! - Creation opens an anchor connection, so misconfigured units fail here
//!   rather than on first use.
//! - The anchor stays open until `close`, which keeps in-memory databases
//!   alive across managers.

use super::{EntityManagerFactory, PersistenceError, PersistenceResult, SqliteEntityManager};
use crate::db::{open_connection, DatabaseTarget, DbError};
use crate::unit::{PersistenceDescriptor, PersistenceUnit};
use log::{error, info, warn};
use rusqlite::Connection;
use std::time::Instant;

/// Entity manager factory for one SQLite persistence unit.
pub struct SqliteEntityManagerFactory {
    unit: PersistenceUnit,
    target: DatabaseTarget,
    anchor: Option<Connection>,
}

impl SqliteEntityManagerFactory {
    /// Creates a factory for `unit_name` as declared in `descriptor`.
    ///
    /// # Errors
    /// - `Descriptor` when the unit is not declared.
    /// - `Db` when the anchor connection cannot be opened or configured.
    pub fn from_descriptor(
        descriptor: &PersistenceDescriptor,
        unit_name: &str,
    ) -> PersistenceResult<Self> {
        let unit = descriptor.unit(unit_name)?;
        Self::create(unit.clone())
    }

    /// Creates a factory for an already-resolved unit.
    ///
    /// # Side effects
    /// - Opens the anchor connection (creating the database file if needed).
    /// - Emits `emf_create` logging events.
    pub fn create(unit: PersistenceUnit) -> PersistenceResult<Self> {
        let started_at = Instant::now();
        let target = DatabaseTarget::for_unit(&unit);
        info!(
            "event=emf_create module=em status=start unit={} mode={}",
            unit.name,
            target.mode()
        );

        match open_connection(&target, &unit) {
            Ok(anchor) => {
                info!(
                    "event=emf_create module=em status=ok unit={} duration_ms={}",
                    unit.name,
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    unit,
                    target,
                    anchor: Some(anchor),
                })
            }
            Err(err) => {
                error!(
                    "event=emf_create module=em status=error unit={} duration_ms={} error_code=emf_create_failed error={}",
                    unit.name,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Returns the unit this factory serves.
    pub fn unit(&self) -> &PersistenceUnit {
        &self.unit
    }

    fn release(&mut self) -> PersistenceResult<()> {
        match self.anchor.take() {
            Some(anchor) => anchor
                .close()
                .map_err(|(_, err)| PersistenceError::Db(DbError::Sqlite(err))),
            None => Ok(()),
        }
    }
}

impl EntityManagerFactory for SqliteEntityManagerFactory {
    type Manager = SqliteEntityManager;

    fn unit_name(&self) -> &str {
        &self.unit.name
    }

    fn create_entity_manager(&self) -> PersistenceResult<SqliteEntityManager> {
        let conn = open_connection(&self.target, &self.unit)?;
        info!("event=em_create module=em status=ok unit={}", self.unit.name);
        Ok(SqliteEntityManager::new(self.unit.name.clone(), conn))
    }

    fn close(mut self) -> PersistenceResult<()> {
        self.release()?;
        info!("event=emf_close module=em status=ok unit={}", self.unit.name);
        Ok(())
    }
}

impl Drop for SqliteEntityManagerFactory {
    fn drop(&mut self) {
        if self.anchor.is_none() {
            return;
        }
        warn!(
            "event=emf_close module=em status=implicit unit={}",
            self.unit.name
        );
        if let Err(err) = self.release() {
            error!(
                "event=emf_close module=em status=error unit={} error={}",
                self.unit.name, err
            );
        }
    }
}
