//! SQLite-backed entity manager.
//!
//! # Invariants
//! - Transaction activity is read from the connection's autocommit flag, so
//!   it stays correct even when a failed `COMMIT` leaves the transaction open.
//! - The rollback-only mark is cleared whenever a transaction ends.

use super::{EntityManager, PersistenceError, PersistenceResult};
use crate::db::DbError;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::cell::Cell;

/// Entity manager owning one SQLite connection.
pub struct SqliteEntityManager {
    unit_name: String,
    conn: Option<Connection>,
    rollback_only: Cell<bool>,
}

impl SqliteEntityManager {
    pub(crate) fn new(unit_name: impl Into<String>, conn: Connection) -> Self {
        Self {
            unit_name: unit_name.into(),
            conn: Some(conn),
            rollback_only: Cell::new(false),
        }
    }

    /// Name of the persistence unit this manager belongs to.
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Borrows the underlying connection for SQL work inside a unit of work.
    ///
    /// Statements run here join the active transaction, if any.
    pub fn connection(&self) -> PersistenceResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or(PersistenceError::IllegalState("entity manager is closed"))
    }

    fn require_active(&self, message: &'static str) -> PersistenceResult<&Connection> {
        let conn = self.connection()?;
        if conn.is_autocommit() {
            return Err(PersistenceError::IllegalState(message));
        }
        Ok(conn)
    }

    fn rollback_inner(&self, conn: &Connection) -> PersistenceResult<()> {
        self.rollback_only.set(false);
        conn.execute_batch("ROLLBACK;")?;
        debug!(
            "event=tx_rollback module=em status=ok unit={}",
            self.unit_name
        );
        Ok(())
    }

    fn release(&mut self) -> PersistenceResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        let rollback_result = if conn.is_autocommit() {
            Ok(())
        } else {
            warn!(
                "event=em_close module=em status=rollback unit={} reason=active_transaction",
                self.unit_name
            );
            self.rollback_inner(&conn)
        };

        let close_result = conn
            .close()
            .map_err(|(_, err)| PersistenceError::Db(DbError::Sqlite(err)));

        rollback_result.and(close_result)
    }
}

impl EntityManager for SqliteEntityManager {
    fn begin(&mut self) -> PersistenceResult<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            return Err(PersistenceError::IllegalState(
                "transaction is already active",
            ));
        }
        conn.execute_batch("BEGIN DEFERRED;")?;
        self.rollback_only.set(false);
        debug!("event=tx_begin module=em status=ok unit={}", self.unit_name);
        Ok(())
    }

    fn commit(&mut self) -> PersistenceResult<()> {
        let conn = self.require_active("commit requires an active transaction")?;
        if self.rollback_only.get() {
            warn!(
                "event=tx_commit module=em status=rollback unit={} reason=rollback_only",
                self.unit_name
            );
            self.rollback_inner(conn)?;
            return Err(PersistenceError::RolledBack);
        }
        conn.execute_batch("COMMIT;")?;
        debug!("event=tx_commit module=em status=ok unit={}", self.unit_name);
        Ok(())
    }

    fn rollback(&mut self) -> PersistenceResult<()> {
        let conn = self.require_active("rollback requires an active transaction")?;
        self.rollback_inner(conn)
    }

    fn is_active(&self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| !conn.is_autocommit())
    }

    fn set_rollback_only(&self) -> PersistenceResult<()> {
        self.require_active("set_rollback_only requires an active transaction")?;
        self.rollback_only.set(true);
        Ok(())
    }

    fn is_rollback_only(&self) -> bool {
        self.rollback_only.get()
    }

    fn close(mut self) -> PersistenceResult<()> {
        self.release()?;
        info!("event=em_close module=em status=ok unit={}", self.unit_name);
        Ok(())
    }
}

impl Drop for SqliteEntityManager {
    fn drop(&mut self) {
        if self.conn.is_none() {
            return;
        }
        warn!(
            "event=em_close module=em status=implicit unit={}",
            self.unit_name
        );
        if let Err(err) = self.release() {
            error!(
                "event=em_close module=em status=error unit={} error={}",
                self.unit_name, err
            );
        }
    }
}
