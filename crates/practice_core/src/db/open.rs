//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Resolve a persistence unit into a file or shared in-memory target.
//! - Configure connection pragmas declared by the unit.
//!
//! # Invariants
//! - Every connection opened for the same in-memory target sees the same
//!   database for as long as at least one of them stays open.
//! - Two targets created for in-memory units never alias each other.

use super::DbResult;
use crate::unit::PersistenceUnit;
use log::{debug, error, warn};
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Concrete SQLite location a unit's connections are opened against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    File(PathBuf),
    SharedMemory { uri: String },
}

impl DatabaseTarget {
    /// Resolves the target for `unit`.
    ///
    /// In-memory units get a fresh, uniquely named shared-cache database on
    /// every call.
    pub fn for_unit(unit: &PersistenceUnit) -> Self {
        if unit.is_in_memory() {
            Self::SharedMemory {
                uri: format!("file:practice-{}?mode=memory&cache=shared", Uuid::new_v4()),
            }
        } else {
            Self::File(unit.database.clone())
        }
    }

    /// Short label used in logging events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::SharedMemory { .. } => "memory",
        }
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::SharedMemory { uri } => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        }
    }
}

/// Opens a connection to `target` and applies the pragmas of `unit`.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(target: &DatabaseTarget, unit: &PersistenceUnit) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.mode();
    debug!(
        "event=db_open module=db status=start unit={} mode={}",
        unit.name, mode
    );

    let conn = match target.open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error unit={} mode={} duration_ms={} error_code=db_open_failed error={}",
                unit.name,
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, unit) {
        Ok(()) => {
            debug!(
                "event=db_open module=db status=ok unit={} mode={} duration_ms={}",
                unit.name,
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error unit={} mode={} duration_ms={} error_code=db_configure_failed error={}",
                unit.name,
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &Connection, unit: &PersistenceUnit) -> DbResult<()> {
    if unit.foreign_keys {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    } else {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    }
    conn.busy_timeout(Duration::from_millis(unit.busy_timeout_ms))?;

    if let Some(journal_mode) = unit.journal_mode {
        let requested = journal_mode.as_str();
        let applied: String = conn.query_row(
            &format!("PRAGMA journal_mode = {requested};"),
            [],
            |row| row.get(0),
        )?;
        // SQLite silently keeps `memory` for in-memory databases.
        if !applied.eq_ignore_ascii_case(requested) {
            warn!(
                "event=db_configure module=db status=degraded unit={} journal_mode_requested={} journal_mode_applied={}",
                unit.name, requested, applied
            );
        }
    }

    Ok(())
}
