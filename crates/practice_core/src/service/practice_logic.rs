//! Business logic executed inside the `practice` unit of work.

use crate::em::SqliteEntityManager;
use crate::service::unit_of_work::LogicError;

/// Runs application work against `em` while its transaction is active.
///
/// Currently a no-op, so every bootstrap run commits an empty transaction.
pub fn logic(_em: &SqliteEntityManager) -> Result<(), LogicError> {
    Ok(())
}
