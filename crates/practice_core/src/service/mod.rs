//! Service layer entry points.
//!
//! # Responsibility
//! - Run units of work with commit-or-rollback semantics and guaranteed
//!   teardown.
//! - Host the business logic hook invoked inside the transaction.
//!
//! # Invariants
//! - Unit-of-work failures are logged and rolled back, never propagated.
//! - The factory is closed last, after its entity manager.

pub mod practice_logic;
pub mod unit_of_work;
