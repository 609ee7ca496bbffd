//! Persistence-unit configuration.
//!
//! # Responsibility
//! - Describe named persistence units and where their data lives.
//! - Load and validate the TOML descriptor that declares them.
//!
//! # Invariants
//! - A loaded descriptor never contains two units with the same name.
//! - Relative database paths are already resolved against the descriptor
//!   directory once loading returns.

pub mod descriptor;

pub use descriptor::{
    DescriptorError, DescriptorResult, JournalMode, PersistenceDescriptor, PersistenceUnit,
    DEFAULT_UNIT_NAME, MEMORY_DATABASE,
};
