//! Process runtime configuration.
//!
//! # Responsibility
//! - Read bootstrap settings from `PRACTICE_*` environment variables.
//! - Decide which persistence descriptor the process uses.
//!
//! # Invariants
//! - An explicitly configured descriptor path must exist; only the implicit
//!   default path may fall back to the builtin descriptor.

use crate::logging::{default_log_level, normalize_level};
use crate::unit::{DescriptorResult, PersistenceDescriptor, DEFAULT_UNIT_NAME};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_PERSISTENCE_FILE: &str = "PRACTICE_PERSISTENCE_FILE";
pub const ENV_PERSISTENCE_UNIT: &str = "PRACTICE_PERSISTENCE_UNIT";
pub const ENV_LOG_LEVEL: &str = "PRACTICE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PRACTICE_LOG_DIR";

const DEFAULT_DESCRIPTOR_FILE: &str = "persistence.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyValue(&'static str),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue(key) => write!(f, "{key} is set but empty"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Where the persistence descriptor comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
    /// Path named by `PRACTICE_PERSISTENCE_FILE`; must exist.
    Explicit(PathBuf),
    /// Conventional path; the builtin descriptor is used when it is absent.
    Default(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub descriptor: DescriptorSource,
    pub unit_name: String,
    pub log_level: &'static str,
    /// Rolling log directory; `None` logs to stderr only.
    pub log_dir: Option<String>,
}

impl RuntimeConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let descriptor = match non_empty(&lookup, ENV_PERSISTENCE_FILE)? {
            Some(path) => DescriptorSource::Explicit(PathBuf::from(path)),
            None => DescriptorSource::Default(PathBuf::from(DEFAULT_DESCRIPTOR_FILE)),
        };
        let unit_name = non_empty(&lookup, ENV_PERSISTENCE_UNIT)?
            .unwrap_or_else(|| DEFAULT_UNIT_NAME.to_string());
        let log_level = match non_empty(&lookup, ENV_LOG_LEVEL)? {
            Some(level) => normalize_level(&level).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };
        let log_dir = non_empty(&lookup, ENV_LOG_DIR)?;

        Ok(Self {
            descriptor,
            unit_name,
            log_level,
            log_dir,
        })
    }

    /// Loads the configured persistence descriptor.
    ///
    /// # Errors
    /// - Returns read/parse/validation errors of the chosen descriptor file.
    pub fn load_descriptor(&self) -> DescriptorResult<PersistenceDescriptor> {
        match &self.descriptor {
            DescriptorSource::Explicit(path) => PersistenceDescriptor::load(path),
            DescriptorSource::Default(path) if path.exists() => PersistenceDescriptor::load(path),
            DescriptorSource::Default(path) => {
                info!(
                    "event=descriptor_load module=config status=builtin missing_path={}",
                    path.display()
                );
                Ok(PersistenceDescriptor::builtin())
            }
        }
    }
}

fn non_empty<F>(lookup: &F, key: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key)),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}
