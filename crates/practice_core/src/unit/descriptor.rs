//! Persistence descriptor parsing and validation.
//!
//! # Responsibility
//! - Parse `[[unit]]` tables from a TOML descriptor.
//! - Validate declaration-level invariants before any connection is opened.
//!
//! # Invariants
//! - Unit names are non-empty, trimmed and unique.
//! - `database` is either `:memory:` or a non-empty filesystem path.

use log::{error, info};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Unit name bootstrapped by the `practice` binary.
pub const DEFAULT_UNIT_NAME: &str = "practice";
/// Database value selecting a factory-private in-memory database.
pub const MEMORY_DATABASE: &str = ":memory:";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub type DescriptorResult<T> = Result<T, DescriptorError>;

/// Errors raised while loading or querying a persistence descriptor.
#[derive(Debug)]
pub enum DescriptorError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    EmptyUnitName,
    EmptyDatabase(String),
    DuplicateUnit(String),
    UnknownUnit {
        name: String,
        available: Vec<String>,
    },
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read descriptor `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid persistence descriptor: {err}"),
            Self::EmptyUnitName => write!(f, "persistence unit name cannot be empty"),
            Self::EmptyDatabase(unit) => {
                write!(f, "persistence unit `{unit}` has an empty database")
            }
            Self::DuplicateUnit(unit) => {
                write!(f, "persistence unit `{unit}` is declared more than once")
            }
            Self::UnknownUnit { name, available } => write!(
                f,
                "no persistence unit named `{name}`; available: [{}]",
                available.join(", ")
            ),
        }
    }
}

impl Error for DescriptorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::EmptyUnitName
            | Self::EmptyDatabase(_)
            | Self::DuplicateUnit(_)
            | Self::UnknownUnit { .. } => None,
        }
    }
}

impl From<toml::de::Error> for DescriptorError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// SQLite journal mode applied to every connection of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    /// Returns the pragma keyword for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Truncate => "truncate",
            Self::Persist => "persist",
            Self::Memory => "memory",
            Self::Wal => "wal",
            Self::Off => "off",
        }
    }
}

/// One named persistence unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceUnit {
    /// Name callers use to look the unit up, e.g. `practice`.
    pub name: String,
    /// SQLite database file, or `:memory:`.
    pub database: PathBuf,
    /// Busy handler timeout for every connection of this unit.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Whether `PRAGMA foreign_keys` is switched on.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    /// Journal mode; SQLite's own default when absent.
    #[serde(default)]
    pub journal_mode: Option<JournalMode>,
}

impl PersistenceUnit {
    /// Creates a unit with default connection settings.
    pub fn new(name: impl Into<String>, database: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            database: database.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
            journal_mode: None,
        }
    }

    /// Returns `true` when the unit is backed by an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database == Path::new(MEMORY_DATABASE)
    }

    fn validate(&self) -> DescriptorResult<()> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyUnitName);
        }
        if self.database.as_os_str().is_empty() {
            return Err(DescriptorError::EmptyDatabase(self.name.clone()));
        }
        Ok(())
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_foreign_keys() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(default, rename = "unit")]
    units: Vec<PersistenceUnit>,
}

/// Validated set of persistence units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceDescriptor {
    units: Vec<PersistenceUnit>,
}

impl PersistenceDescriptor {
    /// Builds a descriptor from already-constructed units.
    ///
    /// # Errors
    /// - Returns the first validation failure, including duplicate names.
    pub fn new(mut units: Vec<PersistenceUnit>) -> DescriptorResult<Self> {
        let mut seen = BTreeSet::<String>::new();
        for unit in &mut units {
            unit.name = unit.name.trim().to_string();
            unit.validate()?;
            if !seen.insert(unit.name.clone()) {
                return Err(DescriptorError::DuplicateUnit(unit.name.clone()));
            }
        }
        Ok(Self { units })
    }

    /// Descriptor used when no descriptor file is configured: a single
    /// in-memory `practice` unit.
    pub fn builtin() -> Self {
        Self {
            units: vec![PersistenceUnit::new(DEFAULT_UNIT_NAME, MEMORY_DATABASE)],
        }
    }

    /// Parses and validates descriptor text.
    ///
    /// Relative database paths are kept as written.
    pub fn from_toml_str(text: &str) -> DescriptorResult<Self> {
        let raw: RawDescriptor = toml::from_str(text)?;
        Self::new(raw.units)
    }

    /// Loads a descriptor file, resolving relative database paths against
    /// the file's parent directory.
    ///
    /// # Side effects
    /// - Reads `path` from disk.
    /// - Emits `descriptor_load` logging events.
    pub fn load(path: impl AsRef<Path>) -> DescriptorResult<Self> {
        let path = path.as_ref();
        info!(
            "event=descriptor_load module=unit status=start path={}",
            path.display()
        );

        let result = std::fs::read_to_string(path)
            .map_err(|source| DescriptorError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|text| Self::from_toml_str(&text));

        match result {
            Ok(mut descriptor) => {
                let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
                descriptor.resolve_relative_paths(base_dir);
                info!(
                    "event=descriptor_load module=unit status=ok units={}",
                    descriptor.units.len()
                );
                Ok(descriptor)
            }
            Err(err) => {
                error!(
                    "event=descriptor_load module=unit status=error error_code=descriptor_invalid error={}",
                    err
                );
                Err(err)
            }
        }
    }

    /// Looks up a unit by exact name.
    pub fn unit(&self, name: &str) -> DescriptorResult<&PersistenceUnit> {
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .ok_or_else(|| DescriptorError::UnknownUnit {
                name: name.to_string(),
                available: self.unit_names().map(str::to_string).collect(),
            })
    }

    /// Iterates declared unit names in declaration order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|unit| unit.name.as_str())
    }

    /// Returns all declared units.
    pub fn units(&self) -> &[PersistenceUnit] {
        &self.units
    }

    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        for unit in &mut self.units {
            if unit.is_in_memory() || unit.database.is_absolute() {
                continue;
            }
            unit.database = base_dir.join(&unit.database);
        }
    }
}
