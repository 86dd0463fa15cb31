//! Connection configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::sqlite::SqliteConnectOptions;
use tracing::warn;

/// In-memory database path.
pub const MEMORY: &str = ":memory:";

/// Environment variable holding the database path.
pub const ENV_DATABASE: &str = "DICTDB_DATABASE";

/// Environment variable holding the busy timeout in milliseconds.
pub const ENV_BUSY_TIMEOUT_MS: &str = "DICTDB_BUSY_TIMEOUT_MS";

/// How to open a database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Create the file if it does not exist.
    pub create_if_missing: bool,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// How long to wait on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: String::from(MEMORY),
            create_if_missing: true,
            foreign_keys: true,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Configuration for the database file at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Reads [`ENV_DATABASE`] and [`ENV_BUSY_TIMEOUT_MS`], falling back to
    /// defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(ENV_DATABASE) {
            config.path = path;
        }
        if let Ok(raw) = std::env::var(ENV_BUSY_TIMEOUT_MS) {
            match raw.parse() {
                Ok(ms) => config.busy_timeout_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid {ENV_BUSY_TIMEOUT_MS}"),
            }
        }
        config
    }

    /// Sets whether a missing file is created.
    #[must_use]
    pub const fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets whether foreign keys are enforced.
    #[must_use]
    pub const fn foreign_keys(mut self, enforce: bool) -> Self {
        self.foreign_keys = enforce;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Returns true for the in-memory path.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == MEMORY
    }

    /// The database name reported in errors: the path without a `.sql` suffix.
    #[must_use]
    pub fn database_name(&self) -> String {
        self.path
            .strip_suffix(".sql")
            .unwrap_or(&self.path)
            .to_string()
    }

    pub(crate) fn connect_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new().filename(&self.path)
        };
        Ok(options
            .create_if_missing(self.create_if_missing)
            .foreign_keys(self.foreign_keys)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms)))
    }
}
