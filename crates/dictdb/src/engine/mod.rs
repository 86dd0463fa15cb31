//! The storage engine capability.
//!
//! The repository only ever talks to an [`Engine`]. [`SqliteEngine`] is the
//! production implementation; tests may wrap or replace it.

mod bind;
mod sqlite;

pub use sqlite::SqliteEngine;

use dictdb_core::{EngineFailure, Params, Value};

/// One row of a result set, in column order.
pub type Row = Vec<Value>;

/// Rows returned by a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names, when the statement returned at least one row.
    pub columns: Vec<String>,
    /// Returned rows.
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An entry of the engine's catalogue of stored definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDefinition {
    /// Object kind: `table`, `index`, `view` or `trigger`.
    pub kind: String,
    /// Object name.
    pub name: String,
    /// The stored DDL text. Engine-generated objects have none.
    pub ddl: Option<String>,
}

/// Trait for the embedded engine the repository executes against.
///
/// Every call is blocking and completes (or fails) before returning.
/// Implementations must fail every call made after [`Engine::close`].
pub trait Engine {
    /// Executes one statement with `:name` placeholders bound from `params`.
    ///
    /// A failed call leaves no partial effects.
    ///
    /// # Errors
    ///
    /// Returns the raw [`EngineFailure`] reported by the engine.
    fn execute(&mut self, sql: &str, params: &Params) -> Result<RowSet, EngineFailure>;

    /// Makes the effects of previous statements durable.
    ///
    /// # Errors
    ///
    /// Fails if the connection is closed or the commit is rejected.
    fn commit(&mut self) -> Result<(), EngineFailure>;

    /// Releases the connection.
    ///
    /// # Errors
    ///
    /// Fails if the connection is already closed.
    fn close(&mut self) -> Result<(), EngineFailure>;

    /// Lists the stored definitions, without internal `sqlite_` entries.
    ///
    /// # Errors
    ///
    /// Fails if the catalogue cannot be read.
    fn list_stored_definitions(&mut self) -> Result<Vec<StoredDefinition>, EngineFailure>;
}
