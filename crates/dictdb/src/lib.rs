//! # dictdb
//!
//! Dictionary-shaped data access over SQLite.
//!
//! Rows and conditions are plain column-to-value mappings; statements are
//! always parameterized, and every engine failure surfaces as a typed
//! [`DomainError`] naming the table, column and database involved.
//!
//! This crate provides:
//! - [`Repository`]: table and row operations on one connection
//! - [`Engine`]: the capability the repository executes against, with
//!   [`SqliteEngine`] as the production implementation
//! - [`Config`]: how a database is opened
//!
//! ## Example
//!
//! ```rust,no_run
//! use dictdb::{ColumnDef, ColumnMap, DomainError, Operator, Repository};
//!
//! let mut db = Repository::in_memory()?;
//! db.create_table(
//!     "MTG",
//!     &[
//!         ColumnDef::new("id", "INTEGER").primary_key(),
//!         ColumnDef::new("name", "TEXT").unique(),
//!         ColumnDef::new("count", "INTEGER").check("count >= 0"),
//!     ],
//! )?;
//! db.insert_row("MTG", &ColumnMap::new().with("id", 1_i64).with("name", "Island").with("count", 4_i64))?;
//!
//! let err = db
//!     .insert_row("MTG", &ColumnMap::new().with("id", 2_i64).with("name", "Island"))
//!     .unwrap_err();
//! assert!(matches!(err, DomainError::UniqueConstraintViolation { .. }));
//!
//! let few = db.get_row("MTG", &ColumnMap::new().with_compare("count", Operator::Lt, 10_i64))?;
//! assert_eq!(few.len(), 1);
//! # Ok::<(), DomainError>(())
//! ```

pub mod config;
pub mod engine;
mod repository;

pub use config::Config;
pub use dictdb_core::{
    classify, compile, ClauseMode, ColumnDef, ColumnMap, CompileError, CompiledClause, Condition,
    DomainError, EngineFailure, FailureContext, FailureKind, Operator, Params, Result,
    SchemaError, TableSchema, ToValue, Value,
};
pub use engine::{Engine, Row, RowSet, SqliteEngine, StoredDefinition};
pub use repository::Repository;
