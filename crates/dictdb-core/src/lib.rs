//! # dictdb-core
//!
//! Engine-independent building blocks for dictionary-shaped SQL access.
//!
//! This crate provides:
//! - [`clause`]: compiles column/value mappings into parameterized SQL
//!   fragments (column lists, assignments, predicates)
//! - [`schema`]: renders `CREATE TABLE` statements and reads stored DDL back
//!   into column and constraint metadata
//! - [`classify`]: turns raw engine failures into typed [`DomainError`]s
//!
//! Nothing here talks to a database. The `dictdb` crate wires these pieces
//! to SQLite.
//!
//! ## SQL Injection Prevention
//!
//! Values never appear in compiled fragments, only named placeholders:
//!
//! ```rust
//! use dictdb_core::clause::{compile, ClauseMode, ColumnMap};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let clause = compile(&ColumnMap::new().with("name", user_input), ClauseMode::PredicateList).unwrap();
//!
//! assert_eq!(clause.sql, "name=:name");
//! assert_eq!(clause.params.get("name").and_then(|v| v.as_str()), Some(user_input));
//! ```

pub mod classify;
pub mod clause;
mod error;
pub mod schema;
pub mod value;

pub use classify::{classify, EngineFailure, FailureContext, FailureKind};
pub use clause::{compile, ClauseMode, ColumnMap, CompileError, CompiledClause, Condition, Operator};
pub use error::{DomainError, Result};
pub use schema::{parse_create_table, ColumnDef, SchemaError, TableSchema};
pub use value::{Params, ToValue, Value};
