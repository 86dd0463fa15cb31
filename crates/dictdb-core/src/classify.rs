//! Classification of raw engine failures into [`DomainError`]s.
//!
//! SQLite reports failures as free text plus a coarse kind. Every message
//! pattern this crate understands lives in [`classify`]; call sites never
//! search engine messages themselves.
//!
//! | kind        | message                                        | result                      |
//! |-------------|------------------------------------------------|-----------------------------|
//! | operational | `already exists`, or CREATE of a listed table  | `DuplicateTable`            |
//! | operational | `no such table`                                | `TableNotFound`             |
//! | operational | `no such column: X`, `has no column named X`   | `ColumnNotFound`            |
//! | operational | `syntax error` and other parse failures        | `SyntaxError`               |
//! | integrity   | `UNIQUE constraint failed`, `is not unique`    | `UniqueConstraintViolation` |
//! | integrity   | `NOT NULL constraint failed`                   | `NotNullConstraintViolation`|
//! | integrity   | `FOREIGN KEY constraint failed`                | `ForeignKeyViolation`       |
//! | integrity   | `CHECK constraint failed`, bare `constraint failed` | `CheckConstraintViolation` |
//! | interface   | `binding parameter :X` with X in the params    | `AdapterMissing`            |
//! | programming | `closed`                                       | `ConnectionClosed`          |
//!
//! Anything else becomes `UnclassifiedEngineFailure` carrying the raw text.

use std::fmt;

use thiserror::Error;

use crate::error::DomainError;
use crate::schema::TableSchema;
use crate::value::Params;

/// Coarse failure category reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Statement could not be prepared or run (missing objects, bad SQL).
    Operational,
    /// A constraint rejected the data.
    Integrity,
    /// A parameter could not be bound.
    Interface,
    /// The API was misused, e.g. after close.
    Programming,
    /// Anything else (I/O, driver internals).
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Operational => "operational",
            Self::Integrity => "integrity",
            Self::Interface => "interface",
            Self::Programming => "programming",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A raw failure as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct EngineFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Engine message text.
    pub message: String,
    /// Engine result code, when available.
    pub code: Option<String>,
}

impl EngineFailure {
    /// Creates a failure without a result code.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    /// Attaches an engine result code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Failure raised for any use of a closed connection.
    #[must_use]
    pub fn closed() -> Self {
        Self::new(
            FailureKind::Programming,
            "Cannot operate on a closed database.",
        )
    }

    /// Whether classifying this failure benefits from the table's schema.
    #[must_use]
    pub const fn needs_schema(&self) -> bool {
        matches!(self.kind, FailureKind::Integrity)
    }
}

/// What was being attempted when the engine failed.
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    /// Database name.
    pub database: &'a str,
    /// Table the statement targeted.
    pub table: &'a str,
    /// The statement text sent to the engine.
    pub statement: &'a str,
    /// The table's schema, for resolving constraint columns.
    pub schema: Option<&'a TableSchema>,
    /// The bindings sent with the statement.
    pub params: Option<&'a Params>,
    /// Tables that existed when the statement failed.
    pub existing_tables: Option<&'a [String]>,
}

impl<'a> FailureContext<'a> {
    /// Creates a context with no optional lookups.
    #[must_use]
    pub const fn new(database: &'a str, table: &'a str, statement: &'a str) -> Self {
        Self {
            database,
            table,
            statement,
            schema: None,
            params: None,
            existing_tables: None,
        }
    }

    /// Attaches the table schema.
    #[must_use]
    pub const fn with_schema(mut self, schema: Option<&'a TableSchema>) -> Self {
        self.schema = schema;
        self
    }

    /// Attaches the statement bindings.
    #[must_use]
    pub const fn with_params(mut self, params: &'a Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Attaches the table names present at failure time.
    #[must_use]
    pub const fn with_existing_tables(mut self, tables: Option<&'a [String]>) -> Self {
        self.existing_tables = tables;
        self
    }

    fn is_create_table(&self) -> bool {
        self.statement
            .trim_start()
            .get(..12)
            .is_some_and(|head| head.eq_ignore_ascii_case("create table"))
    }
}

const SYNTAX_PATTERNS: [&str; 4] = [
    "syntax error",
    "incomplete input",
    "unrecognized token",
    "duplicate column name",
];

const UNIQUE_PATTERNS: [&str; 3] = ["UNIQUE constraint failed", "is not unique", "must be unique"];

/// Classifies one engine failure into exactly one [`DomainError`].
#[must_use]
pub fn classify(failure: &EngineFailure, ctx: &FailureContext<'_>) -> DomainError {
    let message = failure.message.as_str();
    let classified = match failure.kind {
        FailureKind::Operational => classify_operational(message, ctx),
        FailureKind::Integrity => classify_integrity(message, ctx),
        FailureKind::Interface => classify_interface(message, ctx),
        FailureKind::Programming if message.contains("closed") => {
            Some(DomainError::ConnectionClosed {
                database: ctx.database.to_string(),
            })
        }
        FailureKind::Programming | FailureKind::Other => None,
    };

    classified.unwrap_or_else(|| DomainError::UnclassifiedEngineFailure {
        kind: failure.kind,
        message: failure.message.clone(),
        statement: ctx.statement.to_string(),
    })
}

fn classify_operational(message: &str, ctx: &FailureContext<'_>) -> Option<DomainError> {
    let listed = ctx.is_create_table()
        && ctx
            .existing_tables
            .is_some_and(|tables| tables.iter().any(|t| t.eq_ignore_ascii_case(ctx.table)));

    if message.contains("already exists") || listed {
        return Some(DomainError::DuplicateTable {
            table: ctx.table.to_string(),
            database: ctx.database.to_string(),
        });
    }
    if message.contains("no such table") {
        return Some(DomainError::TableNotFound {
            table: ctx.table.to_string(),
            database: ctx.database.to_string(),
        });
    }
    let column = tail_after(message, "no such column:")
        .or_else(|| tail_after(message, "has no column named"));
    if let Some(column) = column {
        return Some(DomainError::ColumnNotFound {
            column: column.to_string(),
            table: ctx.table.to_string(),
            database: ctx.database.to_string(),
        });
    }
    if SYNTAX_PATTERNS.iter().any(|p| message.contains(p)) {
        return Some(DomainError::SyntaxError {
            statement: ctx.statement.to_string(),
        });
    }
    None
}

fn classify_integrity(message: &str, ctx: &FailureContext<'_>) -> Option<DomainError> {
    let statement = ctx.statement.to_string();
    let table = ctx.table.to_string();
    let database = ctx.database.to_string();

    if UNIQUE_PATTERNS.iter().any(|p| message.contains(p)) {
        let reported = reported_columns(message);
        let column = match ctx.schema {
            Some(schema) => reported
                .iter()
                .find(|c| schema.is_unique(c))
                .or_else(|| reported.first())
                .or_else(|| schema.unique.first())
                .cloned(),
            None => reported.first().cloned(),
        };
        return Some(DomainError::UniqueConstraintViolation {
            column,
            table,
            database,
            statement,
        });
    }

    if message.contains("NOT NULL constraint failed") {
        let column = reported_columns(message).into_iter().next()?;
        return Some(DomainError::NotNullConstraintViolation {
            column,
            table,
            database,
            statement,
        });
    }

    if message.contains("FOREIGN KEY constraint failed") {
        return Some(DomainError::ForeignKeyViolation {
            table,
            database,
            statement,
        });
    }

    if is_check_message(message) {
        let detail = tail_after(message, "constraint failed:").unwrap_or("");
        let column = ctx.schema.and_then(|schema| {
            schema
                .check
                .iter()
                .find(|c| mentions_identifier(detail, c))
                .or_else(|| schema.check.first())
                .cloned()
        });
        return Some(DomainError::CheckConstraintViolation {
            column,
            table,
            database,
            statement,
        });
    }

    None
}

fn classify_interface(message: &str, ctx: &FailureContext<'_>) -> Option<DomainError> {
    let start = message.find("parameter :")? + "parameter :".len();
    let variable: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let value = ctx.params?.get(&variable)?.clone();
    Some(DomainError::AdapterMissing {
        variable,
        value,
        table: ctx.table.to_string(),
        database: ctx.database.to_string(),
    })
}

/// `CHECK constraint failed: ..`, or the bare `constraint failed` older
/// SQLite versions report for CHECK constraints.
fn is_check_message(message: &str) -> bool {
    message.contains("CHECK constraint failed") || message.trim().starts_with("constraint failed")
}

/// The trimmed, non-empty text following `marker`.
fn tail_after<'m>(message: &'m str, marker: &str) -> Option<&'m str> {
    let start = message.find(marker)? + marker.len();
    let tail = message[start..].trim();
    (!tail.is_empty()).then_some(tail)
}

/// Columns listed after `constraint failed:`, with `table.` qualifiers removed.
fn reported_columns(message: &str) -> Vec<String> {
    let Some(list) = tail_after(message, "failed:") else {
        return Vec::new();
    };
    list.split(',')
        .map(|item| {
            let item = item.trim();
            item.rsplit('.').next().unwrap_or(item).to_string()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Whether `text` contains `ident` as a whole identifier.
fn mentions_identifier(text: &str, ident: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word == ident)
}
