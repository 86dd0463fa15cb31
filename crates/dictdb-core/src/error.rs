//! Domain error taxonomy.

use thiserror::Error;

use crate::classify::FailureKind;
use crate::clause::CompileError;
use crate::value::Value;

/// A failed repository operation, classified into something callers can act on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// The table already exists.
    #[error("table {table} already exists in database {database}")]
    DuplicateTable {
        /// Table name.
        table: String,
        /// Database name.
        database: String,
    },

    /// The table does not exist.
    #[error("table {table} does not exist in database {database}")]
    TableNotFound {
        /// Table name.
        table: String,
        /// Database name.
        database: String,
    },

    /// A referenced column does not exist.
    #[error("column {column} does not exist in table {table} of database {database}")]
    ColumnNotFound {
        /// Column name as reported by the engine.
        column: String,
        /// Table name.
        table: String,
        /// Database name.
        database: String,
    },

    /// A UNIQUE or PRIMARY KEY constraint rejected the statement.
    #[error("unique constraint on {} violated in table {table} of database {database}: {statement}", .column.as_deref().unwrap_or("<unknown column>"))]
    UniqueConstraintViolation {
        /// The constrained column, when it could be resolved.
        column: Option<String>,
        /// Table name.
        table: String,
        /// Database name.
        database: String,
        /// The statement that failed.
        statement: String,
    },

    /// A CHECK constraint rejected the statement.
    #[error("check constraint on {} violated in table {table} of database {database}: {statement}", .column.as_deref().unwrap_or("<unknown column>"))]
    CheckConstraintViolation {
        /// The constrained column, when it could be resolved.
        column: Option<String>,
        /// Table name.
        table: String,
        /// Database name.
        database: String,
        /// The statement that failed.
        statement: String,
    },

    /// A NOT NULL constraint rejected the statement.
    #[error("column {column} may not be NULL in table {table} of database {database}: {statement}")]
    NotNullConstraintViolation {
        /// The constrained column.
        column: String,
        /// Table name.
        table: String,
        /// Database name.
        database: String,
        /// The statement that failed.
        statement: String,
    },

    /// A FOREIGN KEY constraint rejected the statement or its commit.
    #[error("foreign key constraint violated in table {table} of database {database}: {statement}")]
    ForeignKeyViolation {
        /// Table name.
        table: String,
        /// Database name.
        database: String,
        /// The statement that failed.
        statement: String,
    },

    /// The engine has no adapter for a bound value.
    #[error("no adapter for value {value} bound to :{variable} (table {table}, database {database})")]
    AdapterMissing {
        /// Column whose value could not be bound.
        variable: String,
        /// The caller's original value.
        value: Value,
        /// Table name.
        table: String,
        /// Database name.
        database: String,
    },

    /// The engine could not parse the statement.
    #[error("syntax error in statement: {statement}")]
    SyntaxError {
        /// The statement that failed.
        statement: String,
    },

    /// The connection was already closed.
    #[error("database {database} is closed")]
    ConnectionClosed {
        /// Database name.
        database: String,
    },

    /// A request could not be compiled into a clause. Raised before any
    /// statement reaches the engine.
    #[error("invalid condition: {0}")]
    InvalidCondition(#[from] CompileError),

    /// Stored DDL could not be read back.
    #[error("cannot read the definition of table {table}: {reason}")]
    MalformedSchema {
        /// Table name.
        table: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// An engine failure that matched no known pattern.
    #[error("unclassified {kind} engine failure: {message} (statement: {statement})")]
    UnclassifiedEngineFailure {
        /// Raw failure kind.
        kind: FailureKind,
        /// Raw engine message.
        message: String,
        /// The statement that failed.
        statement: String,
    },
}

impl DomainError {
    /// Returns true for syntax-class failures, whether reported by the
    /// engine or caught while compiling a clause.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::SyntaxError { .. } | Self::InvalidCondition(_))
    }

    /// Returns true for any constraint violation.
    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::UniqueConstraintViolation { .. }
                | Self::CheckConstraintViolation { .. }
                | Self::NotNullConstraintViolation { .. }
                | Self::ForeignKeyViolation { .. }
        )
    }

    /// The column the error is attached to, if any.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::ColumnNotFound { column, .. } | Self::NotNullConstraintViolation { column, .. } => {
                Some(column)
            }
            Self::UniqueConstraintViolation { column, .. }
            | Self::CheckConstraintViolation { column, .. } => column.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, DomainError>;
