//! SQLite engine over sqlx.
//!
//! sqlx is async; the repository is blocking. [`SqliteEngine`] owns a
//! single connection and a private current-thread tokio runtime and drives
//! every call to completion with `block_on`.

use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, Sqlite, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use dictdb_core::{EngineFailure, FailureKind, Params, Value};

use super::bind::to_positional;
use super::{Engine, RowSet, StoredDefinition};
use crate::config::Config;

const CATALOGUE_SQL: &str = "SELECT type, name, sql FROM sqlite_master";

type Query<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A blocking SQLite engine holding exactly one connection.
///
/// Not safe for concurrent use: every method takes `&mut self`.
pub struct SqliteEngine {
    conn: Option<SqliteConnection>,
    runtime: Runtime,
    in_transaction: bool,
}

impl SqliteEngine {
    /// Opens the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineFailure`] if the runtime cannot start or the
    /// database cannot be opened.
    pub fn open(config: &Config) -> Result<Self, EngineFailure> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                EngineFailure::new(FailureKind::Other, format!("cannot start runtime: {e}"))
            })?;
        let options = config.connect_options().map_err(failure_from_sqlx)?;
        let conn = runtime
            .block_on(SqliteConnection::connect_with(&options))
            .map_err(failure_from_sqlx)?;
        debug!(path = %config.path, "Opened SQLite connection");

        Ok(Self {
            conn: Some(conn),
            runtime,
            in_transaction: false,
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// See [`SqliteEngine::open`].
    pub fn in_memory() -> Result<Self, EngineFailure> {
        Self::open(&Config::in_memory())
    }

    /// Returns true while the connection is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns true while an implicit transaction awaits commit.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn run_raw(&mut self, sql: &str) -> Result<(), EngineFailure> {
        let conn = self.conn.as_mut().ok_or_else(EngineFailure::closed)?;
        self.runtime
            .block_on(sqlx::query(sql).execute(&mut *conn))
            .map(|_| ())
            .map_err(failure_from_sqlx)
    }
}

impl Engine for SqliteEngine {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<RowSet, EngineFailure> {
        if self.conn.is_none() {
            return Err(EngineFailure::closed());
        }
        let positional = to_positional(sql, params)?;
        let mut query: Query<'_> = sqlx::query(&positional.sql);
        for (name, value) in &positional.bindings {
            query = bind_value(query, name, value)?;
        }

        let opens_transaction = !self.in_transaction && is_mutating(sql);
        if opens_transaction {
            self.run_raw("BEGIN")?;
            self.in_transaction = true;
        }

        let Self { conn, runtime, .. } = self;
        let conn = conn.as_mut().ok_or_else(EngineFailure::closed)?;
        match runtime.block_on(query.fetch_all(&mut *conn)) {
            Ok(rows) => decode_rows(&rows).map_err(failure_from_sqlx),
            Err(err) => {
                if opens_transaction {
                    if let Err(rollback) = self.run_raw("ROLLBACK") {
                        warn!(error = %rollback, "Rollback after failed statement failed");
                    }
                    self.in_transaction = false;
                }
                Err(failure_from_sqlx(err))
            }
        }
    }

    fn commit(&mut self) -> Result<(), EngineFailure> {
        if self.conn.is_none() {
            return Err(EngineFailure::closed());
        }
        if !self.in_transaction {
            return Ok(());
        }
        // A failed COMMIT leaves the transaction open in SQLite.
        let committed = self.run_raw("COMMIT");
        if committed.is_err() {
            if let Err(rollback) = self.run_raw("ROLLBACK") {
                warn!(error = %rollback, "Rollback after failed commit failed");
            }
        }
        self.in_transaction = false;
        committed
    }

    fn close(&mut self) -> Result<(), EngineFailure> {
        let conn = self.conn.take().ok_or_else(EngineFailure::closed)?;
        self.in_transaction = false;
        self.runtime
            .block_on(conn.close())
            .map_err(failure_from_sqlx)
    }

    fn list_stored_definitions(&mut self) -> Result<Vec<StoredDefinition>, EngineFailure> {
        let rows = self.execute(CATALOGUE_SQL, &Params::new())?;
        let definitions = rows
            .rows
            .into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let kind = text(cells.next())?;
                let name = text(cells.next())?;
                let ddl = text(cells.next());
                Some(StoredDefinition { kind, name, ddl })
            })
            .filter(|d| !d.name.starts_with("sqlite_"))
            .collect();
        Ok(definitions)
    }
}

fn text(cell: Option<Value>) -> Option<String> {
    match cell {
        Some(Value::Text(s)) => Some(s),
        _ => None,
    }
}

/// Statements other than plain reads run inside an implicit transaction.
fn is_mutating(sql: &str) -> bool {
    let head = sql.trim_start();
    let keyword = head
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    !["SELECT", "WITH", "PRAGMA", "EXPLAIN"]
        .iter()
        .any(|read| keyword.eq_ignore_ascii_case(read))
}

fn bind_value<'q>(query: Query<'q>, name: &str, value: &Value) -> Result<Query<'q>, EngineFailure> {
    let query = match value {
        Value::Null => query.bind(Option::<i64>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Integer(i) => query.bind(*i),
        Value::Real(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Blob(b) => query.bind(b.clone()),
        Value::List(_) => {
            return Err(EngineFailure::new(
                FailureKind::Interface,
                format!("Error binding parameter :{name} - probably unsupported type."),
            ));
        }
    };
    Ok(query)
}

fn decode_rows(rows: &[SqliteRow]) -> Result<RowSet, sqlx::Error> {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| decode_cell(row, i)).collect())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RowSet { columns, rows })
}

/// Decodes by the value's storage class rather than the declared type.
fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "NUMERIC" => Value::Real(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// Maps a sqlx error onto the engine failure kinds the classifier reads.
pub(crate) fn failure_from_sqlx(err: sqlx::Error) -> EngineFailure {
    match err {
        sqlx::Error::Database(db) => {
            let kind = match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => FailureKind::Integrity,
                _ if db.message().contains("constraint failed") => FailureKind::Integrity,
                _ => FailureKind::Operational,
            };
            let failure = EngineFailure::new(kind, db.message());
            match db.code() {
                Some(code) => failure.with_code(code),
                None => failure,
            }
        }
        sqlx::Error::Encode(e) => EngineFailure::new(FailureKind::Interface, e.to_string()),
        sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => EngineFailure::closed(),
        other => EngineFailure::new(FailureKind::Other, other.to_string()),
    }
}
