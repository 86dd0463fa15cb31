//! Dictionary-shaped table and row operations.
//!
//! The repository builds statements with the clause compiler, executes
//! them on its [`Engine`], and routes every engine failure through the
//! classifier exactly once.

use tracing::{debug, info, warn};

use dictdb_core::clause::{compile, compile_prefixed, is_identifier};
use dictdb_core::schema::{parse_create_table, render_column_list};
use dictdb_core::{
    classify, ClauseMode, ColumnDef, ColumnMap, CompileError, DomainError, EngineFailure,
    FailureContext, FailureKind, Params, Result, TableSchema,
};

use crate::config::Config;
use crate::engine::{Engine, Row, RowSet, SqliteEngine, StoredDefinition};

/// Placeholder prefix for WHERE bindings of an UPDATE.
const WHERE_PREFIX: &str = "where_";

/// Statement text reported when the catalogue cannot be read.
const CATALOGUE: &str = "<list stored definitions>";

/// Owns one engine connection and exposes table and row operations on it.
///
/// # Example
///
/// ```rust,no_run
/// use dictdb::{ColumnDef, ColumnMap, Repository};
///
/// let mut db = Repository::in_memory()?;
/// db.create_table(
///     "MTG",
///     &[
///         ColumnDef::new("id", "INTEGER").primary_key(),
///         ColumnDef::new("name", "TEXT").unique(),
///     ],
/// )?;
/// db.insert_row("MTG", &ColumnMap::new().with("id", 1_i64).with("name", "Plains"))?;
/// let rows = db.get_row("MTG", &ColumnMap::new().with("name", "Plains"))?;
/// assert_eq!(rows.len(), 1);
/// db.close()?;
/// # Ok::<(), dictdb::DomainError>(())
/// ```
pub struct Repository<E: Engine = SqliteEngine> {
    engine: E,
    name: String,
    open: bool,
}

impl Repository<SqliteEngine> {
    /// Opens the SQLite database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the classified open failure.
    pub fn open(config: &Config) -> Result<Self> {
        let name = config.database_name();
        match SqliteEngine::open(config) {
            Ok(engine) => {
                info!(database = %name, "Database opened");
                Ok(Self::with_engine(name, engine))
            }
            Err(failure) => Err(classify(&failure, &FailureContext::new(&name, "", ""))),
        }
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// See [`Repository::open`].
    pub fn in_memory() -> Result<Self> {
        Self::open(&Config::in_memory())
    }

    /// Renders `condition` with inline literal values, for diagnostics only.
    ///
    /// # Errors
    ///
    /// `InvalidCondition` for a non-identifier column name.
    pub fn render_predicates(condition: &ColumnMap) -> Result<String> {
        Ok(compile(condition, ClauseMode::LiteralPredicateList)?.sql)
    }
}

impl<E: Engine> Repository<E> {
    /// Wraps an already-open engine.
    #[must_use]
    pub fn with_engine(name: impl Into<String>, engine: E) -> Self {
        Self {
            engine,
            name: name.into(),
            open: true,
        }
    }

    /// The database name reported in errors.
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.name
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Creates `table` from structured column definitions.
    ///
    /// # Errors
    ///
    /// `DuplicateTable` if the table exists, `SyntaxError` if the engine
    /// rejects a definition.
    pub fn create_table(&mut self, table: &str, columns: &[ColumnDef]) -> Result<()> {
        self.create_table_sql(table, &render_column_list(columns))
    }

    /// Creates `table` from a raw parenthesized definition list, e.g.
    /// `(id INTEGER PRIMARY KEY, name TEXT)`.
    ///
    /// # Errors
    ///
    /// See [`Repository::create_table`].
    pub fn create_table_sql(&mut self, table: &str, definitions: &str) -> Result<()> {
        let statement = format!("CREATE TABLE {table} {definitions}");
        self.mutate(table, &statement, &Params::new())?;
        info!(database = %self.name, table, "Table created");
        Ok(())
    }

    /// Drops `table` if it exists.
    ///
    /// # Errors
    ///
    /// `SyntaxError` for an unusable table name.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        let statement = format!("DROP TABLE IF EXISTS {table}");
        self.mutate(table, &statement, &Params::new())?;
        info!(database = %self.name, table, "Table dropped");
        Ok(())
    }

    /// Deletes every row of `table`.
    ///
    /// # Errors
    ///
    /// `TableNotFound` if the table does not exist.
    pub fn clear_table(&mut self, table: &str) -> Result<()> {
        let statement = format!("DELETE FROM {table}");
        self.mutate(table, &statement, &Params::new())?;
        Ok(())
    }

    /// Inserts one row. An empty row inserts the column defaults.
    ///
    /// # Errors
    ///
    /// `InvalidCondition` if the row carries operators, `TableNotFound`,
    /// `ColumnNotFound`, a constraint violation, or `AdapterMissing` for a
    /// value the engine cannot store.
    pub fn insert_row(&mut self, table: &str, row: &ColumnMap) -> Result<()> {
        let clause = compile(row, ClauseMode::ColumnList)?;
        let statement = if row.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                clause.sql,
                clause.placeholders.as_deref().unwrap_or_default()
            )
        };
        self.mutate(table, &statement, &clause.params)?;
        Ok(())
    }

    /// Updates the rows matching `condition` with `changes`.
    ///
    /// # Errors
    ///
    /// `InvalidCondition` if either mapping is empty or `changes` carries
    /// operators; otherwise as [`Repository::insert_row`].
    pub fn update_row(&mut self, table: &str, changes: &ColumnMap, condition: &ColumnMap) -> Result<()> {
        if changes.is_empty() {
            return Err(CompileError::Empty(ClauseMode::AssignmentList).into());
        }
        if condition.is_empty() {
            return Err(CompileError::Empty(ClauseMode::PredicateList).into());
        }
        let set = compile(changes, ClauseMode::AssignmentList)?;
        let filter = compile_prefixed(condition, ClauseMode::PredicateList, WHERE_PREFIX)?;

        let statement = format!("UPDATE {table} SET {} WHERE {}", set.sql, filter.sql);
        let mut params = set.params;
        params.extend(filter.params);
        self.mutate(table, &statement, &params)
            .map_err(|err| unprefix_where(err, condition))
    }

    /// Deletes the rows matching `condition`.
    ///
    /// # Errors
    ///
    /// `InvalidCondition` for an empty condition (use
    /// [`Repository::clear_table`] to delete everything), `TableNotFound`,
    /// `ColumnNotFound`.
    pub fn delete_row(&mut self, table: &str, condition: &ColumnMap) -> Result<()> {
        if condition.is_empty() {
            return Err(CompileError::Empty(ClauseMode::PredicateList).into());
        }
        let filter = compile(condition, ClauseMode::PredicateList)?;
        let statement = format!("DELETE FROM {table} WHERE {}", filter.sql);
        self.mutate(table, &statement, &filter.params)?;
        Ok(())
    }

    /// Returns every column of the rows matching `condition`; all rows when
    /// `condition` is empty.
    ///
    /// # Errors
    ///
    /// `TableNotFound`, `ColumnNotFound`, `InvalidCondition`.
    pub fn get_row(&mut self, table: &str, condition: &ColumnMap) -> Result<Vec<Row>> {
        self.select(table, "*", condition).map(|rows| rows.rows)
    }

    /// Returns `columns` of the rows matching `condition`.
    ///
    /// # Errors
    ///
    /// `InvalidCondition` for an empty or non-identifier column list, then
    /// as [`Repository::get_row`].
    pub fn get_values(&mut self, table: &str, columns: &[&str], condition: &ColumnMap) -> Result<Vec<Row>> {
        if columns.is_empty() {
            return Err(CompileError::Empty(ClauseMode::ColumnList).into());
        }
        if let Some(bad) = columns.iter().find(|c| !is_identifier(c)) {
            return Err(CompileError::InvalidColumnName((*bad).to_string()).into());
        }
        self.select(table, &columns.join(", "), condition)
            .map(|rows| rows.rows)
    }

    /// Names of the user tables.
    ///
    /// # Errors
    ///
    /// Returns the classified catalogue failure.
    pub fn table_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .stored_definitions()?
            .into_iter()
            .filter(|d| d.kind == "table")
            .map(|d| d.name)
            .collect())
    }

    /// Column names of `table` in declaration order.
    ///
    /// # Errors
    ///
    /// `TableNotFound` or `MalformedSchema`.
    pub fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        self.constraints(table).map(|schema| schema.columns)
    }

    /// Column and constraint metadata of `table`, read from its stored DDL.
    ///
    /// # Errors
    ///
    /// `TableNotFound` if the engine has no definition for the table,
    /// `MalformedSchema` if the definition cannot be read.
    pub fn constraints(&mut self, table: &str) -> Result<TableSchema> {
        let ddl = self
            .stored_definitions()?
            .into_iter()
            .find(|d| d.kind == "table" && d.name.eq_ignore_ascii_case(table))
            .and_then(|d| d.ddl)
            .ok_or_else(|| DomainError::TableNotFound {
                table: table.to_string(),
                database: self.name.clone(),
            })?;
        parse_create_table(&ddl).map_err(|e| DomainError::MalformedSchema {
            table: table.to_string(),
            reason: e.to_string(),
        })
    }

    /// Metadata of every user table.
    ///
    /// # Errors
    ///
    /// As [`Repository::constraints`].
    pub fn all_constraints(&mut self) -> Result<Vec<TableSchema>> {
        self.table_names()?
            .iter()
            .map(|table| self.constraints(table))
            .collect()
    }

    /// Commits pending work and releases the connection.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` if the repository was already closed.
    pub fn close(&mut self) -> Result<()> {
        self.engine
            .commit()
            .and_then(|()| self.engine.close())
            .map_err(|failure| self.classify_failure(&failure, "", "", &Params::new()))?;
        self.open = false;
        info!(database = %self.name, "Database closed");
        Ok(())
    }

    fn select(&mut self, table: &str, columns: &str, condition: &ColumnMap) -> Result<RowSet> {
        let filter = compile(condition, ClauseMode::PredicateList)?;
        let statement = if condition.is_empty() {
            format!("SELECT {columns} FROM {table}")
        } else {
            format!("SELECT {columns} FROM {table} WHERE {}", filter.sql)
        };
        debug!(sql = %statement, "Executing query");
        self.engine
            .execute(&statement, &filter.params)
            .map_err(|failure| self.classify_failure(&failure, table, &statement, &filter.params))
    }

    /// Executes a mutating statement and commits it.
    fn mutate(&mut self, table: &str, statement: &str, params: &Params) -> Result<()> {
        debug!(sql = %statement, "Executing statement");
        self.engine
            .execute(statement, params)
            .and_then(|_| self.engine.commit())
            .map_err(|failure| self.classify_failure(&failure, table, statement, params))
    }

    fn stored_definitions(&mut self) -> Result<Vec<StoredDefinition>> {
        self.engine
            .list_stored_definitions()
            .map_err(|failure| self.classify_failure(&failure, "", CATALOGUE, &Params::new()))
    }

    /// Gathers context for `failure` and classifies it.
    ///
    /// Lookups made here go straight to the engine; if they fail too, the
    /// context is simply absent.
    fn classify_failure(
        &mut self,
        failure: &EngineFailure,
        table: &str,
        statement: &str,
        params: &Params,
    ) -> DomainError {
        let schema = if failure.needs_schema() && !table.is_empty() {
            self.lookup_schema(table)
        } else {
            None
        };
        let tables = if failure.kind == FailureKind::Operational {
            self.lookup_table_names()
        } else {
            None
        };

        let ctx = FailureContext::new(&self.name, table, statement)
            .with_schema(schema.as_ref())
            .with_params(params)
            .with_existing_tables(tables.as_deref());
        let error = classify(failure, &ctx);
        debug!(raw = %failure, error = %error, "Engine failure classified");
        error
    }

    fn lookup_definitions(&mut self) -> Option<Vec<StoredDefinition>> {
        match self.engine.list_stored_definitions() {
            Ok(definitions) => Some(definitions),
            Err(e) => {
                warn!(error = %e, "Cannot read catalogue while classifying a failure");
                None
            }
        }
    }

    fn lookup_schema(&mut self, table: &str) -> Option<TableSchema> {
        let ddl = self
            .lookup_definitions()?
            .into_iter()
            .find(|d| d.kind == "table" && d.name.eq_ignore_ascii_case(table))?
            .ddl?;
        match parse_create_table(&ddl) {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!(table, error = %e, "Cannot parse stored definition while classifying a failure");
                None
            }
        }
    }

    fn lookup_table_names(&mut self) -> Option<Vec<String>> {
        Some(
            self.lookup_definitions()?
                .into_iter()
                .filter(|d| d.kind == "table")
                .map(|d| d.name)
                .collect(),
        )
    }
}

/// Reports an unbindable WHERE value under the caller's column name.
fn unprefix_where(err: DomainError, condition: &ColumnMap) -> DomainError {
    match err {
        DomainError::AdapterMissing {
            variable,
            value,
            table,
            database,
        } => {
            let column = variable
                .strip_prefix(WHERE_PREFIX)
                .filter(|column| condition.get(column).is_some())
                .map(str::to_string);
            DomainError::AdapterMissing {
                variable: column.unwrap_or(variable),
                value,
                table,
                database,
            }
        }
        other => other,
    }
}

impl<E: Engine> Drop for Repository<E> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        warn!(database = %self.name, "Repository dropped without close; closing now");
        if let Err(e) = self.engine.commit().and_then(|()| self.engine.close()) {
            warn!(database = %self.name, error = %e, "Closing on drop failed");
        }
    }
}
