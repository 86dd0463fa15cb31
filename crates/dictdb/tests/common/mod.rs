#![allow(dead_code)]

use dictdb::{
    ColumnDef, ColumnMap, Engine, EngineFailure, Params, Repository, RowSet, SqliteEngine,
    StoredDefinition,
};

pub const MTG: &str = "MTG";

/// Routes log output through the test harness; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn mtg_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", "INTEGER").primary_key(),
        ColumnDef::new("name", "TEXT").unique(),
        ColumnDef::new("count", "INTEGER").check("count >= 0"),
    ]
}

pub fn card(id: i64, name: &str, count: i64) -> ColumnMap {
    ColumnMap::new()
        .with("id", id)
        .with("name", name)
        .with("count", count)
}

/// An in-memory repository holding the MTG table.
pub fn mtg_repo() -> Repository {
    let mut db = Repository::in_memory().unwrap_or_else(|e| panic!("open failed: {e}"));
    db.create_table(MTG, &mtg_columns())
        .unwrap_or_else(|e| panic!("create failed: {e}"));
    db
}

/// MTG repository seeded with Plains(5), Island(3), Swamp(0).
pub fn seeded_repo() -> Repository {
    let mut db = mtg_repo();
    for row in [card(1, "Plains", 5), card(2, "Island", 3), card(3, "Swamp", 0)] {
        db.insert_row(MTG, &row)
            .unwrap_or_else(|e| panic!("insert failed: {e}"));
    }
    db
}

/// Names of the rows returned by `SELECT *` on MTG.
pub fn names(rows: &[Vec<dictdb::Value>]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(1).and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

/// Wraps an engine and counts the statements it is asked to execute.
pub struct CountingEngine<E> {
    pub inner: E,
    pub executed: Vec<String>,
}

impl CountingEngine<SqliteEngine> {
    pub fn in_memory() -> Self {
        Self {
            inner: SqliteEngine::in_memory().unwrap_or_else(|e| panic!("open failed: {e}")),
            executed: Vec::new(),
        }
    }
}

impl<E: Engine> Engine for CountingEngine<E> {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<RowSet, EngineFailure> {
        self.executed.push(sql.to_string());
        self.inner.execute(sql, params)
    }

    fn commit(&mut self) -> Result<(), EngineFailure> {
        self.inner.commit()
    }

    fn close(&mut self) -> Result<(), EngineFailure> {
        self.inner.close()
    }

    fn list_stored_definitions(&mut self) -> Result<Vec<StoredDefinition>, EngineFailure> {
        self.inner.list_stored_definitions()
    }
}
