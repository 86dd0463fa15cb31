//! Tables created through the repository read back as the same metadata.

mod common;

use common::{mtg_columns, mtg_repo, MTG};
use dictdb::{ColumnDef, DomainError, Repository, TableSchema};
use pretty_assertions::assert_eq;

fn expected(table: &str, defs: &[ColumnDef]) -> TableSchema {
    let names = |keep: fn(&ColumnDef) -> bool| {
        defs.iter()
            .filter(|d| keep(d))
            .map(|d| d.name.clone())
            .collect::<Vec<_>>()
    };
    TableSchema {
        name: table.to_string(),
        columns: names(|_| true),
        unique: names(|d| d.unique || d.primary_key),
        check: names(|d| d.check.is_some()),
        primary_key: names(|d| d.primary_key),
    }
}

#[test]
fn test_mtg_constraints() {
    let mut db = mtg_repo();
    let schema = db.constraints(MTG).unwrap();
    assert_eq!(schema, expected(MTG, &mtg_columns()));
    assert_eq!(schema.unique, vec!["id", "name"]);
    assert_eq!(schema.check, vec!["count"]);
}

#[test]
fn test_round_trip_keeps_order_and_annotations() {
    let defs = vec![
        ColumnDef::new("seq", "INTEGER").autoincrement(),
        ColumnDef::new("email", "TEXT").not_null().unique(),
        ColumnDef::new("age", "INTEGER").check("age BETWEEN 0 AND 150"),
        ColumnDef::new("nickname", "TEXT").default("'anon'"),
        ColumnDef::new("score", "REAL")
            .not_null()
            .default("0.0")
            .check("score >= 0"),
    ];
    let mut db = Repository::in_memory().unwrap();
    db.create_table("people", &defs).unwrap();

    assert_eq!(db.constraints("people").unwrap(), expected("people", &defs));
    assert_eq!(
        db.column_names("people").unwrap(),
        vec!["seq", "email", "age", "nickname", "score"]
    );
    // AUTOINCREMENT creates an engine-internal bookkeeping table.
    assert_eq!(db.table_names().unwrap(), vec!["people"]);
}

#[test]
fn test_keyword_bearing_literals_round_trip() {
    let defs = vec![
        ColumnDef::new("id", "INTEGER").primary_key(),
        ColumnDef::new("status", "TEXT").default("'unique'"),
        ColumnDef::new("mode", "TEXT").default("'check'"),
        ColumnDef::new("label", "TEXT").check("label <> 'primary key, unique'"),
    ];
    let mut db = Repository::in_memory().unwrap();
    db.create_table("t", &defs).unwrap();

    let schema = db.constraints("t").unwrap();
    assert_eq!(schema, expected("t", &defs));
    assert_eq!(schema.unique, vec!["id"]);
    assert_eq!(schema.check, vec!["label"]);
}

#[test]
fn test_table_level_constraints() {
    let mut db = Repository::in_memory().unwrap();
    db.create_table_sql(
        "pairs",
        "(a INTEGER, b INTEGER, label TEXT, PRIMARY KEY (a, b), UNIQUE (label), CHECK (a < b))",
    )
    .unwrap();
    let schema = db.constraints("pairs").unwrap();
    assert_eq!(schema.columns, vec!["a", "b", "label"]);
    assert_eq!(schema.primary_key, vec!["a", "b"]);
    assert_eq!(schema.unique, vec!["a", "b", "label"]);
}

#[test]
fn test_all_constraints_and_drop() {
    let mut db = mtg_repo();
    db.create_table("decks", &[ColumnDef::new("id", "INTEGER").primary_key()])
        .unwrap();
    let mut names: Vec<String> = db
        .all_constraints()
        .unwrap()
        .into_iter()
        .map(|schema| schema.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["MTG", "decks"]);

    db.drop_table("decks").unwrap();
    db.drop_table("decks").unwrap();
    assert_eq!(db.table_names().unwrap(), vec![MTG]);
    assert!(matches!(
        db.constraints("decks"),
        Err(DomainError::TableNotFound { .. })
    ));
}
