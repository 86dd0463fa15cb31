//! Table definitions and recovery of schema metadata from stored DDL.
//!
//! SQLite keeps the text of every `CREATE TABLE` statement verbatim. The
//! parser here reads that text back into a [`TableSchema`]. It understands
//! the DDL that [`render_create_table`] produces (plus the table-level
//! `PRIMARY KEY (..)` / `UNIQUE (..)` forms) and is deliberately not a
//! general SQL grammar: it scans delimiters rather than tokens.

use thiserror::Error;

/// Errors raised while reading stored DDL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The text has no parenthesized column list.
    #[error("definition has no parenthesized column list: {0}")]
    MissingColumnList(String),

    /// The text does not start with `CREATE TABLE`.
    #[error("not a CREATE TABLE definition: {0}")]
    NotCreateTable(String),

    /// A column fragment was empty (e.g. a doubled comma).
    #[error("empty column definition at position {position} in: {ddl}")]
    EmptyColumn {
        /// Zero-based fragment index.
        position: usize,
        /// The full DDL text.
        ddl: String,
    },
}

/// Column and constraint metadata recovered from a table's DDL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Column names in declaration order.
    pub columns: Vec<String>,
    /// Columns under a UNIQUE or PRIMARY KEY constraint, in declaration order.
    pub unique: Vec<String>,
    /// Columns carrying a CHECK constraint, in declaration order.
    pub check: Vec<String>,
    /// The PRIMARY KEY subset of `unique`.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Returns true if the table declares `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Returns true if `column` is unique or part of the primary key.
    #[must_use]
    pub fn is_unique(&self, column: &str) -> bool {
        self.unique.iter().any(|c| c == column)
    }

    /// Returns true if `column` carries a CHECK constraint.
    #[must_use]
    pub fn is_checked(&self, column: &str) -> bool {
        self.check.iter().any(|c| c == column)
    }
}

/// Parses the stored `CREATE TABLE` text of a table.
///
/// # Errors
///
/// Returns a [`SchemaError`] if the text is not a parenthesized
/// `CREATE TABLE` definition or contains an empty column fragment.
pub fn parse_create_table(ddl: &str) -> Result<TableSchema, SchemaError> {
    let (open, close) = match (ddl.find('('), ddl.rfind(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(SchemaError::MissingColumnList(ddl.to_string())),
    };

    let name = table_name(&ddl[..open]).ok_or_else(|| SchemaError::NotCreateTable(ddl.to_string()))?;
    let mut schema = TableSchema {
        name,
        ..TableSchema::default()
    };

    for (position, fragment) in split_top_level(&ddl[open + 1..close]).into_iter().enumerate() {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(SchemaError::EmptyColumn {
                position,
                ddl: ddl.to_string(),
            });
        }
        let (head, rest) = split_first_token(fragment);
        if is_table_constraint(head) {
            apply_table_constraint(&mut schema, fragment);
            continue;
        }

        let column = unquote(head).to_string();
        let words = keywords(rest);
        let has = |word: &str| words.iter().any(|w| w == word);
        if words.windows(2).any(|pair| pair[0] == "primary" && pair[1] == "key") {
            push_unique(&mut schema.primary_key, &column);
            push_unique(&mut schema.unique, &column);
        }
        if has("unique") {
            push_unique(&mut schema.unique, &column);
        }
        if has("check") {
            push_unique(&mut schema.check, &column);
        }
        schema.columns.push(column);
    }

    Ok(schema)
}

/// Recovers the table name from the text before the column list.
fn table_name(prefix: &str) -> Option<String> {
    let prefix = prefix.trim();
    let lowered = prefix.to_ascii_lowercase();
    let start = lowered.find("create table")?;
    let mut rest = prefix[start + "create table".len()..].trim_start();
    if rest.to_ascii_lowercase().starts_with("if not exists") {
        rest = rest["if not exists".len()..].trim_start();
    }
    Some(unquote(rest.trim()).to_string())
}

/// Splits on commas that are outside parentheses and quotes.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '[' => quote = Some(']'),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&body[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&body[start..]);
    parts
}

fn split_first_token(fragment: &str) -> (&str, &str) {
    // A quoted name may contain spaces.
    if let Some(q) = fragment.chars().next().filter(|c| matches!(c, '"' | '`' | '[')) {
        let close = if q == '[' { ']' } else { q };
        if let Some(end) = fragment[1..].find(close) {
            let end = end + 2;
            return (&fragment[..end], &fragment[end..]);
        }
    }
    match fragment.find(|c: char| c.is_whitespace() || c == '(') {
        Some(i) => (&fragment[..i], &fragment[i..]),
        None => (fragment, ""),
    }
}

fn unquote(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if matches!((first, last), (b'"', b'"') | (b'`', b'`') | (b'[', b']')) {
            return &name[1..name.len() - 1];
        }
    }
    name
}

/// Replaces every quoted literal or identifier with a single space.
fn strip_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                out.push(' ');
            }
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '[' => quote = Some(']'),
                _ => out.push(c),
            },
        }
    }
    out
}

/// Lowercased bare words of a column's constraint text, quoted text excluded.
fn keywords(text: &str) -> Vec<String> {
    strip_quoted(text)
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Lowercases and collapses runs of whitespace to one space.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn is_table_constraint(head: &str) -> bool {
    ["primary", "unique", "check", "constraint", "foreign"]
        .iter()
        .any(|kw| head.eq_ignore_ascii_case(kw))
}

fn apply_table_constraint(schema: &mut TableSchema, fragment: &str) {
    let lowered = normalize(fragment);
    let is_primary = lowered.starts_with("primary key");
    if !is_primary && !lowered.starts_with("unique") {
        return;
    }
    let (Some(open), Some(close)) = (fragment.find('('), fragment.rfind(')')) else {
        return;
    };
    if open >= close {
        return;
    }
    for column in fragment[open + 1..close].split(',') {
        let column = unquote(column.trim()).to_string();
        if column.is_empty() {
            continue;
        }
        if is_primary {
            push_unique(&mut schema.primary_key, &column);
        }
        push_unique(&mut schema.unique, &column);
    }
}

fn push_unique(set: &mut Vec<String>, column: &str) {
    if !set.iter().any(|c| c == column) {
        set.push(column.to_string());
    }
}

/// A column definition for [`render_create_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type, e.g. `INTEGER` or `TEXT`.
    pub sql_type: String,
    /// PRIMARY KEY constraint.
    pub primary_key: bool,
    /// AUTOINCREMENT (only rendered with `primary_key`).
    pub autoincrement: bool,
    /// UNIQUE constraint.
    pub unique: bool,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// DEFAULT expression, rendered verbatim.
    pub default: Option<String>,
    /// CHECK expression, rendered verbatim inside parentheses.
    pub check: Option<String>,
}

impl ColumnDef {
    /// Creates a column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            autoincrement: false,
            unique: false,
            not_null: false,
            default: None,
            check: None,
        }
    }

    /// Marks the column as PRIMARY KEY.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Adds AUTOINCREMENT (implies PRIMARY KEY).
    #[must_use]
    pub const fn autoincrement(mut self) -> Self {
        self.primary_key = true;
        self.autoincrement = true;
        self
    }

    /// Adds a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds a NOT NULL constraint.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the DEFAULT expression.
    #[must_use]
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Adds a CHECK constraint.
    #[must_use]
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Renders the column definition, e.g. `count INTEGER NOT NULL CHECK(count>=0)`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if !self.sql_type.is_empty() {
            parts.push(self.sql_type.clone());
        }
        if self.primary_key {
            parts.push(String::from("PRIMARY KEY"));
            if self.autoincrement {
                parts.push(String::from("AUTOINCREMENT"));
            }
        }
        if self.not_null {
            parts.push(String::from("NOT NULL"));
        }
        if self.unique {
            parts.push(String::from("UNIQUE"));
        }
        if let Some(ref default) = self.default {
            parts.push(format!("DEFAULT {default}"));
        }
        if let Some(ref check) = self.check {
            parts.push(format!("CHECK({check})"));
        }
        parts.join(" ")
    }
}

/// Renders the parenthesized column list, e.g. `(id INTEGER PRIMARY KEY, name TEXT)`.
#[must_use]
pub fn render_column_list(columns: &[ColumnDef]) -> String {
    let defs: Vec<String> = columns.iter().map(ColumnDef::render).collect();
    format!("({})", defs.join(", "))
}

/// Renders a full `CREATE TABLE` statement.
#[must_use]
pub fn render_create_table(table: &str, columns: &[ColumnDef]) -> String {
    format!("CREATE TABLE {table} {}", render_column_list(columns))
}
