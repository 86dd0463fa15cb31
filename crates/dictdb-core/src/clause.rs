//! Compiles column/value mappings into parameterized SQL fragments.
//!
//! A [`ColumnMap`] is the dictionary-shaped request input: each column maps
//! either to a bare value (implicit equality) or to an explicit
//! `(Operator, Value)` pair. [`compile`] renders it in one of four
//! [`ClauseMode`]s. Only column names and operators ever reach the fragment
//! text; values travel separately as [`Params`].
//!
//! # Example
//!
//! ```rust
//! use dictdb_core::clause::{compile, ClauseMode, ColumnMap};
//!
//! let conditions = ColumnMap::new()
//!     .with("color", "G")
//!     .with_op("count", "!=", 0_i64)
//!     .unwrap();
//!
//! let clause = compile(&conditions, ClauseMode::PredicateList).unwrap();
//! assert_eq!(clause.sql, "color=:color AND NOT count=:count");
//! assert_eq!(clause.params.len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::value::{Params, ToValue, Value};

/// Errors raised while compiling a clause, before any engine interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The operator is not one of `== != < <= > >=`.
    #[error("{operator} is not a valid operator (column {column})")]
    UnknownOperator {
        /// Column the operator was attached to.
        column: String,
        /// The rejected operator text.
        operator: String,
    },

    /// An operator was given where only bare values are meaningful.
    #[error("operator {operator} not allowed on column {column} in a {mode} clause")]
    OperatorNotAllowed {
        /// Offending column.
        column: String,
        /// The operator that was supplied.
        operator: Operator,
        /// The clause mode being compiled.
        mode: ClauseMode,
    },

    /// Column names double as placeholder names and must be identifiers.
    #[error("invalid column name: {0:?}")]
    InvalidColumnName(String),

    /// A clause that must not be empty was given no columns.
    #[error("a {0} clause requires at least one column")]
    Empty(ClauseMode),
}

/// Comparison operators accepted in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Operator {
    /// Every accepted operator.
    pub const ALL: [Self; 6] = [Self::Eq, Self::Ne, Self::Lt, Self::Le, Self::Gt, Self::Ge];

    /// The textual form callers use.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Renders `column <op> rhs`.
    ///
    /// Inequality is written as a negated equality (`NOT col=rhs`) so that
    /// every predicate binds through the same `=` comparison path.
    fn render(self, column: &str, rhs: &str) -> String {
        match self {
            Self::Eq => format!("{column}={rhs}"),
            Self::Ne => format!("NOT {column}={rhs}"),
            Self::Lt => format!("{column}<{rhs}"),
            Self::Le => format!("{column}<={rhs}"),
            Self::Gt => format!("{column}>{rhs}"),
            Self::Ge => format!("{column}>={rhs}"),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// What a column is matched against.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Bare value, implicit equality.
    Value(Value),
    /// Explicit comparison.
    Compare(Operator, Value),
}

impl Condition {
    /// The value carried by this condition.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Value(v) | Self::Compare(_, v) => v,
        }
    }

    /// The explicit operator, if any.
    #[must_use]
    pub const fn operator(&self) -> Option<Operator> {
        match self {
            Self::Value(_) => None,
            Self::Compare(op, _) => Some(*op),
        }
    }

    /// Operator the predicate compiles with; bare values compare with `==`.
    const fn effective_operator(&self) -> Operator {
        match self {
            Self::Value(_) => Operator::Eq,
            Self::Compare(op, _) => *op,
        }
    }
}

/// A column name paired with its condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCondition {
    /// Column name.
    pub column: String,
    /// Value or comparison.
    pub condition: Condition,
}

/// Insertion-ordered column → condition mapping.
///
/// Inserting a column that is already present replaces its condition
/// without changing its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<ColumnCondition>,
}

impl ColumnMap {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets `column` to a bare value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl ToValue) {
        self.set(column.into(), Condition::Value(value.to_value()));
    }

    /// Sets `column` to an explicit comparison.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnknownOperator`] if `operator` is not one of
    /// `== != < <= > >=`; the mapping is left unchanged.
    pub fn insert_op(
        &mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<(), CompileError> {
        let column = column.into();
        let op = operator
            .parse::<Operator>()
            .map_err(|operator| CompileError::UnknownOperator {
                column: column.clone(),
                operator,
            })?;
        self.set(column, Condition::Compare(op, value.to_value()));
        Ok(())
    }

    /// Builder-style [`ColumnMap::insert`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl ToValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Builder-style [`ColumnMap::insert_op`].
    ///
    /// # Errors
    ///
    /// See [`ColumnMap::insert_op`].
    pub fn with_op(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToValue,
    ) -> Result<Self, CompileError> {
        self.insert_op(column, operator, value)?;
        Ok(self)
    }

    /// Sets `column` to an already-typed comparison.
    #[must_use]
    pub fn with_compare(mut self, column: impl Into<String>, op: Operator, value: impl ToValue) -> Self {
        self.set(column.into(), Condition::Compare(op, value.to_value()));
        self
    }

    fn set(&mut self, column: String, condition: Condition) {
        match self.entries.iter_mut().find(|e| e.column == column) {
            Some(entry) => entry.condition = condition,
            None => self.entries.push(ColumnCondition { column, condition }),
        }
    }

    /// Looks up the condition for `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Condition> {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .map(|e| &e.condition)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no columns are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnCondition> {
        self.entries.iter()
    }

    /// Column names in insertion order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.column.as_str()).collect()
    }

    /// The carried values keyed by column, without operators.
    ///
    /// This is the caller's original input, used to report the offending
    /// value of a failed binding.
    #[must_use]
    pub fn values(&self) -> Params {
        let mut params = Params::new();
        for entry in &self.entries {
            params.insert(entry.column.clone(), entry.condition.value().clone());
        }
        params
    }
}

/// The shape a [`ColumnMap`] is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseMode {
    /// `a, b` paired with `:a, :b` for INSERT.
    ColumnList,
    /// `a=:a, b=:b` for UPDATE SET.
    AssignmentList,
    /// `a=:a AND NOT b=:b` for WHERE.
    PredicateList,
    /// `a='x' AND b<3`, values inlined. Never executed.
    LiteralPredicateList,
}

impl fmt::Display for ClauseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ColumnList => "column list",
            Self::AssignmentList => "assignment",
            Self::PredicateList => "predicate",
            Self::LiteralPredicateList => "literal predicate",
        };
        f.write_str(name)
    }
}

/// A rendered fragment and the bindings that must accompany it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledClause {
    /// The fragment. For [`ClauseMode::ColumnList`] this is the column list.
    pub sql: String,
    /// Placeholder list paired with `sql`, only for [`ClauseMode::ColumnList`].
    pub placeholders: Option<String>,
    /// Values bound to every placeholder in the fragment.
    pub params: Params,
}

/// Compiles `columns` in the given mode.
///
/// An empty mapping yields an empty fragment; callers decide whether a
/// clause-less statement is acceptable.
///
/// # Errors
///
/// Returns a [`CompileError`] if a column name is not an identifier or an
/// operator is supplied to a mode that only accepts bare values.
pub fn compile(columns: &ColumnMap, mode: ClauseMode) -> Result<CompiledClause, CompileError> {
    compile_prefixed(columns, mode, "")
}

/// Like [`compile`] but names every placeholder `:{prefix}{column}`.
///
/// Lets two clauses of one statement (UPDATE's SET and WHERE) mention the
/// same column without their bindings colliding.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_prefixed(
    columns: &ColumnMap,
    mode: ClauseMode,
    prefix: &str,
) -> Result<CompiledClause, CompileError> {
    let mut names = Vec::with_capacity(columns.len());
    let mut pieces = Vec::with_capacity(columns.len());
    let mut params = Params::new();

    for entry in columns.iter() {
        let column = entry.column.as_str();
        if !is_identifier(column) {
            return Err(CompileError::InvalidColumnName(column.to_string()));
        }
        let placeholder = format!("{prefix}{column}");

        match mode {
            ClauseMode::ColumnList | ClauseMode::AssignmentList => {
                if let Some(operator) = entry.condition.operator() {
                    return Err(CompileError::OperatorNotAllowed {
                        column: column.to_string(),
                        operator,
                        mode,
                    });
                }
                if mode == ClauseMode::ColumnList {
                    names.push(column.to_string());
                    pieces.push(format!(":{placeholder}"));
                } else {
                    pieces.push(format!("{column}=:{placeholder}"));
                }
            }
            ClauseMode::PredicateList => {
                let op = entry.condition.effective_operator();
                pieces.push(op.render(column, &format!(":{placeholder}")));
            }
            ClauseMode::LiteralPredicateList => {
                let op = entry.condition.effective_operator();
                pieces.push(op.render(column, &entry.condition.value().to_sql_literal()));
                continue;
            }
        }
        params.insert(placeholder, entry.condition.value().clone());
    }

    let clause = match mode {
        ClauseMode::ColumnList => CompiledClause {
            sql: names.join(", "),
            placeholders: Some(pieces.join(", ")),
            params,
        },
        ClauseMode::AssignmentList => CompiledClause {
            sql: pieces.join(", "),
            placeholders: None,
            params,
        },
        ClauseMode::PredicateList | ClauseMode::LiteralPredicateList => CompiledClause {
            sql: pieces.join(" AND "),
            placeholders: None,
            params,
        },
    };
    Ok(clause)
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mtg_row() -> ColumnMap {
        ColumnMap::new()
            .with("Name", "Test")
            .with("Number", 9_i64)
            .with("Count", 20_i64)
    }

    fn mtg_predicates() -> ColumnMap {
        ColumnMap::new()
            .with_op("Name", "!=", "Test")
            .and_then(|m| m.with_op("Number", "==", 9_i64))
            .and_then(|m| m.with_op("Count", "<", 20_i64))
            .unwrap()
    }

    #[test]
    fn test_column_list() {
        let clause = compile(&mtg_row(), ClauseMode::ColumnList).unwrap();
        assert_eq!(clause.sql, "Name, Number, Count");
        assert_eq!(clause.placeholders.as_deref(), Some(":Name, :Number, :Count"));
        assert_eq!(clause.params.len(), 3);
    }

    #[test]
    fn test_column_list_counts_and_order_match() {
        let clause = compile(&mtg_row(), ClauseMode::ColumnList).unwrap();
        let columns: Vec<&str> = clause.sql.split(", ").collect();
        let placeholders: Vec<&str> = clause
            .placeholders
            .as_deref()
            .unwrap()
            .split(", ")
            .collect();
        assert_eq!(columns.len(), placeholders.len());
        for (column, placeholder) in columns.iter().zip(&placeholders) {
            assert_eq!(format!(":{column}"), *placeholder);
        }
        let bound: Vec<&str> = clause.params.iter().map(|(k, _)| k).collect();
        assert_eq!(bound, columns);
    }

    #[test]
    fn test_assignment_list() {
        let clause = compile(&mtg_row(), ClauseMode::AssignmentList).unwrap();
        assert_eq!(clause.sql, "Name=:Name, Number=:Number, Count=:Count");
        assert_eq!(clause.placeholders, None);
    }

    #[test]
    fn test_assignment_rejects_operator() {
        let err = compile(&mtg_predicates(), ClauseMode::AssignmentList).unwrap_err();
        assert!(matches!(
            err,
            CompileError::OperatorNotAllowed { ref column, operator: Operator::Ne, .. } if column == "Name"
        ));
    }

    #[test]
    fn test_predicate_list_operators() {
        let clause = compile(&mtg_predicates(), ClauseMode::PredicateList).unwrap();
        assert_eq!(
            clause.sql,
            "NOT Name=:Name AND Number=:Number AND Count<:Count"
        );
        assert_eq!(clause.params.get("Name"), Some(&Value::Text(String::from("Test"))));
        assert_eq!(clause.params.get("Count"), Some(&Value::Integer(20)));
    }

    #[test]
    fn test_predicate_not_equal_rewrite() {
        let conditions = ColumnMap::new().with_op("count", "!=", 5_i64).unwrap();
        let clause = compile(&conditions, ClauseMode::PredicateList).unwrap();
        assert!(clause.sql.contains("NOT count=:count"));
    }

    #[test]
    fn test_bare_value_equals_explicit_eq() {
        let bare = compile(&ColumnMap::new().with("id", 3_i64), ClauseMode::PredicateList).unwrap();
        let explicit = compile(
            &ColumnMap::new().with_op("id", "==", 3_i64).unwrap(),
            ClauseMode::PredicateList,
        )
        .unwrap();
        assert_eq!(bare, explicit);
        assert_eq!(bare.sql, "id=:id");
    }

    #[test]
    fn test_all_comparison_operators() {
        let conditions = ColumnMap::new()
            .with_compare("a", Operator::Lt, 1_i64)
            .with_compare("b", Operator::Le, 1_i64)
            .with_compare("c", Operator::Gt, 1_i64)
            .with_compare("d", Operator::Ge, 1_i64);
        let clause = compile(&conditions, ClauseMode::PredicateList).unwrap();
        assert_eq!(clause.sql, "a<:a AND b<=:b AND c>:c AND d>=:d");
    }

    #[test]
    fn test_unknown_operator_rejected_at_construction() {
        let err = ColumnMap::new().with_op("count", "<>", 5_i64).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownOperator {
                column: String::from("count"),
                operator: String::from("<>"),
            }
        );
        assert!("=".parse::<Operator>().is_err());
        assert!("LIKE".parse::<Operator>().is_err());
    }

    #[test]
    fn test_literal_predicate_list() {
        let sql = compile(&mtg_predicates(), ClauseMode::LiteralPredicateList)
            .unwrap()
            .sql;
        assert_eq!(sql, "NOT Name='Test' AND Number=9 AND Count<20");
    }

    #[test]
    fn test_literal_predicate_has_no_bindings() {
        let clause = compile(&mtg_row(), ClauseMode::LiteralPredicateList).unwrap();
        assert!(clause.params.is_empty());
        assert_eq!(clause.sql, "Name='Test' AND Number=9 AND Count=20");
    }

    #[test]
    fn test_values_never_in_fragment() {
        let malicious = "'; DROP TABLE users; --";
        let conditions = ColumnMap::new().with("name", malicious);
        for mode in [
            ClauseMode::ColumnList,
            ClauseMode::AssignmentList,
            ClauseMode::PredicateList,
        ] {
            let clause = compile(&conditions, mode).unwrap();
            assert!(!clause.sql.contains("DROP"));
            assert!(!clause.placeholders.unwrap_or_default().contains("DROP"));
            assert_eq!(clause.params.get("name"), Some(&malicious.to_value()));
        }
    }

    #[test]
    fn test_empty_mapping_yields_empty_fragment() {
        for mode in [
            ClauseMode::AssignmentList,
            ClauseMode::PredicateList,
            ClauseMode::LiteralPredicateList,
        ] {
            let clause = compile(&ColumnMap::new(), mode).unwrap();
            assert_eq!(clause.sql, "");
            assert!(clause.params.is_empty());
        }
        let columns = compile(&ColumnMap::new(), ClauseMode::ColumnList).unwrap();
        assert_eq!(columns.placeholders.as_deref(), Some(""));
    }

    #[test]
    fn test_prefixed_placeholders() {
        let conditions = ColumnMap::new().with("ID", 3_i64);
        let clause = compile_prefixed(&conditions, ClauseMode::PredicateList, "where_").unwrap();
        assert_eq!(clause.sql, "ID=:where_ID");
        assert_eq!(clause.params.get("where_ID"), Some(&Value::Integer(3)));
        assert_eq!(clause.params.get("ID"), None);
    }

    #[test]
    fn test_invalid_column_name() {
        let conditions = ColumnMap::new().with("name; DROP", 1_i64);
        assert_eq!(
            compile(&conditions, ClauseMode::PredicateList).unwrap_err(),
            CompileError::InvalidColumnName(String::from("name; DROP"))
        );
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut conditions = mtg_row();
        conditions.insert("Name", "Other");
        assert_eq!(conditions.columns(), vec!["Name", "Number", "Count"]);
        assert_eq!(
            conditions.get("Name"),
            Some(&Condition::Value(Value::Text(String::from("Other"))))
        );
    }

    #[test]
    fn test_input_not_mutated() {
        let conditions = mtg_predicates();
        let before = conditions.clone();
        let _ = compile(&conditions, ClauseMode::PredicateList).unwrap();
        assert_eq!(conditions, before);
        assert_eq!(conditions.values().get("Count"), Some(&Value::Integer(20)));
    }
}
