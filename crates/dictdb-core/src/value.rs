//! Values and bound parameters.
//!
//! Caller data never reaches statement text directly: it travels as a
//! [`Value`] inside [`Params`] and is bound by the engine at execution time.

use std::fmt;

use serde::Serialize;

/// A value that can be bound to a named placeholder or returned in a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value. SQLite stores it as an integer.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// A composite value.
    ///
    /// No SQLite storage class can hold a list, so binding one fails with an
    /// adapter error. It exists so that such caller input can be reported
    /// back verbatim.
    List(Vec<Value>),
}

impl Value {
    /// Returns true for values rendered as quoted SQL string literals.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns the value as an inline SQL literal.
    ///
    /// **Warning**: only for diagnostic rendering. Statements sent to the
    /// engine always bind values through placeholders.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Integer(n) => format!("{n}"),
            Self::Real(f) => format!("{f}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(Self::to_sql_literal).collect();
                format!("({})", rendered.join(", "))
            }
        }
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

/// Trait for types that can be converted to a [`Value`].
pub trait ToValue {
    /// Converts into a `Value`.
    fn to_value(self) -> Value;
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl ToValue for bool {
    fn to_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ToValue for i64 {
    fn to_value(self) -> Value {
        Value::Integer(self)
    }
}

impl ToValue for i32 {
    fn to_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl ToValue for u32 {
    fn to_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl ToValue for f64 {
    fn to_value(self) -> Value {
        Value::Real(self)
    }
}

impl ToValue for String {
    fn to_value(self) -> Value {
        Value::Text(self)
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Text(String::from(self))
    }
}

impl ToValue for Vec<u8> {
    fn to_value(self) -> Value {
        Value::Blob(self)
    }
}

impl ToValue for &[u8] {
    fn to_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

/// Named parameter bindings in insertion order.
///
/// Keys are placeholder names without the leading `:`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    /// Creates an empty binding set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Binds `name`, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToValue) {
        let name = name.into();
        let value = value.to_value();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`Params::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a binding by placeholder name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    /// Appends every binding of `other`, replacing duplicates.
    pub fn extend(&mut self, other: Self) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_text_escaping() {
        assert_eq!(Value::Text(String::from("O'Brien")).to_sql_literal(), "'O''Brien'");
        let malicious = "'; DROP TABLE users; --";
        assert_eq!(
            malicious.to_value().to_sql_literal(),
            "'''; DROP TABLE users; --'"
        );
    }

    #[test]
    fn test_literal_non_text() {
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Bool(true).to_sql_literal(), "1");
        assert_eq!(Value::Integer(-7).to_sql_literal(), "-7");
        assert_eq!(Value::Real(2.5).to_sql_literal(), "2.5");
        assert_eq!(Value::Blob(vec![0x48, 0x49]).to_sql_literal(), "X'4849'");
        assert_eq!(
            Value::List(vec![Value::Integer(1), "a".to_value()]).to_sql_literal(),
            "(1, 'a')"
        );
    }

    #[test]
    fn test_to_value_conversions() {
        assert_eq!(42_i32.to_value(), Value::Integer(42));
        assert_eq!(None::<i64>.to_value(), Value::Null);
        assert_eq!(Some("x").to_value(), Value::Text(String::from("x")));
        assert!("x".to_value().is_textual());
        assert!(!5_i64.to_value().is_textual());
    }

    #[test]
    fn test_params_insert_replaces_in_place() {
        let mut params = Params::new().with("a", 1_i64).with("b", 2_i64);
        params.insert("a", 10_i64);

        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&Value::Integer(10)));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let row = vec![Value::Integer(1), "Plains".to_value(), Value::Null];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,"Plains",null]"#);
    }
}
