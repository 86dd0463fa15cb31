//! Named placeholder rewriting.
//!
//! sqlx binds SQLite parameters by position (`?N`), while statements built
//! by the clause compiler use `:name` placeholders. [`to_positional`]
//! rewrites one into the other and lines the bound values up with the
//! positions.

use dictdb_core::{EngineFailure, FailureKind, Params, Value};

/// A statement rewritten to positional placeholders.
#[derive(Debug)]
pub(crate) struct Positional<'p> {
    /// The statement with every `:name` replaced by `?N`.
    pub sql: String,
    /// `(name, value)` for position `N = index + 1`.
    pub bindings: Vec<(&'p str, &'p Value)>,
}

/// Rewrites `:name` placeholders outside quoted text into `?N`.
///
/// Positions are numbered by first appearance; a repeated name reuses its
/// position.
pub(crate) fn to_positional<'p>(
    sql: &str,
    params: &'p Params,
) -> Result<Positional<'p>, EngineFailure> {
    let mut out = String::with_capacity(sql.len());
    let mut bindings: Vec<(&'p str, &'p Value)> = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '[' => {
                quote = Some(']');
                out.push(c);
            }
            ':' if chars
                .peek()
                .is_some_and(|(_, next)| next.is_ascii_alphabetic() || *next == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, next)) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                let name = &sql[start..end];
                let position = match bindings.iter().position(|(bound, _)| *bound == name) {
                    Some(index) => index + 1,
                    None => {
                        let (key, value) = params
                            .iter()
                            .find(|(key, _)| *key == name)
                            .ok_or_else(|| {
                                EngineFailure::new(
                                    FailureKind::Interface,
                                    format!(
                                        "You did not supply a value for binding parameter :{name}."
                                    ),
                                )
                            })?;
                        bindings.push((key, value));
                        bindings.len()
                    }
                };
                out.push('?');
                out.push_str(&position.to_string());
            }
            _ => out.push(c),
        }
    }

    Ok(Positional { sql: out, bindings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_in_first_appearance_order() {
        let params = Params::new().with("a", 1_i64).with("b", 2_i64);
        let positional = to_positional("UPDATE t SET b=:b WHERE a=:a", &params).unwrap();
        assert_eq!(positional.sql, "UPDATE t SET b=?1 WHERE a=?2");
        let names: Vec<&str> = positional.bindings.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_repeated_name_shares_position() {
        let params = Params::new().with("x", 1_i64);
        let positional = to_positional("SELECT * FROM t WHERE x=:x OR y=:x", &params).unwrap();
        assert_eq!(positional.sql, "SELECT * FROM t WHERE x=?1 OR y=?1");
        assert_eq!(positional.bindings.len(), 1);
    }

    #[test]
    fn test_quoted_text_untouched() {
        let params = Params::new().with("a", 1_i64);
        let positional =
            to_positional("SELECT ':b', \":c\" FROM t WHERE a=:a", &params).unwrap();
        assert_eq!(positional.sql, "SELECT ':b', \":c\" FROM t WHERE a=?1");
    }

    #[test]
    fn test_unused_params_are_ignored() {
        let params = Params::new().with("a", 1_i64).with("unused", 2_i64);
        let positional = to_positional("DELETE FROM t WHERE a=:a", &params).unwrap();
        assert_eq!(positional.bindings.len(), 1);
    }

    #[test]
    fn test_missing_binding() {
        let err = to_positional("DELETE FROM t WHERE a=:a", &Params::new()).unwrap_err();
        assert_eq!(err.kind, FailureKind::Interface);
        assert_eq!(
            err.message,
            "You did not supply a value for binding parameter :a."
        );
    }

    #[test]
    fn test_colon_not_followed_by_name() {
        let params = Params::new();
        let positional = to_positional("SELECT time('12:00')", &params).unwrap();
        assert_eq!(positional.sql, "SELECT time('12:00')");
        let positional = to_positional("SELECT 1 :", &params).unwrap();
        assert_eq!(positional.sql, "SELECT 1 :");
    }
}
