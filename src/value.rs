//! The shared value type (§3.1), a tagged union over `NULL | INTEGER | REAL
//! | TEXT`, used by both engines' codecs and by the planner/executor.

use std::fmt;

/// A column's declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Engine B's schema sub-parser (§4.8) never emits this; it exists so
    /// `ColumnType` can model Engine A's "NULLABLE" descriptor variant
    /// from §3.2 without a separate enum.
    Nullable,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Nullable => "NULL",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ColumnType {
    type Err = ParseColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Ok(ColumnType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Ok(ColumnType::Real),
            "TEXT" | "VARCHAR" => Ok(ColumnType::Text),
            "NULL" => Ok(ColumnType::Nullable),
            other => Err(ParseColumnTypeError(other.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized column type: {0}")]
pub struct ParseColumnTypeError(pub String);

/// A runtime value, owned. The TEXT variant owns its bytes, per §9's
/// "manually managed variant values" re-architecture note: no
/// `value_destroy`-after-use discipline survives here, cloning is explicit
/// `Clone`, destruction is by scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    /// Owned bytes, not required to be valid UTF-8 (the source's TEXT is an
    /// arbitrary byte slice), capped at 255 bytes per §3.1.
    Text(Vec<u8>),
}

impl Value {
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Real(_) => Some(ColumnType::Real),
            Value::Text(_) => Some(ColumnType::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Used by the index path and by planner identifier resolution: the
    /// primary index key is always the first INTEGER column (§3.3).
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            Value::Text(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Materialises a value as the row sink expects (§4.10):
    /// `NULL` -> `"NULL"`, INTEGER -> `%lld`, REAL -> `%.6g`-equivalent,
    /// TEXT -> the bytes, lossily, as UTF-8.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", format_real(*r)),
            Value::Text(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        }
    }
}

/// Approximates C's `%.6g`: up to 6 significant digits, trailing zeros and
/// a trailing decimal point trimmed.
fn format_real(r: f64) -> String {
    if r == r.trunc() && r.abs() < 1e15 {
        return format!("{}", r as i64);
    }
    let s = format!("{:.6e}", r);
    // Re-render via a fixed-precision pass and strip trailing zeros, which
    // is close enough to %.6g for the row strings this crate produces.
    let mut out = format!("{:.6}", r);
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    let _ = s;
    out
}

#[test]
fn test_value_display_null_integer_real_text() {
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::Integer(42).to_string(), "42");
    assert_eq!(Value::Integer(-7).to_string(), "-7");
    assert_eq!(Value::Real(95.5).to_string(), "95.5");
    assert_eq!(Value::Text(b"Alice".to_vec()).to_string(), "Alice");
}

#[test]
fn test_column_type_from_str() {
    use std::str::FromStr;
    assert_eq!(ColumnType::from_str("integer").unwrap(), ColumnType::Integer);
    assert_eq!(ColumnType::from_str("INT").unwrap(), ColumnType::Integer);
    assert_eq!(ColumnType::from_str("Real").unwrap(), ColumnType::Real);
    assert_eq!(ColumnType::from_str("DOUBLE").unwrap(), ColumnType::Real);
    assert_eq!(ColumnType::from_str("varchar").unwrap(), ColumnType::Text);
    assert!(ColumnType::from_str("BLOB").is_err());
}

#[test]
fn test_value_as_integer_and_text() {
    assert_eq!(Value::Integer(5).as_integer(), Some(5));
    assert_eq!(Value::Real(5.0).as_integer(), None);
    assert_eq!(Value::Text(b"hi".to_vec()).as_text(), Some(&b"hi"[..]));
}
