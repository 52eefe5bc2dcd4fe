//! Row delivery and string materialisation (§4.10, §6.3), grounded on the
//! teacher's `formatting.rs` table-printing routine but generalised from
//! "print to stdout" to "hand rows to a caller-supplied sink".

use crate::value::Value;

/// Bound applied to TEXT materialisation (§4.10: "bounded copy, cap
/// 10,000 bytes").
pub const MAX_TEXT_MATERIALIZE_LEN: usize = 10_000;

/// Renders one value as the row sink expects: `NULL` for null, `%lld` for
/// INTEGER, an approximated `%.6g` for REAL, and a length-capped lossy
/// UTF-8 string for TEXT (§4.10).
pub fn materialize(value: &Value) -> String {
    match value {
        Value::Text(bytes) => {
            let capped = &bytes[..bytes.len().min(MAX_TEXT_MATERIALIZE_LEN)];
            String::from_utf8_lossy(capped).into_owned()
        }
        other => other.to_string(),
    }
}

/// One delivered row: materialised column values alongside their names,
/// matching the `(n_cols, values, names)` shape of the C row sink
/// callback (§6.3) without the raw pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub names: Vec<String>,
    pub values: Vec<String>,
}

/// Anything that can receive rows as the executor produces them. A
/// `Vec<Row>` is the simplest sink (used by tests and by `db::query`'s
/// default collector); the shell (§6.1) implements its own sink that
/// prints each row instead of collecting it.
pub trait RowSink {
    fn accept(&mut self, names: &[String], values: &[Value]);
}

impl RowSink for Vec<Row> {
    fn accept(&mut self, names: &[String], values: &[Value]) {
        self.push(Row {
            names: names.to_vec(),
            values: values.iter().map(materialize).collect(),
        });
    }
}

#[test]
fn test_materialize_null_integer_real_text() {
    assert_eq!(materialize(&Value::Null), "NULL");
    assert_eq!(materialize(&Value::Integer(42)), "42");
    assert_eq!(materialize(&Value::Real(1.5)), "1.5");
    assert_eq!(materialize(&Value::Text(b"hi".to_vec())), "hi");
}

#[test]
fn test_materialize_text_caps_at_max_length() {
    let long = vec![b'x'; MAX_TEXT_MATERIALIZE_LEN + 50];
    let rendered = materialize(&Value::Text(long));
    assert_eq!(rendered.len(), MAX_TEXT_MATERIALIZE_LEN);
}

#[test]
fn test_vec_row_sink_collects_rows() {
    let mut sink: Vec<Row> = Vec::new();
    let names = vec!["id".to_string(), "name".to_string()];
    sink.accept(&names, &[Value::Integer(1), Value::Text(b"Alice".to_vec())]);
    sink.accept(&names, &[Value::Integer(2), Value::Text(b"Bob".to_vec())]);
    assert_eq!(sink.len(), 2);
    assert_eq!(sink[0].values, vec!["1", "Alice"]);
    assert_eq!(sink[1].values, vec!["2", "Bob"]);
}
