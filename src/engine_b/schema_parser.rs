//! Engine B's schema sub-parser (§4.8): a small, separate parser used only
//! by `table_create`, accepting `name TYPE` / `name TEXT(n)` pairs inside
//! a parenthesised, comma-separated list.

use crate::value::ColumnType;

use super::header::{ColumnDescriptor, MAX_COLUMNS, MAX_COLUMN_NAME};

const DEFAULT_TEXT_LENGTH: u8 = 64;
const MIN_TEXT_LENGTH: u16 = 1;
const MAX_TEXT_LENGTH: u16 = 255;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("schema must contain a parenthesised column list")]
    MissingParens,
    #[error("schema declares no columns")]
    NoColumns,
    #[error("schema declares {0} columns, maximum is {}", MAX_COLUMNS)]
    TooManyColumns(usize),
    #[error("malformed column declaration: {0}")]
    MalformedColumn(String),
    #[error("unknown column type: {0}")]
    UnknownType(String),
    #[error("invalid TEXT length: {0}")]
    InvalidTextLength(String),
}

/// Parses a schema string like `"CREATE TABLE t (ts INTEGER, ip TEXT(16))"`
/// (only the parenthesised part is consulted) into column descriptors with
/// offsets assigned in declaration order, and the total row size.
pub fn parse_schema(schema_sql: &str) -> Result<(Vec<ColumnDescriptor>, u32), Error> {
    let open = schema_sql.find('(').ok_or(Error::MissingParens)?;
    let close = schema_sql.rfind(')').ok_or(Error::MissingParens)?;
    if close <= open {
        return Err(Error::MissingParens);
    }
    let body = &schema_sql[open + 1..close];

    let mut columns = Vec::new();
    let mut offset: u16 = 0;
    for raw_col in body.split(',') {
        let col_text = raw_col.trim();
        if col_text.is_empty() {
            continue;
        }
        let (name, col_type, length) = parse_column(col_text)?;
        let mut name = name.to_string();
        if name.len() > MAX_COLUMN_NAME - 1 {
            name.truncate(MAX_COLUMN_NAME - 1);
        }
        columns.push(ColumnDescriptor {
            name,
            col_type,
            length,
            offset,
        });
        offset += length as u16;
    }

    if columns.is_empty() {
        return Err(Error::NoColumns);
    }
    if columns.len() > MAX_COLUMNS {
        return Err(Error::TooManyColumns(columns.len()));
    }

    Ok((columns, offset as u32))
}

fn parse_column(col_text: &str) -> Result<(&str, ColumnType, u8), Error> {
    let mut parts = col_text.splitn(2, char::is_whitespace);
    let name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::MalformedColumn(col_text.to_string()))?;
    let type_part = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::MalformedColumn(col_text.to_string()))?;

    let (type_name, arg) = match type_part.find('(') {
        Some(paren) => {
            let close = type_part
                .find(')')
                .ok_or_else(|| Error::MalformedColumn(col_text.to_string()))?;
            (&type_part[..paren], Some(type_part[paren + 1..close].trim()))
        }
        None => (type_part, None),
    };

    match type_name.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT" => Ok((name, ColumnType::Integer, 8)),
        "REAL" | "FLOAT" | "DOUBLE" => Ok((name, ColumnType::Real, 8)),
        "TEXT" | "VARCHAR" => {
            let length: u8 = match arg {
                None => DEFAULT_TEXT_LENGTH,
                Some(n) => {
                    let parsed: u16 = n
                        .parse()
                        .map_err(|_| Error::InvalidTextLength(n.to_string()))?;
                    parsed.clamp(MIN_TEXT_LENGTH, MAX_TEXT_LENGTH) as u8
                }
            };
            Ok((name, ColumnType::Text, length))
        }
        other => Err(Error::UnknownType(other.to_string())),
    }
}

#[test]
fn test_parse_basic_schema() {
    let (cols, row_size) = parse_schema("CREATE TABLE t (id INTEGER, name TEXT(16))").unwrap();
    assert_eq!(cols.len(), 2);
    assert_eq!(cols[0].name, "id");
    assert_eq!(cols[0].length, 8);
    assert_eq!(cols[0].offset, 0);
    assert_eq!(cols[1].name, "name");
    assert_eq!(cols[1].length, 16);
    assert_eq!(cols[1].offset, 8);
    assert_eq!(row_size, 24);
}

#[test]
fn test_text_default_length_is_64() {
    let (cols, _) = parse_schema("(a TEXT)").unwrap();
    assert_eq!(cols[0].length, 64);
}

#[test]
fn test_text_length_clamped_to_255() {
    let (cols, _) = parse_schema("(a TEXT(1000))").unwrap();
    assert_eq!(cols[0].length, 255);
}

#[test]
fn test_name_truncated_to_seven_bytes() {
    let (cols, _) = parse_schema("(averylongcolumnname INTEGER)").unwrap();
    assert_eq!(cols[0].name, "averylo");
}

#[test]
fn test_fourteen_columns_ok_fifteen_fails() {
    let fourteen = (0..14).map(|i| format!("c{} INTEGER", i)).collect::<Vec<_>>().join(", ");
    assert!(parse_schema(&format!("({})", fourteen)).is_ok());

    let fifteen = (0..15).map(|i| format!("c{} INTEGER", i)).collect::<Vec<_>>().join(", ");
    let err = parse_schema(&format!("({})", fifteen)).unwrap_err();
    assert!(matches!(err, Error::TooManyColumns(15)));
}

#[test]
fn test_zero_columns_rejected() {
    assert!(matches!(parse_schema("()"), Err(Error::NoColumns)));
}

#[test]
fn test_unknown_type_rejected() {
    assert!(matches!(parse_schema("(a BLOB)"), Err(Error::UnknownType(_))));
}
