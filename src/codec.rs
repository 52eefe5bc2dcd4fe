//! The row codec shared between Engine A and Engine B (§4.1): given a
//! column layout and a slice of values in column order, pack into a byte
//! buffer of exactly `row_size`; the inverse operation unpacks a byte
//! buffer back into a value list.
//!
//! Both engines store integers and floats little-endian (an Open Question
//! in §9 resolved in favor of portability — see `DESIGN.md`), via
//! `byteorder`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::value::{ColumnType, Value};

/// One column's position and size within a packed row. Shared shape for
/// both engines' in-memory column descriptors (§3.2, §3.3): Engine A's
/// larger descriptor and Engine B's 16-byte on-disk descriptor both reduce
/// to this for codec purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: String,
    pub col_type: ColumnType,
    pub offset: usize,
    pub length: usize,
}

/// Per-type on-disk size, per §3.3: `{INTEGER: 8, REAL: 8, TEXT: n
/// (caller-supplied), NULL: 0}`.
pub fn type_size(col_type: ColumnType) -> usize {
    match col_type {
        ColumnType::Integer => 8,
        ColumnType::Real => 8,
        ColumnType::Text => 0, // caller supplies TEXT length explicitly
        ColumnType::Nullable => 0,
    }
}

/// Rounds `offset` up to the next multiple of 8, per §3.3's alignment rule.
pub fn align_offset(offset: usize) -> usize {
    (offset + 7) & !7
}

/// Computes offsets for a column vector given their types and (for TEXT)
/// declared lengths, applying the 8-byte alignment rule. Returns the
/// fully-populated layout and the total aligned row size.
pub fn layout_columns(columns: &[(String, ColumnType, usize)]) -> (Vec<ColumnLayout>, usize) {
    let mut layouts = Vec::with_capacity(columns.len());
    let mut offset = 0usize;
    for (name, col_type, text_len) in columns {
        let size = match col_type {
            ColumnType::Text => *text_len,
            other => type_size(*other),
        };
        let aligned = align_offset(offset);
        layouts.push(ColumnLayout {
            name: name.clone(),
            col_type: *col_type,
            offset: aligned,
            length: size,
        });
        offset = aligned + size;
    }
    (layouts, align_offset(offset))
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("value count {got} does not match column count {want}")]
    ValueCount { got: usize, want: usize },
    #[error("column {0} of type {1} cannot hold a value of type {2}")]
    TypeMismatch(String, ColumnType, ColumnType),
}

/// Packs `values` (one per column, in column order) into a freshly
/// allocated buffer of exactly `row_size` bytes, per §4.1's packing rules.
///
/// The buffer is zeroed first (mirroring Engine B's explicit zero and
/// Engine A's `calloc`). NULL values (per §3.1's known limitation) leave
/// their slot as zero bytes and are indistinguishable from an
/// all-zero/empty value on read-back.
pub fn pack(values: &[Value], layout: &[ColumnLayout], row_size: usize) -> Result<Vec<u8>, Error> {
    if values.len() != layout.len() {
        return Err(Error::ValueCount {
            got: values.len(),
            want: layout.len(),
        });
    }
    let mut buf = vec![0u8; row_size];
    for (value, col) in values.iter().zip(layout.iter()) {
        match value {
            Value::Null => continue, // slot stays zero
            Value::Integer(i) => {
                if col.col_type == ColumnType::Real {
                    // INTEGER literal into a REAL column: coerced by the
                    // planner (§4.9) before this is reached; accept it
                    // here too so the codec stays a total function over
                    // already-coerced input.
                    let mut cur = Cursor::new(&mut buf[col.offset..col.offset + 8]);
                    cur.write_f64::<LittleEndian>(*i as f64).unwrap();
                    continue;
                }
                if col.col_type != ColumnType::Integer {
                    return Err(Error::TypeMismatch(col.name.clone(), col.col_type, ColumnType::Integer));
                }
                let mut cur = Cursor::new(&mut buf[col.offset..col.offset + 8]);
                cur.write_i64::<LittleEndian>(*i).unwrap();
            }
            Value::Real(r) => {
                if col.col_type != ColumnType::Real {
                    return Err(Error::TypeMismatch(col.name.clone(), col.col_type, ColumnType::Real));
                }
                let mut cur = Cursor::new(&mut buf[col.offset..col.offset + 8]);
                cur.write_f64::<LittleEndian>(*r).unwrap();
            }
            Value::Text(bytes) => {
                if col.col_type != ColumnType::Text {
                    return Err(Error::TypeMismatch(col.name.clone(), col.col_type, ColumnType::Text));
                }
                // Copy at most length-1 bytes, then a nul terminator;
                // silent truncation per §4.1's documented failure mode.
                let cap = col.length.saturating_sub(1);
                let n = bytes.len().min(cap);
                let slot = &mut buf[col.offset..col.offset + col.length];
                slot[..n].copy_from_slice(&bytes[..n]);
                slot[n] = 0;
                // remainder already zero
            }
        }
    }
    Ok(buf)
}

/// Unpacks a packed row back into a `Value` per column, per §4.1's inverse
/// operation. Never produces `Value::Null` — the codec cannot distinguish
/// a stored NULL from a zero value once written (§3.1, §9).
pub fn unpack(buf: &[u8], layout: &[ColumnLayout]) -> Vec<Value> {
    layout
        .iter()
        .map(|col| {
            let slot = &buf[col.offset..col.offset + col.length.max(type_size(col.col_type))];
            match col.col_type {
                ColumnType::Integer => {
                    let mut cur = Cursor::new(&slot[..8]);
                    Value::Integer(cur.read_i64::<LittleEndian>().unwrap())
                }
                ColumnType::Real => {
                    let mut cur = Cursor::new(&slot[..8]);
                    Value::Real(cur.read_f64::<LittleEndian>().unwrap())
                }
                ColumnType::Text => {
                    let nul_pos = slot[..col.length].iter().position(|&b| b == 0).unwrap_or(col.length);
                    Value::Text(slot[..nul_pos].to_vec())
                }
                ColumnType::Nullable => Value::Null,
            }
        })
        .collect()
}

#[test]
fn test_align_offset() {
    assert_eq!(align_offset(0), 0);
    assert_eq!(align_offset(1), 8);
    assert_eq!(align_offset(8), 8);
    assert_eq!(align_offset(9), 16);
}

#[test]
fn test_layout_columns_matches_row_size_invariant() {
    let cols = vec![
        ("id".to_string(), ColumnType::Integer, 0),
        ("name".to_string(), ColumnType::Text, 16),
        ("score".to_string(), ColumnType::Real, 0),
    ];
    let (layout, row_size) = layout_columns(&cols);
    assert_eq!(layout[0].offset, 0);
    assert_eq!(layout[1].offset, 8);
    assert_eq!(layout[2].offset, 24);
    assert_eq!(row_size, 32);
}

#[test]
fn test_pack_unpack_round_trip_integer_real() {
    let cols = vec![
        ("a".to_string(), ColumnType::Integer, 0),
        ("b".to_string(), ColumnType::Real, 0),
    ];
    let (layout, row_size) = layout_columns(&cols);
    let values = vec![Value::Integer(42), Value::Real(3.5)];
    let packed = pack(&values, &layout, row_size).unwrap();
    assert_eq!(unpack(&packed, &layout), values);
}

#[test]
fn test_pack_unpack_text_exact_and_truncated() {
    let cols = vec![("name".to_string(), ColumnType::Text, 8)];
    let (layout, row_size) = layout_columns(&cols);

    // exactly length-1 bytes preserved verbatim (§8 boundary behavior).
    let v = vec![Value::Text(b"1234567".to_vec())];
    let packed = pack(&v, &layout, row_size).unwrap();
    assert_eq!(unpack(&packed, &layout), v);

    // length bytes truncated to length-1 and null terminated.
    let v2 = vec![Value::Text(b"12345678".to_vec())];
    let packed2 = pack(&v2, &layout, row_size).unwrap();
    assert_eq!(unpack(&packed2, &layout), vec![Value::Text(b"1234567".to_vec())]);
}

#[test]
fn test_pack_null_leaves_zero_slot() {
    let cols = vec![("a".to_string(), ColumnType::Integer, 0)];
    let (layout, row_size) = layout_columns(&cols);
    let packed = pack(&[Value::Null], &layout, row_size).unwrap();
    assert_eq!(packed, vec![0u8; 8]);
    // Read back as zero, not NULL -- the documented ambiguity.
    assert_eq!(unpack(&packed, &layout), vec![Value::Integer(0)]);
}

#[test]
fn test_pack_value_count_mismatch() {
    let cols = vec![("a".to_string(), ColumnType::Integer, 0)];
    let (layout, row_size) = layout_columns(&cols);
    let err = pack(&[], &layout, row_size).unwrap_err();
    assert!(matches!(err, Error::ValueCount { got: 0, want: 1 }));
}
