//! Engine B — the append-only table file (§3.6, §4.4, §6.2, §6.4).
//!
//! No teacher module implements anything like this; it is grounded
//! directly on `table_v2.c`/`table_v2.h` in `original_source/`,
//! reimplemented in the crate's idiom (module-per-concern split, a
//! `thiserror` error enum, inline `#[test]`s with literal fixtures).

pub mod file;
pub mod header;
pub mod schema_parser;

pub use file::EngineBFile;
