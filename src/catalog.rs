//! The catalog (§3.8, §4.6): an in-memory name -> table map.
//!
//! The source keeps this as a single process-wide static (`query.c`'s
//! `get_catalog()`), even though its public API already takes a database
//! handle -- a thread-unsafety footgun flagged explicitly in §3.8, §5 and
//! §9. This reimplementation owns the catalog on [`crate::db::DbHandle`]
//! instead; no global state exists anywhere in this crate.

use std::collections::HashMap;

use crate::table::Table;

#[derive(Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("table {0} already exists")]
    AlreadyExists(String),
    #[error("table {0} not found")]
    NotFound(String),
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Registers a newly created table. Called exactly once per successful
    /// `CREATE TABLE` (§4.6); a duplicate name fails without mutating the
    /// catalog.
    pub fn register(&mut self, table: Table) -> Result<(), Error> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::AlreadyExists(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, for `SHOW TABLES` (§4.10). Linear scan over a small N,
    /// as in the source.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

#[test]
fn test_register_then_duplicate_fails() {
    use crate::value::ColumnType;
    let mut cat = Catalog::new();
    cat.register(Table::new("t".into(), vec![("a".into(), ColumnType::Integer, 0)]))
        .unwrap();
    let err = cat
        .register(Table::new("t".into(), vec![("a".into(), ColumnType::Integer, 0)]))
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(name) if name == "t"));
}

#[test]
fn test_get_and_contains() {
    use crate::value::ColumnType;
    let mut cat = Catalog::new();
    cat.register(Table::new("users".into(), vec![("id".into(), ColumnType::Integer, 0)]))
        .unwrap();
    assert!(cat.contains("users"));
    assert!(cat.get("users").is_some());
    assert!(cat.get("missing").is_none());
}
