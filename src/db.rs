//! The Engine A public surface (§6.3): `DbHandle` owns the catalog and
//! pager for one open database and exposes `exec`/`query` over SQL text.
//!
//! Engine B's public surface (§6.4) needs no handle of this shape --
//! [`crate::engine_b::EngineBFile`]'s own `create`/`open`/`close`/
//! `append_row`/`select`/`flush`/`get_row_count` methods already are that
//! surface; see the re-export in `lib.rs`.

use crate::catalog::Catalog;
use crate::error::{Error, Result, ResultCode};
use crate::executor;
use crate::pager::Pager;
use crate::planner;
use crate::row_sink::RowSink;

/// One open Engine A database: the catalog of tables and the pager
/// backing their storage (§3.8, §5 -- owned here instead of as a
/// process-wide static, per the Open Question resolved in `DESIGN.md`).
pub struct DbHandle {
    catalog: Catalog,
    pager: Pager,
}

impl DbHandle {
    /// Opens (or creates) a database file at `path`. `":memory:"` maps to
    /// an anonymous, non-persistent mapping (`Pager::open`'s behavior).
    pub fn open(path: &str) -> Result<DbHandle> {
        let pager = Pager::open(path)?;
        Ok(DbHandle {
            catalog: Catalog::new(),
            pager,
        })
    }

    /// Idempotent teardown: dropping the handle already flushes the
    /// pager (`Pager`'s `Drop` impl), so this simply consumes `self`.
    pub fn close(self) {}

    /// Runs one non-`SELECT`-shaped statement (`CREATE TABLE`, `INSERT`)
    /// and discards any rows it happens to produce.
    pub fn exec(&mut self, sql: &str) -> ResultCode {
        let mut discard: Vec<crate::row_sink::Row> = Vec::new();
        match self.run(sql, &mut discard) {
            Ok(()) => ResultCode::Ok,
            Err(e) => ResultCode::from(&e),
        }
    }

    /// Runs one `SELECT`/`SHOW TABLES`/`DESCRIBE`/`SHOW CREATE TABLE`
    /// statement, delivering each result row to `sink` as it is produced.
    pub fn query(&mut self, sql: &str, sink: &mut dyn RowSink) -> ResultCode {
        match self.run(sql, sink) {
            Ok(()) => ResultCode::Ok,
            Err(e) => ResultCode::from(&e),
        }
    }

    fn run(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<()> {
        let stmt = crate::parser::parse(sql).map_err(Error::Grammar)?;
        let plan = planner::build_plan(stmt, &self.catalog).map_err(Error::Planner)?;
        executor::execute(plan, &mut self.catalog, &mut self.pager, sink).map_err(Error::Executor)?;
        Ok(())
    }
}

/// Maps a [`ResultCode`] to a human-readable message (§6.3's
/// `error_string`).
pub fn error_string(code: ResultCode) -> &'static str {
    crate::error::error_string(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_sink::Row;

    #[test]
    fn test_open_exec_create_and_insert() {
        let mut db = DbHandle::open(":memory:").unwrap();
        assert_eq!(db.exec("CREATE TABLE t (id INTEGER, name TEXT(16))"), ResultCode::Ok);
        assert_eq!(db.exec("INSERT INTO t VALUES (1, 'Alice')"), ResultCode::Ok);
        // Duplicate CREATE TABLE is a constraint error, not a crash.
        assert_eq!(
            db.exec("CREATE TABLE t (id INTEGER)"),
            ResultCode::ConstraintError
        );
    }

    #[test]
    fn test_query_delivers_rows_via_sink() {
        let mut db = DbHandle::open(":memory:").unwrap();
        db.exec("CREATE TABLE t (id INTEGER, name TEXT(16))");
        db.exec("INSERT INTO t VALUES (1, 'Alice')");
        db.exec("INSERT INTO t VALUES (2, 'Bob')");

        let mut rows: Vec<Row> = Vec::new();
        assert_eq!(db.query("SELECT * FROM t", &mut rows), ResultCode::Ok);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec!["1", "Alice"]);
    }

    #[test]
    fn test_query_on_missing_table_is_not_found() {
        let mut db = DbHandle::open(":memory:").unwrap();
        let mut rows: Vec<Row> = Vec::new();
        assert_eq!(db.query("SELECT * FROM ghost", &mut rows), ResultCode::NotFound);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut db = DbHandle::open(":memory:").unwrap();
        assert_eq!(db.exec("NOT VALID SQL"), ResultCode::ParseError);
    }

    #[test]
    fn test_error_string_round_trips() {
        assert_eq!(error_string(ResultCode::NotFound), "not found");
    }
}
