//! The executor (§4.10): runs one resolved [`crate::planner::Plan`]
//! against a catalog and pager, delivering result rows to a
//! [`crate::row_sink::RowSink`].

use crate::catalog::Catalog;
use crate::pager::Pager;
use crate::parser::ast::{CmpOp, Constant, Expr, Primary};
use crate::planner::{Plan, Projection, COLUMN_VECTOR_ROW_THRESHOLD};
use crate::predicate;
use crate::row_sink::RowSink;
use crate::table::Table;
use crate::value::{ColumnType, Value};
use crate::vector_filter::{self, CmpKind};
use streaming_iterator::StreamingIterator;

/// Default TEXT column width for Engine A `CREATE TABLE` columns that
/// don't specify a length; Engine B's schema sub-parser has its own
/// identical default (§4.8) but the two are independent constants.
pub const DEFAULT_TEXT_LENGTH: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] crate::catalog::Error),
    #[error(transparent)]
    Table(#[from] crate::table::Error),
    #[error(transparent)]
    Predicate(#[from] predicate::Error),
    #[error("table {0} not found")]
    TableNotFound(String),
    #[error("column {0} not found")]
    ColumnNotFound(String),
}

/// Runs `plan`, delivering rows (if any) to `sink` (§4.10).
pub fn execute(plan: Plan, catalog: &mut Catalog, pager: &mut Pager, sink: &mut dyn RowSink) -> Result<(), Error> {
    match plan {
        Plan::CreateTable(create) => {
            let columns = create
                .columns
                .into_iter()
                .map(|c| {
                    let len = match c.col_type {
                        ColumnType::Text => c.length.map(|l| l as usize).unwrap_or(DEFAULT_TEXT_LENGTH),
                        _ => 0,
                    };
                    (c.name, c.col_type, len)
                })
                .collect();
            let table = Table::new(create.table_name, columns);
            catalog.register(table)?;
            Ok(())
        }
        Plan::Insert { table, values } => {
            let tbl = catalog.get_mut(&table).ok_or_else(|| Error::TableNotFound(table.clone()))?;
            tbl.insert_row(pager, &values)?;
            Ok(())
        }
        Plan::TableScan { table, filter, projection } => {
            let tbl = catalog.get(&table).ok_or_else(|| Error::TableNotFound(table.clone()))?;
            run_table_scan(tbl, filter, &projection, pager, sink)
        }
        Plan::IndexScan { table, key, projection } => {
            let tbl = catalog.get(&table).ok_or_else(|| Error::TableNotFound(table.clone()))?;
            let names = resolve_names(tbl, &projection)?;
            if let Some(index) = &tbl.index {
                if let Some(loc) = index.find(key as u32) {
                    let row = tbl.fetch_row(pager, loc)?;
                    let projected = project_row(tbl, &projection, &row)?;
                    sink.accept(&names, &projected);
                }
            }
            Ok(())
        }
        Plan::ShowTables { pattern } => {
            let names = vec!["Tables".to_string()];
            let mut table_names = catalog.table_names();
            table_names.sort();
            for name in table_names {
                if like_matches(&pattern, &name) {
                    sink.accept(&names, &[Value::Text(name.into_bytes())]);
                }
            }
            Ok(())
        }
        Plan::Describe { table } => {
            let tbl = catalog.get(&table).ok_or_else(|| Error::TableNotFound(table.clone()))?;
            let names: Vec<String> = ["Field", "Type", "Null", "Key", "Default", "Extra"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            for col in &tbl.columns {
                let values = vec![
                    Value::Text(col.name.clone().into_bytes()),
                    Value::Text(col.col_type.to_string().into_bytes()),
                    Value::Text(b"YES".to_vec()),
                    Value::Text(Vec::new()),
                    Value::Text(Vec::new()),
                    Value::Text(Vec::new()),
                ];
                sink.accept(&names, &values);
            }
            Ok(())
        }
        Plan::ShowCreateTable { table } => {
            let tbl = catalog.get(&table).ok_or_else(|| Error::TableNotFound(table.clone()))?;
            let sql = reconstruct_create_table_sql(tbl);
            let names = vec!["Table".to_string(), "Create Table".to_string()];
            sink.accept(&names, &[Value::Text(table.into_bytes()), Value::Text(sql.into_bytes())]);
            Ok(())
        }
    }
}

/// `LIKE` matching per §4.10's reduced semantics: `"%"` matches all,
/// `"prefix%"` matches by prefix, anything else is an exact match.
fn like_matches(pattern: &Option<String>, name: &str) -> bool {
    match pattern {
        None => true,
        Some(p) if p == "%" => true,
        Some(p) => match p.strip_suffix('%') {
            Some(prefix) => name.starts_with(prefix),
            None => name == p,
        },
    }
}

fn resolve_names(table: &Table, projection: &Projection) -> Result<Vec<String>, Error> {
    match projection {
        Projection::All => Ok(table.column_names()),
        Projection::Named(names) => Ok(names.clone()),
    }
}

fn project_row(table: &Table, projection: &Projection, row: &[Value]) -> Result<Vec<Value>, Error> {
    match projection {
        Projection::All => Ok(row.to_vec()),
        Projection::Named(names) => names
            .iter()
            .map(|n| {
                let idx = table.find_column(n).ok_or_else(|| Error::ColumnNotFound(n.clone()))?;
                Ok(row[idx].clone())
            })
            .collect(),
    }
}

fn reconstruct_create_table_sql(table: &Table) -> String {
    let cols: Vec<String> = table
        .columns
        .iter()
        .map(|c| match c.col_type {
            ColumnType::Text => format!("{} TEXT({})", c.name, c.length),
            other => format!("{} {}", c.name, other),
        })
        .collect();
    format!("CREATE TABLE {} ({})", table.name, cols.join(", "))
}

/// A WHERE-clause shape the column-vector fast path (§4.11) can evaluate
/// entirely over dense `i64` arrays and bitmaps, built by [`build_vector_plan`].
/// `And`/`Or` fold their children's bitmaps with
/// [`vector_filter::bitmap_and`]/[`vector_filter::bitmap_or`] instead of
/// falling back to the generic per-row evaluator (§4.11, SPEC_FULL §11).
enum VectorPlan {
    Cmp { col_idx: usize, kind: CmpKind, scalar: i64 },
    And(Box<VectorPlan>, Box<VectorPlan>),
    Or(Box<VectorPlan>, Box<VectorPlan>),
}

/// Recognises the `col = INTEGER_LITERAL` / `< / >` leaf shape, operator-
/// flipping when the literal is on the left.
fn vector_leaf(filter: &Expr, table: &Table) -> Option<(usize, CmpKind, i64)> {
    let Expr::Comparison { left, op, right } = filter else {
        return None;
    };
    let kind_of = |op: CmpOp| match op {
        CmpOp::Eq => Some(CmpKind::Eq),
        CmpOp::Lt => Some(CmpKind::Lt),
        CmpOp::Gt => Some(CmpKind::Gt),
        _ => None,
    };
    let integer_column = |name: &str| -> Option<usize> {
        let idx = table.find_column(name)?;
        (table.columns[idx].col_type == ColumnType::Integer).then_some(idx)
    };
    match (left, right) {
        (Primary::Column(name), Primary::Literal(Constant::Integer(v))) => {
            Some((integer_column(name)?, kind_of(*op)?, *v))
        }
        (Primary::Literal(Constant::Integer(v)), Primary::Column(name)) => {
            let flipped = match op {
                CmpOp::Eq => CmpOp::Eq,
                CmpOp::Lt => CmpOp::Gt,
                CmpOp::Gt => CmpOp::Lt,
                _ => return None,
            };
            Some((integer_column(name)?, kind_of(flipped)?, *v))
        }
        _ => None,
    }
}

/// Builds a [`VectorPlan`] for `filter`, recursing through `AND`/`OR` so a
/// compound predicate over several integer columns still qualifies for the
/// column-vector path; any leaf that doesn't reduce to `vector_leaf`
/// disqualifies the whole expression (falls back to the generic evaluator).
fn build_vector_plan(filter: &Expr, table: &Table) -> Option<VectorPlan> {
    match filter {
        Expr::Comparison { .. } => {
            let (col_idx, kind, scalar) = vector_leaf(filter, table)?;
            Some(VectorPlan::Cmp { col_idx, kind, scalar })
        }
        Expr::And(l, r) => Some(VectorPlan::And(
            Box::new(build_vector_plan(l, table)?),
            Box::new(build_vector_plan(r, table)?),
        )),
        Expr::Or(l, r) => Some(VectorPlan::Or(
            Box::new(build_vector_plan(l, table)?),
            Box::new(build_vector_plan(r, table)?),
        )),
        Expr::Bare(_) => None,
    }
}

fn collect_vector_plan_columns(plan: &VectorPlan, out: &mut Vec<usize>) {
    match plan {
        VectorPlan::Cmp { col_idx, .. } => {
            if !out.contains(col_idx) {
                out.push(*col_idx);
            }
        }
        VectorPlan::And(l, r) | VectorPlan::Or(l, r) => {
            collect_vector_plan_columns(l, out);
            collect_vector_plan_columns(r, out);
        }
    }
}

/// Evaluates `plan` against the dense columns gathered by `run_table_scan`,
/// where `col_positions[i]` names which table column `columns[i]` holds.
fn eval_vector_plan(plan: &VectorPlan, col_positions: &[usize], columns: &[Vec<i64>]) -> Vec<u8> {
    match plan {
        VectorPlan::Cmp { col_idx, kind, scalar } => {
            let pos = col_positions
                .iter()
                .position(|c| c == col_idx)
                .expect("column collected into col_positions before evaluation");
            vector_filter::eq_gt_lt_i64(*kind, &columns[pos], *scalar)
        }
        VectorPlan::And(l, r) => vector_filter::bitmap_and(
            &eval_vector_plan(l, col_positions, columns),
            &eval_vector_plan(r, col_positions, columns),
        ),
        VectorPlan::Or(l, r) => vector_filter::bitmap_or(
            &eval_vector_plan(l, col_positions, columns),
            &eval_vector_plan(r, col_positions, columns),
        ),
    }
}

fn run_table_scan(
    table: &Table,
    filter: Option<Expr>,
    projection: &Projection,
    pager: &mut Pager,
    sink: &mut dyn RowSink,
) -> Result<(), Error> {
    let names = resolve_names(table, projection)?;

    let vector_plan = filter
        .as_ref()
        .filter(|_| table.row_count > COLUMN_VECTOR_ROW_THRESHOLD)
        .and_then(|f| build_vector_plan(f, table));

    if let Some(plan) = vector_plan {
        let mut col_positions = Vec::new();
        collect_vector_plan_columns(&plan, &mut col_positions);
        let mut columns: Vec<Vec<i64>> = vec![Vec::with_capacity(table.row_count as usize); col_positions.len()];

        let mut scanner = table.scanner(pager);
        scanner.advance();
        while let Some(row) = scanner.get() {
            for (slot, &col_idx) in col_positions.iter().enumerate() {
                columns[slot].push(row[col_idx].as_integer().unwrap_or(0));
            }
            scanner.advance();
        }

        let bitmap = eval_vector_plan(&plan, &col_positions, &columns);
        log::debug!(
            "column-vector scan on {}: {} of {} rows matched",
            table.name,
            vector_filter::popcount(&bitmap),
            table.row_count
        );

        let mut scanner = table.scanner(pager);
        scanner.advance();
        let mut i = 0;
        while let Some(row) = scanner.get() {
            if bitmap[i] != 0 {
                let projected = project_row(table, projection, row)?;
                sink.accept(&names, &projected);
            }
            i += 1;
            scanner.advance();
        }
        return Ok(());
    }

    let mut scanner = table.scanner(pager);
    scanner.advance();
    while let Some(row) = scanner.get() {
        let keep = match &filter {
            Some(f) => predicate::eval(f, &table.columns, row)?,
            None => true,
        };
        if keep {
            let projected = project_row(table, projection, row)?;
            sink.accept(&names, &projected);
        }
        scanner.advance();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::CreateStatement;
    use crate::planner::build_plan;
    use crate::row_sink::Row;

    fn setup() -> (Catalog, Pager) {
        (Catalog::new(), Pager::open(":memory:").unwrap())
    }

    fn run(sql: &str, catalog: &mut Catalog, pager: &mut Pager, sink: &mut Vec<Row>) {
        let stmt = crate::parser::parse(sql).unwrap();
        let plan = build_plan(stmt, catalog).unwrap();
        execute(plan, catalog, pager, sink).unwrap();
    }

    #[test]
    fn test_create_insert_and_table_scan() {
        let (mut catalog, mut pager) = setup();
        let mut sink: Vec<Row> = Vec::new();
        run("CREATE TABLE users (id INTEGER, name TEXT(16))", &mut catalog, &mut pager, &mut sink);
        run("INSERT INTO users VALUES (1, 'Alice')", &mut catalog, &mut pager, &mut sink);
        run("INSERT INTO users VALUES (2, 'Bob')", &mut catalog, &mut pager, &mut sink);
        run("SELECT * FROM users", &mut catalog, &mut pager, &mut sink);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].values, vec!["1", "Alice"]);
        assert_eq!(sink[1].values, vec!["2", "Bob"]);
    }

    #[test]
    fn test_index_scan_hit_and_miss() {
        let (mut catalog, mut pager) = setup();
        let mut sink: Vec<Row> = Vec::new();
        run("CREATE TABLE users (id INTEGER, name TEXT(16))", &mut catalog, &mut pager, &mut sink);
        run("INSERT INTO users VALUES (7, 'Gina')", &mut catalog, &mut pager, &mut sink);

        sink.clear();
        run("SELECT * FROM users WHERE id = 7", &mut catalog, &mut pager, &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].values, vec!["7", "Gina"]);

        sink.clear();
        run("SELECT * FROM users WHERE id = 999", &mut catalog, &mut pager, &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_show_tables_like_and_describe_and_show_create() {
        let (mut catalog, mut pager) = setup();
        let mut sink: Vec<Row> = Vec::new();
        run("CREATE TABLE users (id INTEGER, name TEXT(16))", &mut catalog, &mut pager, &mut sink);
        run("CREATE TABLE orders (id INTEGER)", &mut catalog, &mut pager, &mut sink);

        sink.clear();
        run("SHOW TABLES LIKE 'user%'", &mut catalog, &mut pager, &mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].values, vec!["users"]);

        sink.clear();
        run("DESCRIBE users", &mut catalog, &mut pager, &mut sink);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].values[0], "id");
        assert_eq!(sink[0].values[2], "YES");

        sink.clear();
        run("SHOW CREATE TABLE users", &mut catalog, &mut pager, &mut sink);
        assert_eq!(sink[0].values[0], "users");
        assert!(sink[0].values[1].contains("CREATE TABLE users"));
    }

    #[test]
    fn test_column_vector_path_matches_scalar_path_on_large_table() {
        let (mut catalog, mut pager) = setup();
        let mut sink: Vec<Row> = Vec::new();
        run("CREATE TABLE t (id INTEGER)", &mut catalog, &mut pager, &mut sink);
        for i in 0..200 {
            run(&format!("INSERT INTO t VALUES ({})", i), &mut catalog, &mut pager, &mut sink);
        }
        sink.clear();
        run("SELECT * FROM t WHERE id < 50", &mut catalog, &mut pager, &mut sink);
        assert_eq!(sink.len(), 50);
        assert!(sink.iter().all(|r| r.values[0].parse::<i64>().unwrap() < 50));
    }

    #[test]
    fn test_column_vector_and_or_folding_matches_scalar_path() {
        let (mut catalog, mut pager) = setup();
        let mut sink: Vec<Row> = Vec::new();
        run("CREATE TABLE t (a INTEGER, b INTEGER)", &mut catalog, &mut pager, &mut sink);
        for i in 0..200i64 {
            run(&format!("INSERT INTO t VALUES ({}, {})", i, i), &mut catalog, &mut pager, &mut sink);
        }

        // AND: both sides qualify for the column-vector path, folded via bitmap_and.
        sink.clear();
        run("SELECT * FROM t WHERE a < 50 AND b > 10", &mut catalog, &mut pager, &mut sink);
        let mut and_got: Vec<i64> = sink.iter().map(|r| r.values[0].parse().unwrap()).collect();
        and_got.sort();
        let and_expected: Vec<i64> = (11..50).collect();
        assert_eq!(and_got, and_expected);

        // OR: also both sides qualify, folded via bitmap_or.
        sink.clear();
        run("SELECT * FROM t WHERE a < 10 OR a > 190", &mut catalog, &mut pager, &mut sink);
        let mut or_got: Vec<i64> = sink.iter().map(|r| r.values[0].parse().unwrap()).collect();
        or_got.sort();
        let or_expected: Vec<i64> = (0..10).chain(191..200).collect();
        assert_eq!(or_got, or_expected);
    }

    #[test]
    fn test_create_table_rejects_duplicate_name() {
        let (mut catalog, _pager) = setup();
        let create = CreateStatement {
            table_name: "t".to_string(),
            columns: vec![],
        };
        catalog
            .register(Table::new("t".to_string(), vec![]))
            .unwrap();
        let err = build_plan(crate::parser::ast::Statement::Create(create), &catalog).unwrap_err();
        assert!(matches!(err, crate::planner::Error::TableExists(_)));
    }
}
