//! The logical planner (§4.9): AST + catalog -> a `Plan` the executor can
//! run directly. Plan variants take ownership of the pieces they need out
//! of the parsed statement (see the note in `parser::ast`), rather than
//! borrowing, to keep the executor's catalog borrow independent of the
//! statement's lifetime.

use crate::catalog::Catalog;
use crate::parser::ast::{Constant, CreateStatement, Expr, Primary, SelectColumns, Statement};
use crate::value::{ColumnType, Value};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("table {0} not found")]
    TableNotFound(String),
    #[error("table {0} already exists")]
    TableExists(String),
    #[error("column {0} not found")]
    ColumnNotFound(String),
    #[error("value count {got} does not match column count {want}")]
    ValueCount { got: usize, want: usize },
    #[error("column {0} of type {1} cannot hold a value of type {2}")]
    TypeMismatch(String, ColumnType, ColumnType),
}

/// The resolved projection for a scan plan (§4.9).
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Named(Vec<String>),
}

/// A fully resolved, directly executable plan (§4.9).
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    CreateTable(CreateStatement),
    Insert {
        table: String,
        values: Vec<Value>,
    },
    TableScan {
        table: String,
        filter: Option<Expr>,
        projection: Projection,
    },
    IndexScan {
        table: String,
        key: i64,
        projection: Projection,
    },
    ShowTables {
        pattern: Option<String>,
    },
    Describe {
        table: String,
    },
    ShowCreateTable {
        table: String,
    },
}

/// Threshold above which `TableScan` switches to the column-vector fast
/// path (§4.10, §4.11).
pub const COLUMN_VECTOR_ROW_THRESHOLD: u64 = 100;

fn coerce_value(col_type: ColumnType, col_name: &str, c: &Constant) -> Result<Value, Error> {
    match (col_type, c) {
        (_, Constant::Null) => Ok(Value::Null),
        (ColumnType::Integer, Constant::Integer(i)) => Ok(Value::Integer(*i)),
        (ColumnType::Real, Constant::Real(r)) => Ok(Value::Real(*r)),
        // INTEGER literal into a REAL column is the one coercion §4.9 allows.
        (ColumnType::Real, Constant::Integer(i)) => Ok(Value::Real(*i as f64)),
        (ColumnType::Text, Constant::Text(s)) => Ok(Value::Text(s.clone().into_bytes())),
        (want, got) => Err(Error::TypeMismatch(col_name.to_string(), want, got.column_type())),
    }
}

impl Constant {
    fn column_type(&self) -> ColumnType {
        match self {
            Constant::Integer(_) => ColumnType::Integer,
            Constant::Real(_) => ColumnType::Real,
            Constant::Text(_) => ColumnType::Text,
            Constant::Null => ColumnType::Nullable,
        }
    }
}

fn resolve_projection(columns: &SelectColumns) -> Projection {
    match columns {
        SelectColumns::All => Projection::All,
        SelectColumns::Named(names) => Projection::Named(names.clone()),
    }
}

/// Detects the `col0 = INTEGER_LITERAL` shape (either operand order) that
/// qualifies a filter for `IndexScan` (§4.9).
fn index_scan_key(filter: &Expr, primary_col: &str) -> Option<i64> {
    let Expr::Comparison {
        left,
        op: crate::parser::ast::CmpOp::Eq,
        right,
    } = filter
    else {
        return None;
    };
    let pair = [(left, right), (right, left)];
    for (col_side, lit_side) in pair {
        if let (Primary::Column(name), Primary::Literal(Constant::Integer(i))) = (col_side, lit_side) {
            if name == primary_col {
                return Some(*i);
            }
        }
    }
    None
}

/// Builds a plan from a parsed statement and the current catalog state
/// (§4.9). Consumes `stmt`.
pub fn build_plan(stmt: Statement, catalog: &Catalog) -> Result<Plan, Error> {
    match stmt {
        Statement::Create(create) => {
            if catalog.contains(&create.table_name) {
                return Err(Error::TableExists(create.table_name));
            }
            Ok(Plan::CreateTable(create))
        }
        Statement::Insert(insert) => {
            let table = catalog
                .get(&insert.table_name)
                .ok_or_else(|| Error::TableNotFound(insert.table_name.clone()))?;
            if insert.values.len() != table.columns.len() {
                return Err(Error::ValueCount {
                    got: insert.values.len(),
                    want: table.columns.len(),
                });
            }
            let values = insert
                .values
                .iter()
                .zip(table.columns.iter())
                .map(|(c, col)| coerce_value(col.col_type, &col.name, c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Plan::Insert {
                table: insert.table_name,
                values,
            })
        }
        Statement::Select(select) => {
            let table = catalog
                .get(&select.table_name)
                .ok_or_else(|| Error::TableNotFound(select.table_name.clone()))?;
            if let SelectColumns::Named(names) = &select.columns {
                for name in names {
                    if table.find_column(name).is_none() {
                        return Err(Error::ColumnNotFound(name.clone()));
                    }
                }
            }
            let projection = resolve_projection(&select.columns);

            if let (Some(filter), Some(primary_col)) = (
                &select.where_clause,
                table.columns.first().filter(|c| c.col_type == ColumnType::Integer),
            ) {
                if let Some(key) = index_scan_key(filter, &primary_col.name) {
                    if table.index.is_some() {
                        return Ok(Plan::IndexScan {
                            table: select.table_name,
                            key,
                            projection,
                        });
                    }
                }
            }

            Ok(Plan::TableScan {
                table: select.table_name,
                filter: select.where_clause,
                projection,
            })
        }
        Statement::ShowTables(show) => Ok(Plan::ShowTables { pattern: show.like_pattern }),
        Statement::Describe(table) => {
            if !catalog.contains(&table) {
                return Err(Error::TableNotFound(table));
            }
            Ok(Plan::Describe { table })
        }
        Statement::ShowCreateTable(table) => {
            if !catalog.contains(&table) {
                return Err(Error::TableNotFound(table));
            }
            Ok(Plan::ShowCreateTable { table })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{CmpOp, InsertStatement, SelectStatement, ShowTablesStatement};
    use crate::table::Table;

    fn catalog_with_users() -> Catalog {
        let mut cat = Catalog::new();
        cat.register(Table::new(
            "users".to_string(),
            vec![
                ("id".to_string(), ColumnType::Integer, 0),
                ("name".to_string(), ColumnType::Text, 16),
                ("score".to_string(), ColumnType::Real, 0),
            ],
        ))
        .unwrap();
        cat
    }

    #[test]
    fn test_plan_create_rejects_existing_table() {
        let catalog = catalog_with_users();
        let stmt = Statement::Create(CreateStatement {
            table_name: "users".to_string(),
            columns: vec![],
        });
        assert!(matches!(build_plan(stmt, &catalog), Err(Error::TableExists(_))));
    }

    #[test]
    fn test_plan_insert_coerces_integer_into_real() {
        let catalog = catalog_with_users();
        let stmt = Statement::Insert(InsertStatement {
            table_name: "users".to_string(),
            values: vec![Constant::Integer(1), Constant::Text("Alice".into()), Constant::Integer(95)],
        });
        let plan = build_plan(stmt, &catalog).unwrap();
        match plan {
            Plan::Insert { values, .. } => assert_eq!(values[2], Value::Real(95.0)),
            other => panic!("expected Insert plan, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_insert_wrong_value_count() {
        let catalog = catalog_with_users();
        let stmt = Statement::Insert(InsertStatement {
            table_name: "users".to_string(),
            values: vec![Constant::Integer(1)],
        });
        assert!(matches!(build_plan(stmt, &catalog), Err(Error::ValueCount { got: 1, want: 3 })));
    }

    #[test]
    fn test_plan_select_equality_on_primary_key_is_index_scan() {
        let catalog = catalog_with_users();
        let stmt = Statement::Select(SelectStatement {
            table_name: "users".to_string(),
            columns: SelectColumns::All,
            where_clause: Some(Expr::Comparison {
                left: Primary::Column("id".into()),
                op: CmpOp::Eq,
                right: Primary::Literal(Constant::Integer(7)),
            }),
        });
        let plan = build_plan(stmt, &catalog).unwrap();
        assert!(matches!(plan, Plan::IndexScan { key: 7, .. }));
    }

    #[test]
    fn test_plan_select_range_filter_is_table_scan() {
        let catalog = catalog_with_users();
        let stmt = Statement::Select(SelectStatement {
            table_name: "users".to_string(),
            columns: SelectColumns::Named(vec!["name".into()]),
            where_clause: Some(Expr::Comparison {
                left: Primary::Column("id".into()),
                op: CmpOp::Lt,
                right: Primary::Literal(Constant::Integer(7)),
            }),
        });
        let plan = build_plan(stmt, &catalog).unwrap();
        assert!(matches!(plan, Plan::TableScan { .. }));
    }

    #[test]
    fn test_plan_select_unknown_column_fails() {
        let catalog = catalog_with_users();
        let stmt = Statement::Select(SelectStatement {
            table_name: "users".to_string(),
            columns: SelectColumns::Named(vec!["nope".into()]),
            where_clause: None,
        });
        assert!(matches!(build_plan(stmt, &catalog), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_plan_show_tables_and_describe() {
        let catalog = catalog_with_users();
        let show = build_plan(
            Statement::ShowTables(ShowTablesStatement { like_pattern: None }),
            &catalog,
        )
        .unwrap();
        assert!(matches!(show, Plan::ShowTables { pattern: None }));

        let describe = build_plan(Statement::Describe("users".to_string()), &catalog).unwrap();
        assert!(matches!(describe, Plan::Describe { .. }));

        assert!(matches!(
            build_plan(Statement::Describe("missing".to_string()), &catalog),
            Err(Error::TableNotFound(_))
        ));
    }
}
