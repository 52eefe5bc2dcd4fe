//! The generic predicate evaluator (§4.12): recursive evaluation of a
//! WHERE-clause `Expr` against one materialised row. Takes a column
//! layout slice rather than a [`crate::table::Table`] so that Engine B's
//! `EngineBFile::select` (§6.4, §9 Open Question) can reuse it without
//! depending on Engine A's table type.

use crate::codec::ColumnLayout;
use crate::parser::ast::{CmpOp, Constant, Expr, Primary};
use crate::value::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("column {0} not found")]
    ColumnNotFound(String),
}

fn constant_to_value(c: &Constant) -> Value {
    match c {
        Constant::Integer(i) => Value::Integer(*i),
        Constant::Real(r) => Value::Real(*r),
        Constant::Text(s) => Value::Text(s.clone().into_bytes()),
        Constant::Null => Value::Null,
    }
}

fn resolve_primary(p: &Primary, columns: &[ColumnLayout], row: &[Value]) -> Result<Value, Error> {
    match p {
        Primary::Literal(c) => Ok(constant_to_value(c)),
        Primary::Column(name) => {
            let idx = columns
                .iter()
                .position(|c| c.name == *name)
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            Ok(row[idx].clone())
        }
    }
}

/// Common-type comparison per §4.12: mismatched types are "not-equal and
/// not-ordered", so only `!=` is true across a type mismatch.
fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
        (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
        (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => None, // type mismatch (e.g. INTEGER vs TEXT)
    };
    match ordering {
        Some(std::cmp::Ordering::Equal) => matches!(op, CmpOp::Eq | CmpOp::Le | CmpOp::Ge),
        Some(std::cmp::Ordering::Less) => matches!(op, CmpOp::Lt | CmpOp::Le | CmpOp::Ne),
        Some(std::cmp::Ordering::Greater) => matches!(op, CmpOp::Gt | CmpOp::Ge | CmpOp::Ne),
        None => op == CmpOp::Ne,
    }
}

/// Evaluates `expr` against `row`, a fully materialised row laid out per
/// `columns`, returning its truthiness per §4.12's rules.
pub fn eval(expr: &Expr, columns: &[ColumnLayout], row: &[Value]) -> Result<bool, Error> {
    match expr {
        Expr::Bare(p) => Ok(!resolve_primary(p, columns, row)?.is_null()),
        Expr::Comparison { left, op, right } => {
            let l = resolve_primary(left, columns, row)?;
            let r = resolve_primary(right, columns, row)?;
            Ok(compare(*op, &l, &r))
        }
        Expr::And(l, r) => Ok(eval(l, columns, row)? && eval(r, columns, row)?),
        Expr::Or(l, r) => Ok(eval(l, columns, row)? || eval(r, columns, row)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    fn make_columns() -> Vec<ColumnLayout> {
        vec![
            ColumnLayout { name: "id".to_string(), col_type: ColumnType::Integer, offset: 0, length: 8 },
            ColumnLayout { name: "name".to_string(), col_type: ColumnType::Text, offset: 8, length: 16 },
        ]
    }

    #[test]
    fn test_eval_comparison_true_and_false() {
        let columns = make_columns();
        let row = vec![Value::Integer(5), Value::Text(b"Alice".to_vec())];
        let lt = Expr::Comparison {
            left: Primary::Column("id".into()),
            op: CmpOp::Lt,
            right: Primary::Literal(Constant::Integer(10)),
        };
        assert!(eval(&lt, &columns, &row).unwrap());

        let gt = Expr::Comparison {
            left: Primary::Column("id".into()),
            op: CmpOp::Gt,
            right: Primary::Literal(Constant::Integer(10)),
        };
        assert!(!eval(&gt, &columns, &row).unwrap());
    }

    #[test]
    fn test_eval_and_or_short_circuit_semantics() {
        let columns = make_columns();
        let row = vec![Value::Integer(5), Value::Text(b"Alice".to_vec())];
        let and_expr = Expr::And(
            Box::new(Expr::Comparison {
                left: Primary::Column("id".into()),
                op: CmpOp::Eq,
                right: Primary::Literal(Constant::Integer(5)),
            }),
            Box::new(Expr::Bare(Primary::Column("name".into()))),
        );
        assert!(eval(&and_expr, &columns, &row).unwrap());

        let or_expr = Expr::Or(
            Box::new(Expr::Comparison {
                left: Primary::Column("id".into()),
                op: CmpOp::Eq,
                right: Primary::Literal(Constant::Integer(999)),
            }),
            Box::new(Expr::Bare(Primary::Column("name".into()))),
        );
        assert!(eval(&or_expr, &columns, &row).unwrap());
    }

    #[test]
    fn test_eval_type_mismatch_only_ne_is_true() {
        let columns = make_columns();
        let row = vec![Value::Integer(5), Value::Text(b"Alice".to_vec())];
        let eq = Expr::Comparison {
            left: Primary::Column("name".into()),
            op: CmpOp::Eq,
            right: Primary::Literal(Constant::Integer(5)),
        };
        assert!(!eval(&eq, &columns, &row).unwrap());
        let ne = Expr::Comparison {
            left: Primary::Column("name".into()),
            op: CmpOp::Ne,
            right: Primary::Literal(Constant::Integer(5)),
        };
        assert!(eval(&ne, &columns, &row).unwrap());
    }

    #[test]
    fn test_eval_column_not_found() {
        let columns = make_columns();
        let row = vec![Value::Integer(5), Value::Text(b"Alice".to_vec())];
        let expr = Expr::Bare(Primary::Column("nope".into()));
        assert!(matches!(eval(&expr, &columns, &row), Err(Error::ColumnNotFound(_))));
    }
}
