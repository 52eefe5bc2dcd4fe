//! The AST produced by [`super::build::parse`] (§4.7). The AST owns all of
//! its data; the plan built from it (§4.9) takes the parsed statement by
//! value and moves the pieces it needs out, rather than borrowing, since
//! the executor needs a mutable catalog borrow for the same statement's
//! lifetime and the AST is cheap to move.

use enum_as_inner::EnumAsInner;
use std::fmt;

use crate::value::ColumnType;

#[derive(Debug, Clone, PartialEq)]
pub struct ColDef {
    pub name: String,
    pub col_type: ColumnType,
    /// Only meaningful for TEXT columns; `None` means "use the default".
    pub length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStatement {
    pub table_name: String,
    pub columns: Vec<ColDef>,
}

/// A literal value as it appears in SQL text, before any column-type
/// coercion the planner applies (§4.9).
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Constant {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Integer(i) => write!(f, "{}", i),
            Constant::Real(r) => write!(f, "{}", r),
            Constant::Text(s) => write!(f, "'{}'", s),
            Constant::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table_name: String,
    pub values: Vec<Constant>,
}

/// The "all columns" marker for `SELECT *`, distinguished from a named
/// projection list (§4.7: "the source uses the sentinel `u32::MAX`; any
/// implementation-defined marker is acceptable").
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum SelectColumns {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// A non-comparison leaf: a column reference or a literal (§4.7's
/// `primary`).
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Primary {
    Column(String),
    Literal(Constant),
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primary::Column(name) => write!(f, "{}", name),
            Primary::Literal(c) => write!(f, "{}", c),
        }
    }
}

/// A WHERE-clause expression (§4.7, §4.12). Operator precedence is
/// enforced by the grammar, not by this type: `OR` lowest, then `AND`,
/// then comparison.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Expr {
    /// A bare primary used as a boolean (§4.12: truthy iff not NULL).
    Bare(Primary),
    Comparison {
        left: Primary,
        op: CmpOp,
        right: Primary,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bare(p) => write!(f, "{}", p),
            Expr::Comparison { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::And(l, r) => write!(f, "({} AND {})", l, r),
            Expr::Or(l, r) => write!(f, "({} OR {})", l, r),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub table_name: String,
    pub columns: SelectColumns,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowTablesStatement {
    pub like_pattern: Option<String>,
}

/// A fully parsed SQL statement (§4.7's `stmt` production).
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Statement {
    Create(CreateStatement),
    Insert(InsertStatement),
    Select(SelectStatement),
    ShowTables(ShowTablesStatement),
    Describe(String),
    ShowCreateTable(String),
}

#[test]
fn test_constant_display() {
    assert_eq!(Constant::Integer(5).to_string(), "5");
    assert_eq!(Constant::Text("hi".into()).to_string(), "'hi'");
    assert_eq!(Constant::Null.to_string(), "NULL");
}

#[test]
fn test_expr_display_nests_and_or() {
    let e = Expr::And(
        Box::new(Expr::Comparison {
            left: Primary::Column("a".into()),
            op: CmpOp::Lt,
            right: Primary::Literal(Constant::Integer(5)),
        }),
        Box::new(Expr::Bare(Primary::Column("b".into()))),
    );
    assert_eq!(e.to_string(), "(a < 5 AND b)");
}
