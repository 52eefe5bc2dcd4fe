//! Walks the `pest` parse tree produced by [`super::SqlParser`] into the
//! AST in [`super::ast`]. Named `build` rather than the teacher's
//! `pt_to_ast` simply because this parser has only one AST to build into,
//! not several competing ones.

use pest::iterators::Pair;
use pest::Parser;

use super::ast::*;
use super::{Rule, SqlParser};
use crate::value::ColumnType;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("parse error: {0}")]
    Syntax(String),
}

impl From<pest::error::Error<Rule>> for Error {
    fn from(e: pest::error::Error<Rule>) -> Self {
        Error::Syntax(e.to_string())
    }
}

/// Parses one SQL statement (§4.7). Any lexical or grammatical failure
/// returns [`Error::Syntax`]; there is no partial AST to leak, since the
/// `pest` parse itself fails before any AST node is built.
pub fn parse(sql: &str) -> Result<Statement, Error> {
    let mut pairs = SqlParser::parse(Rule::stmt, sql)?;
    let stmt_pair = pairs
        .next()
        .ok_or_else(|| Error::Syntax("empty input".to_string()))?;
    let inner = stmt_pair
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| Error::Syntax("empty statement".to_string()))?;
    match inner.as_rule() {
        Rule::create => Ok(Statement::Create(build_create(inner))),
        Rule::insert => Ok(Statement::Insert(build_insert(inner))),
        Rule::select => Ok(Statement::Select(build_select(inner))),
        Rule::show_create => Ok(Statement::ShowCreateTable(build_ident_only(inner))),
        Rule::show_tables => Ok(Statement::ShowTables(build_show_tables(inner))),
        Rule::describe => Ok(Statement::Describe(build_ident_only(inner))),
        other => Err(Error::Syntax(format!("unexpected top-level rule: {:?}", other))),
    }
}

fn build_ident_only(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .expect("rule guarantees an ident")
        .as_str()
        .to_string()
}

fn build_create(pair: Pair<Rule>) -> CreateStatement {
    let mut inner = pair.into_inner();
    let table_name = inner.next().unwrap().as_str().to_string();
    let columns = inner.map(build_col_def).collect();
    CreateStatement { table_name, columns }
}

fn build_col_def(pair: Pair<Rule>) -> ColDef {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let type_pair = inner.next().unwrap();
    let col_type: ColumnType = type_pair
        .as_str()
        .parse()
        .expect("grammar only accepts recognised type keywords");
    let length = inner.next().map(|p| p.as_str().parse::<u32>().unwrap());
    ColDef { name, col_type, length }
}

fn build_insert(pair: Pair<Rule>) -> InsertStatement {
    let mut inner = pair.into_inner();
    let table_name = inner.next().unwrap().as_str().to_string();
    let values = inner.map(build_value).collect();
    InsertStatement { table_name, values }
}

fn build_value(pair: Pair<Rule>) -> Constant {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::integer => Constant::Integer(inner.as_str().parse().unwrap()),
        Rule::real => Constant::Real(inner.as_str().parse().unwrap()),
        Rule::string => Constant::Text(unquote(inner.as_str())),
        Rule::null_lit => Constant::Null,
        other => unreachable!("value rule only yields literals, got {:?}", other),
    }
}

fn unquote(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

fn build_select(pair: Pair<Rule>) -> SelectStatement {
    let mut inner = pair.into_inner();
    let select_list = inner.next().unwrap();
    let columns = build_select_columns(select_list);
    let table_name = inner.next().unwrap().as_str().to_string();
    let where_clause = inner.next().map(build_expr);
    SelectStatement {
        table_name,
        columns,
        where_clause,
    }
}

fn build_select_columns(pair: Pair<Rule>) -> SelectColumns {
    if pair.as_str().trim() == "*" {
        return SelectColumns::All;
    }
    let names = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .collect();
    SelectColumns::Named(names)
}

fn build_show_tables(pair: Pair<Rule>) -> ShowTablesStatement {
    let like_pattern = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::string)
        .map(|p| unquote(p.as_str()));
    ShowTablesStatement { like_pattern }
}

/// `or_expr -> and_expr (OR and_expr)*`, left-associative.
fn build_expr(pair: Pair<Rule>) -> Expr {
    let or_expr = pair.into_inner().next().unwrap(); // expr -> or_expr
    build_or_expr(or_expr)
}

fn build_or_expr(pair: Pair<Rule>) -> Expr {
    let mut and_exprs = pair.into_inner().map(build_and_expr);
    let first = and_exprs.next().unwrap();
    and_exprs.fold(first, |acc, next| Expr::Or(Box::new(acc), Box::new(next)))
}

fn build_and_expr(pair: Pair<Rule>) -> Expr {
    let mut cmps = pair.into_inner().map(build_cmp);
    let first = cmps.next().unwrap();
    cmps.fold(first, |acc, next| Expr::And(Box::new(acc), Box::new(next)))
}

fn build_cmp(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let left_pair = inner.next().unwrap();
    match (inner.next(), inner.next()) {
        (Some(op_pair), Some(right_pair)) => Expr::Comparison {
            left: build_primary_operand(left_pair),
            op: build_cmp_op(op_pair),
            right: build_primary_operand(right_pair),
        },
        // No comparison operator: this `primary` stands alone, which
        // includes the `"(" ~ expr ~ ")"` grouping case -- parentheses
        // around a full boolean sub-expression only make sense here.
        _ => build_primary_as_bare_expr(left_pair),
    }
}

fn build_cmp_op(pair: Pair<Rule>) -> CmpOp {
    match pair.as_str() {
        "=" => CmpOp::Eq,
        "!=" => CmpOp::Ne,
        "<" => CmpOp::Lt,
        "<=" => CmpOp::Le,
        ">" => CmpOp::Gt,
        ">=" => CmpOp::Ge,
        other => unreachable!("grammar only emits known comparison operators, got {}", other),
    }
}

/// A `primary` used as a comparison operand: must be a column or literal.
fn build_primary_operand(pair: Pair<Rule>) -> Primary {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::value => Primary::Literal(build_value(inner)),
        Rule::ident => Primary::Column(inner.as_str().to_string()),
        Rule::expr => unreachable!("a parenthesised sub-expression cannot be a comparison operand"),
        other => unreachable!("unexpected primary inner rule: {:?}", other),
    }
}

/// A `primary` used on its own (no trailing comparison operator):
/// resolves the `"(" ~ expr ~ ")"` grouping case by recursing into the
/// grouped expression.
fn build_primary_as_bare_expr(pair: Pair<Rule>) -> Expr {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::expr => build_expr(inner),
        Rule::value => Expr::Bare(Primary::Literal(build_value(inner))),
        Rule::ident => Expr::Bare(Primary::Column(inner.as_str().to_string())),
        other => unreachable!("unexpected primary inner rule: {:?}", other),
    }
}

#[test]
fn test_parse_create_table() {
    let stmt = parse("CREATE TABLE users (id INTEGER, name TEXT, score REAL)").unwrap();
    let create = stmt.into_create().unwrap();
    assert_eq!(create.table_name, "users");
    assert_eq!(create.columns.len(), 3);
    assert_eq!(create.columns[0].col_type, ColumnType::Integer);
    assert_eq!(create.columns[1].col_type, ColumnType::Text);
    assert_eq!(create.columns[2].col_type, ColumnType::Real);
}

#[test]
fn test_parse_create_table_with_text_length() {
    let stmt = parse("CREATE TABLE t (ip TEXT(16))").unwrap();
    let create = stmt.into_create().unwrap();
    assert_eq!(create.columns[0].length, Some(16));
}

#[test]
fn test_parse_insert() {
    let stmt = parse("INSERT INTO users VALUES (1, 'Alice', 95.5)").unwrap();
    let insert = stmt.into_insert().unwrap();
    assert_eq!(insert.table_name, "users");
    assert_eq!(
        insert.values,
        vec![Constant::Integer(1), Constant::Text("Alice".into()), Constant::Real(95.5)]
    );
}

#[test]
fn test_parse_select_star_no_where() {
    let stmt = parse("SELECT * FROM users").unwrap();
    let select = stmt.into_select().unwrap();
    assert_eq!(select.columns, SelectColumns::All);
    assert!(select.where_clause.is_none());
}

#[test]
fn test_parse_select_named_columns() {
    let stmt = parse("SELECT id, name FROM users").unwrap();
    let select = stmt.into_select().unwrap();
    assert_eq!(
        select.columns,
        SelectColumns::Named(vec!["id".into(), "name".into()])
    );
}

#[test]
fn test_parse_select_where_comparison() {
    let stmt = parse("SELECT * FROM t WHERE a < 500").unwrap();
    let select = stmt.into_select().unwrap();
    match select.where_clause.unwrap() {
        Expr::Comparison { left, op, right } => {
            assert_eq!(left, Primary::Column("a".into()));
            assert_eq!(op, CmpOp::Lt);
            assert_eq!(right, Primary::Literal(Constant::Integer(500)));
        }
        other => panic!("expected a comparison, got {:?}", other),
    }
}

#[test]
fn test_parse_select_where_and_or_precedence() {
    // AND binds tighter than OR: `a OR b AND c` == `a OR (b AND c)`.
    let stmt = parse("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3").unwrap();
    let select = stmt.into_select().unwrap();
    match select.where_clause.unwrap() {
        Expr::Or(left, right) => {
            assert!(matches!(*left, Expr::Comparison { .. }));
            assert!(matches!(*right, Expr::And(_, _)));
        }
        other => panic!("expected OR at the top, got {:?}", other),
    }
}

#[test]
fn test_parse_show_tables_with_like() {
    let stmt = parse("SHOW TABLES LIKE 'user%'").unwrap();
    let show = stmt.into_show_tables().unwrap();
    assert_eq!(show.like_pattern, Some("user%".to_string()));
}

#[test]
fn test_parse_describe_and_desc() {
    assert_eq!(parse("DESCRIBE users").unwrap().into_describe().unwrap(), "users");
    assert_eq!(parse("DESC users").unwrap().into_describe().unwrap(), "users");
}

#[test]
fn test_parse_show_create_table() {
    let stmt = parse("SHOW CREATE TABLE users").unwrap();
    assert_eq!(stmt.into_show_create_table().unwrap(), "users");
}

#[test]
fn test_parse_is_case_insensitive_on_keywords() {
    assert!(parse("select * from users").is_ok());
    assert!(parse("Select * From users").is_ok());
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(parse("NOT REALLY SQL AT ALL").is_err());
}

#[test]
fn test_parse_parenthesised_grouping_overrides_precedence() {
    // Without parens `a = 1 OR b = 2 AND c = 3` would be `a=1 OR (b=2 AND c=3)`.
    // With parens around the first two, grouping must win.
    let stmt = parse("SELECT * FROM t WHERE (a = 1 OR b = 2) AND c = 3").unwrap();
    let select = stmt.into_select().unwrap();
    match select.where_clause.unwrap() {
        Expr::And(left, right) => {
            assert!(matches!(*left, Expr::Or(_, _)));
            assert!(matches!(*right, Expr::Comparison { .. }));
        }
        other => panic!("expected AND at the top, got {:?}", other),
    }
}
