//! The SQL parser (§4.7): a `pest` grammar (`grammar.pest`) plus a
//! tree-to-AST conversion pass, mirroring the teacher's split between
//! `parser.rs` (the grammar derive) and `pt_to_ast.rs` (the conversion).
//! The three ad hoc parser copies the source carries are consolidated
//! here into this one grammar, per §9's "consolidate the three legacy
//! parser copies" note.

pub mod ast;
mod build;

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
pub(crate) struct SqlParser;

pub use build::{parse, Error};
