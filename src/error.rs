//! Crate-wide error taxonomy.
//!
//! Each module with fallible operations defines its own narrow
//! `thiserror::Error` enum (see [`crate::pager`], [`crate::engine_b`],
//! [`crate::parser`]); this module aggregates them into one [`Error`] via
//! `#[from]`, and maps that onto the public, C-ABI-shaped [`ResultCode`]
//! used by [`crate::db::DbHandle::exec`]/[`crate::db::DbHandle::query`].

use std::fmt;

/// Top-level error type returned by the library's internal `Result`s.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("out of memory")]
    NoMem,
    #[error("engine B table error: {0}")]
    EngineB(#[from] crate::engine_b::file::Error),
    #[error("parser error: {0}")]
    Grammar(#[from] crate::parser::Error),
    #[error(transparent)]
    Catalog(#[from] crate::catalog::Error),
    #[error(transparent)]
    Table(#[from] crate::table::Error),
    #[error(transparent)]
    Planner(#[from] crate::planner::Error),
    #[error(transparent)]
    Predicate(#[from] crate::predicate::Error),
    #[error(transparent)]
    Pager(#[from] crate::pager::Error),
    #[error(transparent)]
    Executor(#[from] crate::executor::Error),
    #[error("internal error: {0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// C-ABI-shaped result code, mirroring `RistrettoResult` in the original
/// source (`db.h`) and §6.3's enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
    Ok = 0,
    Error = -1,
    NoMem = -2,
    IoError = -3,
    ParseError = -4,
    NotFound = -5,
    ConstraintError = -6,
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(error_string(*self))
    }
}

/// Maps a [`ResultCode`] to a human-readable message, as required by §6.3's
/// `error_string`.
pub fn error_string(code: ResultCode) -> &'static str {
    match code {
        ResultCode::Ok => "ok",
        ResultCode::Error => "error",
        ResultCode::NoMem => "out of memory",
        ResultCode::IoError => "I/O error",
        ResultCode::ParseError => "parse error",
        ResultCode::NotFound => "not found",
        ResultCode::ConstraintError => "constraint error",
    }
}

impl From<&Error> for ResultCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::Parse(_) | Error::Grammar(_) => ResultCode::ParseError,
            Error::NotFound(_) => ResultCode::NotFound,
            Error::Constraint(_) => ResultCode::ConstraintError,
            Error::Io(_) => ResultCode::IoError,
            Error::NoMem => ResultCode::NoMem,
            Error::EngineB(inner) => ResultCode::from(inner),
            Error::Catalog(crate::catalog::Error::AlreadyExists(_)) => ResultCode::ConstraintError,
            Error::Catalog(crate::catalog::Error::NotFound(_)) => ResultCode::NotFound,
            Error::Table(crate::table::Error::DuplicateKey(_)) => ResultCode::ConstraintError,
            Error::Table(crate::table::Error::ColumnNotFound(_)) => ResultCode::NotFound,
            Error::Table(crate::table::Error::Pager(_)) => ResultCode::IoError,
            Error::Table(crate::table::Error::Codec(_)) => ResultCode::ConstraintError,
            Error::Planner(crate::planner::Error::TableNotFound(_)) => ResultCode::NotFound,
            Error::Planner(crate::planner::Error::TableExists(_)) => ResultCode::ConstraintError,
            Error::Planner(_) => ResultCode::ConstraintError,
            Error::Predicate(_) => ResultCode::Error,
            Error::Pager(_) => ResultCode::IoError,
            Error::Executor(crate::executor::Error::TableNotFound(_)) => ResultCode::NotFound,
            Error::Executor(crate::executor::Error::ColumnNotFound(_)) => ResultCode::NotFound,
            Error::Executor(_) => ResultCode::Error,
            Error::Generic(_) => ResultCode::Error,
        }
    }
}

impl From<&crate::engine_b::file::Error> for ResultCode {
    fn from(e: &crate::engine_b::file::Error) -> Self {
        use crate::engine_b::file::Error as E;
        match e {
            E::Io(_) => ResultCode::IoError,
            E::BadMagic | E::UnsupportedVersion(_) => ResultCode::Error,
            E::TooManyColumns(_) | E::SchemaParse(_) => ResultCode::ParseError,
            E::Closed => ResultCode::Error,
            E::RowSize { .. } => ResultCode::ConstraintError,
            E::Predicate(_) => ResultCode::Error,
        }
    }
}

#[test]
fn test_error_string_matches_codes() {
    assert_eq!(error_string(ResultCode::Ok), "ok");
    assert_eq!(error_string(ResultCode::ConstraintError), "constraint error");
}

#[test]
fn test_resultcode_values_match_source() {
    // RistrettoResult in db.h: OK=0, ERROR=-1, NOMEM=-2, IO_ERROR=-3,
    // PARSE_ERROR=-4, NOT_FOUND=-5, CONSTRAINT_ERROR=-6.
    assert_eq!(ResultCode::Ok as i32, 0);
    assert_eq!(ResultCode::Error as i32, -1);
    assert_eq!(ResultCode::NoMem as i32, -2);
    assert_eq!(ResultCode::IoError as i32, -3);
    assert_eq!(ResultCode::ParseError as i32, -4);
    assert_eq!(ResultCode::NotFound as i32, -5);
    assert_eq!(ResultCode::ConstraintError as i32, -6);
}
