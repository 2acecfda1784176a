//! Assembler error kinds.
//!
//! Every variant is surfaced to the user with the source location that
//! triggered it; [`crate::pass::Driver`] attaches `file`/`line` once it
//! knows which statement raised the error.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("undefined symbol: {0}")]
    Undefined(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("range error: {0}")]
    Range(String),

    #[error("illegal instruction: {0}")]
    Illegal(String),

    #[error("section error: {0}")]
    Section(String),

    #[error("macro error: {0}")]
    Macro(String),

    #[error("assertion failed: {0}")]
    Assert(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e.to_string())
    }
}

/// A located error, the unit the pass driver accumulates and the CLI prints.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub file: String,
    pub line: usize,
    pub error: Error,
}

impl std::fmt::Display for Located {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.error)
    }
}
