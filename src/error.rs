//! Error types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which kind of block a structural error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    If,
    Foreach,
    Comment,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::If => f.write_str("if"),
            BlockKind::Foreach => f.write_str("foreach"),
            BlockKind::Comment => f.write_str("comment"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// Malformed expression: bad literal, unbalanced parentheses or a
    /// missing operand.
    #[error("SYNTAX_ERROR: {message} in `{expression}` at offset {offset}")]
    Syntax {
        expression: String,
        offset: usize,
        message: String,
    },

    /// A block opened on `line` never closes. Recoverable: the end of the
    /// document closes it.
    #[error("UNCLOSED_BLOCK: `{kind}` opened on line {line} has no closing marker")]
    UnclosedBlock { kind: BlockKind, line: usize },

    /// A close marker with no open block. Recoverable: the marker is dropped.
    #[error("UNMATCHED_CLOSE: `{{/{kind}}}` on line {line} closes nothing")]
    UnmatchedClose { kind: BlockKind, line: usize },

    #[error("INCLUDE_NOT_FOUND: '{path}': {reason}")]
    IncludeNotFound { path: String, reason: String },

    #[error("INCLUDE_CYCLE: '{path}' includes itself")]
    IncludeCycle { path: String },

    #[error("DECODE_ERROR: compiled template is unreadable: {0}")]
    Decode(String),
}

impl Error {
    pub(crate) fn syntax(expression: &str, offset: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            expression: expression.to_string(),
            offset,
            message: message.into(),
        }
    }

    /// Recoverable errors are collected as warnings instead of aborting
    /// compilation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnclosedBlock { .. } | Error::UnmatchedClose { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
