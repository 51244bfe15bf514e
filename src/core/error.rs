//! Error types for octcast

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InputParse(String),

    #[error("cannot open '{0}'")]
    IoMissing(PathBuf),

    #[error("file '{0}' is truncated or has a malformed size")]
    IoShort(PathBuf),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("coordinate out of range: {0}")]
    RangeCheck(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code the builder maps this error to.
    ///
    /// 1 and 2 are fixed by the CLI contract (numeric parse error, wrong
    /// argument count); the remaining kinds get distinct nonzero codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InputParse(_) => 1,
            Error::IoMissing(_) | Error::IoShort(_) | Error::Io(_) => 3,
            Error::Invariant(_) => 4,
            Error::RangeCheck(_) => 5,
        }
    }
}
