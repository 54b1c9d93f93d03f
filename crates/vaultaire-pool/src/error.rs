//! Pool Error Types
//!
//! Every pool operation returns `Result<T>` aliased to `Result<T, Error>`.
//! "Object absent" is not an error: `stat` and `read_full` express it as
//! `None`, because readers routinely probe objects that were never
//! written. Anything else a backend reports is fatal to the operation
//! that hit it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed object label: {0}")]
    BadLabel(String),

    #[error("Pool backend error: {0}")]
    Backend(String),
}
