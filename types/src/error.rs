//! Errors raised when constructing core types from untrusted input.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid item id: {0} (must be a positive integer)")]
    InvalidItemId(i64),

    #[error("unparseable item id: {0:?}")]
    UnparseableItemId(String),

    #[error("originator id must not be blank")]
    BlankOriginator,
}
