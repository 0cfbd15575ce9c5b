//! Error types for the tree and color coder.

use thiserror::Error;

/// Contract violations reported by mutating and querying calls.
///
/// Every call that returns one of these leaves its data structure untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("index {index} out of range for view of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("cannot take {length} elements at {index} from view of size {size}")]
    RangeOutOfBounds { index: usize, length: usize, size: usize },

    #[error("runs must contain at least one element")]
    ZeroLength,

    #[error("{count} colors registered, at most {max} are supported")]
    TooManyColors { count: usize, max: usize },

    #[error("color registered twice: {0}")]
    DuplicateColor(String),

    #[error("unknown color: {0}")]
    UnknownColor(String),

    #[error("not a single registered color bit: {0:#010b}")]
    InvalidColor(u8),

    #[error("node handle refers to a removed node")]
    StaleHandle,
}

pub type Result<T> = std::result::Result<T, Error>;
