use thiserror::Error;

use crate::Timestamp;

pub type PvResult<T> = Result<T, PvError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PvError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Timestamps must be strictly increasing ({previous} followed by {next})")]
    UnorderedTimestamps {
        previous: Timestamp,
        next: Timestamp,
    },
}
