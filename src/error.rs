use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("invalid format: {0}")]
    Format(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Narrows a length to the 32-bit fields the archive formats use.
pub(crate) fn to_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::argument(format!("{} is too large ({} bytes)", what, len)))
}

pub(crate) fn to_i32(len: usize, what: &str) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::argument(format!("{} is too large ({} bytes)", what, len)))
}
