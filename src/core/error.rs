//! Error taxonomy of the rove core.
//!
//! Plain filesystem primitives return [std::io::Result] just like `browse_dir` does.
//! Everything that may also be cancelled, refused at construction, or hit an empty history
//! stack returns the crate [Result] with an [Error].

use std::io;

/// Errors produced by the navigation and concurrency core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A [crate::core::cache::Cache] needs exactly one ordering function.
    #[error("cache needs exactly one ordering function (by key or by value)")]
    AmbiguousOrdering,

    /// History back/forward with nothing on the requested side.
    #[error("nothing to go back or forward to")]
    StackEmpty,

    /// The shared cancellation token was triggered before the operation ran.
    #[error("operation cancelled")]
    Cancelled,

    /// Search pattern could not be compiled.
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True for intentional cancellation, so callers can keep it out of user-facing messages.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The [io::ErrorKind] when this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_distinct_from_io() {
        let cancelled = Error::Cancelled;
        let io_err = Error::from(io::Error::from(io::ErrorKind::NotFound));

        assert!(cancelled.is_cancelled());
        assert!(!io_err.is_cancelled());
        assert_eq!(io_err.io_kind(), Some(io::ErrorKind::NotFound));
        assert_eq!(cancelled.io_kind(), None);
    }
}
