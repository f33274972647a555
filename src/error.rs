//! Error types surfaced by buffers, cursors and partitioners.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A failure raised by a wrapped source while pulling the next element.
///
/// The original error is stored behind an [`Arc`] so that the same failure can
/// be published once at the frontier and then cheaply re-surfaced to every
/// cursor that reaches that position.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl SourceFailure {
    /// Wraps an arbitrary source error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Returns a reference to the wrapped source error.
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for SourceFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// Errors produced while advancing cursors or creating partitions.
///
/// None of these are retried internally: each one indicates a caller
/// configuration error or an unrecoverable upstream failure.
#[derive(Debug, Clone, Error)]
pub enum ShareError {
    /// The buffer was disposed; no cursor associated with it can advance again.
    #[error("shared buffer has been disposed")]
    Disposed,

    /// A partition count of zero was requested.
    #[error("partition count must be at least 1, got {requested}")]
    InvalidPartitionCount {
        /// The rejected partition count.
        requested: usize,
    },

    /// A memoizing buffer refused to create a cursor beyond its declared
    /// reader budget.
    #[error("reader budget exceeded: at most {max} cursors may be created")]
    ReaderBudgetExceeded {
        /// The declared maximum number of readers.
        max: usize,
    },

    /// A replay traversal was started beyond the declared reader budget.
    #[error("replay budget exceeded: at most {max} traversals are allowed")]
    ReplayBudgetExceeded {
        /// The declared maximum number of traversals.
        max: usize,
    },

    /// The partitioner does not hand out dynamic partitions.
    #[error("this partitioner does not support dynamic partitions")]
    DynamicPartitionsUnsupported,

    /// The wrapped source failed during a pull. Once published, the same
    /// failure is returned to every cursor reaching the frontier.
    #[error("source failed: {0}")]
    Source(#[from] SourceFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_failure_preserves_the_original_error() {
        let failure = SourceFailure::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        assert_eq!(failure.to_string(), "connection reset");
        assert!(failure.get_ref().is::<std::io::Error>());

        let clone = failure.clone();
        assert_eq!(clone.to_string(), failure.to_string());
    }

    #[test]
    fn test_share_error_display() {
        let error = ShareError::InvalidPartitionCount { requested: 0 };
        assert_eq!(error.to_string(), "partition count must be at least 1, got 0");

        let error = ShareError::ReaderBudgetExceeded { max: 2 };
        assert!(error.to_string().contains("at most 2 cursors"));
    }
}
