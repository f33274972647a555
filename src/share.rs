//! Exactly-once sharing of a single stream across many concurrent consumers.
//!
//! [`SharedBuffer`] wraps one run of a source stream so that any number of
//! [`SharedCursor`]s can pull from it concurrently. All cursors share one
//! position: each successful advancement pulls exactly one new element from
//! the source, so across the buffer's whole lifetime every element is
//! delivered to precisely one cursor. Which cursor receives which element is
//! a pure race decided by who asks first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{Stream, TryStream, TryStreamExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{ShareError, SourceFailure};

struct Inner<S> {
    /// The wrapped source; `None` once exhausted, failed or disposed.
    source: Option<S>,
    /// Number of elements pulled and published so far.
    frontier: u64,
    /// Terminal failure published at the frontier, if any.
    failure: Option<SourceFailure>,
}

struct State<S> {
    inner: Mutex<Inner<S>>,
    disposed: AtomicBool,
    #[cfg(feature = "stats")]
    stats: crate::stats::Stats,
}

/// A handle sharing one run of a source stream between many cursors.
///
/// The buffer is fully lazy: nothing is pulled from the source until a cursor
/// first advances. Cursors created after the buffer has already advanced join
/// at the current frontier; they do not rewind to the start. This is what
/// makes a shared handle useful for forcing a side-effecting source to run
/// exactly once even when it appears several times in one query — for example
/// when concatenating a handle with itself.
///
/// # Examples
///
/// Two cursors racing over one source together observe every element exactly
/// once:
///
/// ```
/// use futures_util::stream;
/// use stream_partition::PartitionStreamExt;
///
/// # tokio_test::block_on(async {
/// let shared = stream::iter(0..4).share();
/// let mut left = shared.cursor();
/// let mut right = shared.cursor();
///
/// assert_eq!(left.next().await.unwrap(), Some(0));
/// assert_eq!(right.next().await.unwrap(), Some(1));
/// assert_eq!(left.next().await.unwrap(), Some(2));
/// assert_eq!(right.next().await.unwrap(), Some(3));
/// assert_eq!(left.next().await.unwrap(), None);
/// assert_eq!(right.next().await.unwrap(), None);
/// # });
/// ```
pub struct SharedBuffer<S> {
    state: Arc<State<S>>,
}

impl<S> Clone for SharedBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> SharedBuffer<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    /// Wraps a pull-result stream in a new shared buffer.
    ///
    /// Most callers go through
    /// [`PartitionStreamExt::share`](crate::PartitionStreamExt::share) or
    /// [`PartitionStreamExt::try_share`](crate::PartitionStreamExt::try_share)
    /// instead of adapting the source by hand.
    pub fn new(source: S) -> Self {
        debug!("shared buffer created");
        Self {
            state: Arc::new(State {
                inner: Mutex::new(Inner {
                    source: Some(source),
                    frontier: 0,
                    failure: None,
                }),
                disposed: AtomicBool::new(false),
                #[cfg(feature = "stats")]
                stats: crate::stats::Stats::new(),
            }),
        }
    }

    /// Creates a new cursor joining at the current frontier.
    ///
    /// There is no bound on the number of concurrent cursors.
    pub fn cursor(&self) -> SharedCursor<S> {
        #[cfg(feature = "stats")]
        self.state.stats.increment();
        SharedCursor {
            state: Arc::clone(&self.state),
        }
    }

    /// Disposes the buffer, releasing the underlying source.
    ///
    /// Every subsequent [`SharedCursor::next`] call on any cursor of this
    /// buffer fails with [`ShareError::Disposed`]. Disposing an already
    /// disposed buffer is a no-op.
    pub async fn dispose(&self) {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut inner = self.state.inner.lock().await;
        inner.source = None;
        debug!(frontier = inner.frontier, "shared buffer disposed");
    }

    /// Returns a diagnostics handle counting the buffer's live cursors.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> crate::stats::Stats {
        self.state.stats.clone()
    }
}

/// One consumer's handle into a [`SharedBuffer`].
///
/// Cloning a cursor is equivalent to calling
/// [`SharedBuffer::cursor`]: the clone draws from the same shared position.
/// This is what makes the dynamic-partitioning view work — any number of
/// workers clone one cursor and pull from it concurrently.
pub struct SharedCursor<S> {
    state: Arc<State<S>>,
}

impl<S> SharedCursor<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    /// Advances the shared position by one element.
    ///
    /// Returns `Ok(Some(item))` with the next source element, `Ok(None)` once
    /// the source is exhausted, or an error if the buffer was disposed or the
    /// source failed. The pull-and-publish step runs under the buffer's
    /// single-producer section: exactly one cursor at a time drives the
    /// source, and a call never blocks on another cursor's unrelated work.
    pub async fn next(&mut self) -> Result<Option<S::Ok>, ShareError> {
        if self.state.disposed.load(Ordering::Acquire) {
            return Err(ShareError::Disposed);
        }
        let mut inner = self.state.inner.lock().await;
        // Disposal may have won the race while we waited for the lock.
        if self.state.disposed.load(Ordering::Acquire) {
            return Err(ShareError::Disposed);
        }
        if let Some(failure) = &inner.failure {
            return Err(ShareError::Source(failure.clone()));
        }
        let Some(source) = inner.source.as_mut() else {
            return Ok(None);
        };
        match source.try_next().await {
            Ok(Some(item)) => {
                inner.frontier += 1;
                trace!(frontier = inner.frontier, "element published");
                Ok(Some(item))
            }
            Ok(None) => {
                inner.source = None;
                debug!(frontier = inner.frontier, "source exhausted");
                Ok(None)
            }
            Err(failure) => {
                inner.failure = Some(failure.clone());
                inner.source = None;
                debug!(frontier = inner.frontier, "source failure published");
                Err(ShareError::Source(failure))
            }
        }
    }

    /// Converts this cursor into a stream of pull results.
    ///
    /// The stream yields each element as `Ok`, terminates on exhaustion, and
    /// yields a single `Err` then terminates if advancement fails. This is
    /// the adapter that lets cursors compose with `futures-util` combinators
    /// such as `chain` and `zip`.
    pub fn into_stream(self) -> impl Stream<Item = Result<S::Ok, ShareError>> {
        futures_util::stream::unfold(Some(self), |cursor| async move {
            let mut cursor = cursor?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
    }
}

impl<S> Clone for SharedCursor<S> {
    fn clone(&self) -> Self {
        #[cfg(feature = "stats")]
        self.state.stats.increment();
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[cfg(feature = "stats")]
impl<S> Drop for SharedCursor<S> {
    fn drop(&mut self) {
        self.state.stats.decrement();
    }
}
