//! Replayable sharing: buffers that retain produced elements so cursors can
//! start from the beginning regardless of when they are created.
//!
//! [`PublishBuffer`] serves an unbounded number of readers; [`MemoizeBuffer`]
//! enforces a declared maximum number of readers over the buffer's lifetime.
//! Both retain the full history of produced elements for as long as the
//! buffer lives, so every cursor replays from position 0.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::stream::{Stream, TryStream, TryStreamExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{ShareError, SourceFailure};

struct ReplayInner<S: TryStream> {
    source: Option<S>,
    history: Vec<S::Ok>,
    failure: Option<SourceFailure>,
}

struct ReplayState<S: TryStream> {
    inner: Mutex<ReplayInner<S>>,
    /// Cursors ever created against this buffer.
    readers: AtomicUsize,
    /// Maximum reader count; `None` means unbounded.
    budget: Option<usize>,
    #[cfg(feature = "stats")]
    stats: crate::stats::Stats,
}

impl<S: TryStream> ReplayState<S> {
    fn new(source: S, budget: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ReplayInner {
                source: Some(source),
                history: Vec::new(),
                failure: None,
            }),
            readers: AtomicUsize::new(0),
            budget,
            #[cfg(feature = "stats")]
            stats: crate::stats::Stats::new(),
        })
    }

    /// Reserves one reader slot; fails with the declared maximum when the
    /// budget is exhausted.
    fn try_claim_reader(&self) -> Result<(), usize> {
        match self.budget {
            None => {
                self.readers.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Some(max) => self
                .readers
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                    (count < max).then(|| count + 1)
                })
                .map(|_| ())
                .map_err(|_| max),
        }
    }

    fn new_cursor(state: &Arc<Self>) -> ReplayCursor<S> {
        #[cfg(feature = "stats")]
        state.stats.increment();
        ReplayCursor {
            state: Arc::clone(state),
            position: 0,
        }
    }
}

/// A replayable shared buffer with an unbounded reader count.
///
/// Unlike [`SharedBuffer`](crate::SharedBuffer), every cursor starts at
/// position 0: elements already produced by earlier cursors are replayed from
/// the retained history before new elements are pulled at the frontier. The
/// source still runs at most once.
///
/// # Examples
///
/// Zipping a published handle with itself pairs every element with itself
/// while producing the source only once:
///
/// ```
/// use futures_util::stream::{self, StreamExt};
/// use stream_partition::PartitionStreamExt;
///
/// # tokio_test::block_on(async {
/// let published = stream::iter(0..3).publish();
/// let left = published.cursor().into_stream();
/// let right = published.cursor().into_stream();
/// let pairs: Vec<(i32, i32)> = left
///     .zip(right)
///     .map(|(a, b)| (a.unwrap(), b.unwrap()))
///     .collect()
///     .await;
/// assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2)]);
/// # });
/// ```
pub struct PublishBuffer<S: TryStream> {
    state: Arc<ReplayState<S>>,
}

impl<S: TryStream> Clone for PublishBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> PublishBuffer<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    /// Wraps a pull-result stream in a new publishing buffer.
    pub fn new(source: S) -> Self {
        debug!("publish buffer created");
        Self {
            state: ReplayState::new(source, None),
        }
    }

    /// Creates a new cursor starting at position 0.
    pub fn cursor(&self) -> ReplayCursor<S> {
        // Unbounded budget, so the claim cannot fail.
        let _ = self.state.try_claim_reader();
        ReplayState::new_cursor(&self.state)
    }

    /// Starts a lazily-acquired traversal over the buffer from position 0.
    pub fn replay(&self) -> impl Stream<Item = Result<S::Ok, ShareError>>
    where
        S::Ok: Clone,
    {
        replay_stream(Arc::clone(&self.state))
    }

    /// Returns a diagnostics handle counting the buffer's live cursors.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> crate::stats::Stats {
        self.state.stats.clone()
    }
}

/// A replayable shared buffer with a strictly enforced reader budget.
///
/// Behaves like [`PublishBuffer`] but at most `max_readers` cursors may ever
/// be created; the history is retained permanently so each of them can run a
/// full independent traversal. Passing `None` as the budget makes the buffer
/// equivalent to a publishing one.
pub struct MemoizeBuffer<S: TryStream> {
    state: Arc<ReplayState<S>>,
}

impl<S: TryStream> Clone for MemoizeBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> MemoizeBuffer<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    /// Wraps a pull-result stream in a new memoizing buffer.
    pub fn new(source: S, max_readers: Option<usize>) -> Self {
        debug!(?max_readers, "memoize buffer created");
        Self {
            state: ReplayState::new(source, max_readers),
        }
    }

    /// Creates a new cursor starting at position 0.
    ///
    /// Fails with [`ShareError::ReaderBudgetExceeded`] once `max_readers`
    /// cursors have ever been created. This is a caller configuration error
    /// and is never retried.
    pub fn cursor(&self) -> Result<ReplayCursor<S>, ShareError> {
        self.state
            .try_claim_reader()
            .map_err(|max| ShareError::ReaderBudgetExceeded { max })?;
        Ok(ReplayState::new_cursor(&self.state))
    }

    /// Starts a lazily-acquired traversal over the buffer from position 0.
    ///
    /// The reader budget is consumed when the returned stream is first
    /// polled, not when it is created. A traversal started beyond the budget
    /// yields a single [`ShareError::ReplayBudgetExceeded`] item. This is the
    /// shape combinators need: chaining three traversals of a buffer with a
    /// budget of two fails inside the third traversal, after the first two
    /// have replayed in full.
    pub fn replay(&self) -> impl Stream<Item = Result<S::Ok, ShareError>>
    where
        S::Ok: Clone,
    {
        replay_stream(Arc::clone(&self.state))
    }

    /// The declared reader budget, if any.
    pub fn max_readers(&self) -> Option<usize> {
        self.state.budget
    }

    /// Returns a diagnostics handle counting the buffer's live cursors.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> crate::stats::Stats {
        self.state.stats.clone()
    }
}

/// One consumer's replaying view into a [`PublishBuffer`] or
/// [`MemoizeBuffer`].
///
/// The cursor keeps its own position. Positions behind the frontier are
/// served from the retained history; a cursor at the frontier pulls the next
/// element from the source under the buffer's single-producer section and
/// publishes it for everyone else.
pub struct ReplayCursor<S: TryStream> {
    state: Arc<ReplayState<S>>,
    position: usize,
}

impl<S> ReplayCursor<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
    S::Ok: Clone,
{
    /// Advances this cursor by one element.
    pub async fn next(&mut self) -> Result<Option<S::Ok>, ShareError> {
        let mut inner = self.state.inner.lock().await;
        if self.position < inner.history.len() {
            let item = inner.history[self.position].clone();
            self.position += 1;
            return Ok(Some(item));
        }
        if let Some(failure) = &inner.failure {
            return Err(ShareError::Source(failure.clone()));
        }
        let Some(source) = inner.source.as_mut() else {
            return Ok(None);
        };
        match source.try_next().await {
            Ok(Some(item)) => {
                inner.history.push(item.clone());
                self.position += 1;
                trace!(frontier = inner.history.len(), "element published");
                Ok(Some(item))
            }
            Ok(None) => {
                inner.source = None;
                debug!(frontier = inner.history.len(), "source exhausted");
                Ok(None)
            }
            Err(failure) => {
                inner.failure = Some(failure.clone());
                inner.source = None;
                debug!(
                    frontier = inner.history.len(),
                    "source failure published"
                );
                Err(ShareError::Source(failure))
            }
        }
    }

    /// Converts this cursor into a stream of pull results.
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

#[cfg(feature = "stats")]
impl<S: TryStream> Drop for ReplayCursor<S> {
    fn drop(&mut self) {
        self.state.stats.decrement();
    }
}

enum ReplayStage<S: TryStream> {
    Start(Arc<ReplayState<S>>),
    Reading(ReplayCursor<S>),
}

fn replay_stream<S>(
    state: Arc<ReplayState<S>>,
) -> impl Stream<Item = Result<S::Ok, ShareError>>
where
    S: TryStream<Error = SourceFailure> + Unpin,
    S::Ok: Clone,
{
    futures_util::stream::unfold(Some(ReplayStage::Start(state)), |stage| async move {
        let mut cursor = match stage? {
            ReplayStage::Start(state) => match state.try_claim_reader() {
                Ok(()) => ReplayState::new_cursor(&state),
                Err(max) => {
                    return Some((Err(ShareError::ReplayBudgetExceeded { max }), None));
                }
            },
            ReplayStage::Reading(cursor) => cursor,
        };
        match cursor.next().await {
            Ok(Some(item)) => Some((Ok(item), Some(ReplayStage::Reading(cursor)))),
            Ok(None) => None,
            Err(error) => Some((Err(error), None)),
        }
    })
}
