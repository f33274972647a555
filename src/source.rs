//! Source abstractions: cold-sequence factories and the pull-result adapters
//! that normalize every source into the stream shape consumed by the buffers.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::Stream;

use crate::error::SourceFailure;

/// A factory for cold sequences.
///
/// Every call to [`produce`](LazySource::produce) restarts production from
/// scratch and returns a fresh forward-only stream. The trait is implemented
/// for any zero-argument closure returning a stream, so a plain
/// `|| stream::iter(0..5)` is already a `LazySource`.
///
/// Buffers wrap exactly one invocation of a factory; the factory itself stays
/// with the caller and can be invoked again for an independent re-run.
pub trait LazySource {
    /// The element type produced by each run.
    type Item;
    /// The stream type returned by one run of the factory.
    type Stream: Stream<Item = Self::Item>;

    /// Starts a fresh run of the sequence.
    fn produce(&self) -> Self::Stream;
}

impl<F, S> LazySource for F
where
    F: Fn() -> S,
    S: Stream,
{
    type Item = S::Item;
    type Stream = S;

    fn produce(&self) -> S {
        (self)()
    }
}

/// A stream that delays invoking its factory until it is first polled.
///
/// Useful when constructing the factory's stream has side effects of its own
/// that should not run before anyone actually consumes the sequence.
///
/// ```
/// use futures_util::stream::{self, StreamExt};
/// use stream_partition::defer;
///
/// # tokio_test::block_on(async {
/// let deferred = defer(|| stream::iter(0..3));
/// let values: Vec<i32> = deferred.collect().await;
/// assert_eq!(values, vec![0, 1, 2]);
/// # });
/// ```
pub struct Defer<L: LazySource> {
    factory: L,
    stream: Option<L::Stream>,
}

/// Wraps a [`LazySource`] into a stream that starts production lazily.
pub fn defer<L: LazySource>(source: L) -> Defer<L> {
    Defer {
        factory: source,
        stream: None,
    }
}

impl<L> Stream for Defer<L>
where
    L: LazySource + Unpin,
    L::Stream: Unpin,
{
    type Item = L::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let stream = this.stream.get_or_insert_with(|| this.factory.produce());
        Pin::new(stream).poll_next(cx)
    }
}

/// Adapts an infallible stream into the pull-result stream the buffers
/// consume. Every item is passed through as `Ok`.
#[derive(Debug)]
pub struct Lift<S> {
    inner: S,
}

impl<S> Lift<S> {
    /// Wraps a stream whose pulls never fail.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> Stream for Lift<S>
where
    S: Stream + Unpin,
{
    type Item = Result<S::Item, SourceFailure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_next(cx)
            .map(|item| item.map(Ok))
    }
}

/// Adapts a fallible stream (one yielding `Result<T, E>`) into the pull-result
/// stream the buffers consume, converting each `E` into a [`SourceFailure`].
#[derive(Debug)]
pub struct TryLift<S> {
    inner: S,
}

impl<S> TryLift<S> {
    /// Wraps a stream whose pulls may fail.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, T, E> Stream for TryLift<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<T, SourceFailure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_next(cx)
            .map(|item| item.map(|result| result.map_err(SourceFailure::new)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_defer_delays_factory_invocation() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invocations);
        let deferred = defer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            stream::iter(0..3)
        });

        // Building the stream must not run the factory.
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        let values: Vec<i32> = deferred.collect().await;
        assert_eq!(values, vec![0, 1, 2]);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_source_restarts_per_produce() {
        let source = || stream::iter(vec![10, 20]);
        let first: Vec<i32> = source.produce().collect().await;
        let second: Vec<i32> = source.produce().collect().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_lift_passes_items_through() {
        let lifted = Lift::new(stream::iter(0..3));
        let values: Vec<Result<i32, SourceFailure>> = lifted.collect().await;
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|item| item.is_ok()));
    }

    #[tokio::test]
    async fn test_try_lift_converts_errors() {
        let items: Vec<Result<i32, std::io::Error>> = vec![
            Ok(1),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom")),
        ];
        let lifted = TryLift::new(stream::iter(items));
        let values: Vec<Result<i32, SourceFailure>> = lifted.collect().await;
        assert!(values[0].is_ok());
        assert_eq!(values[1].as_ref().unwrap_err().to_string(), "boom");
    }
}
