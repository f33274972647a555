//! Extension trait for wrapping streams in shared and replayable buffers.
//!
//! This module provides the `PartitionStreamExt` trait which adds `share`,
//! `publish` and `memoize` methods (plus their fallible `try_` counterparts)
//! to any type that implements `Stream + Unpin`.

use futures_util::stream::Stream;

use crate::replay::{MemoizeBuffer, PublishBuffer};
use crate::share::SharedBuffer;
use crate::source::{Lift, TryLift};

/// Extension trait for [`Stream`] that provides buffer constructors.
pub trait PartitionStreamExt: Stream {
    /// Shares one run of this stream between any number of cursors.
    ///
    /// All cursors share a single position: each element is delivered to
    /// exactly one of them, and cursors created later join at the current
    /// frontier.
    ///
    /// ```
    /// use futures_util::stream;
    /// use stream_partition::PartitionStreamExt;
    ///
    /// # tokio_test::block_on(async {
    /// let shared = stream::iter(0..3).share();
    /// let mut cursor = shared.cursor();
    /// assert_eq!(cursor.next().await.unwrap(), Some(0));
    /// # });
    /// ```
    fn share(self) -> SharedBuffer<Lift<Self>>
    where
        Self: Sized + Unpin,
    {
        SharedBuffer::new(Lift::new(self))
    }

    /// Shares one run of a fallible stream between any number of cursors.
    ///
    /// A pull error is published as a terminal event and surfaced to every
    /// cursor that reaches the failing position.
    fn try_share<T, E>(self) -> SharedBuffer<TryLift<Self>>
    where
        Self: Stream<Item = Result<T, E>> + Sized + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        SharedBuffer::new(TryLift::new(self))
    }

    /// Shares one run of this stream, replaying it from the start for every
    /// cursor.
    fn publish(self) -> PublishBuffer<Lift<Self>>
    where
        Self: Sized + Unpin,
    {
        PublishBuffer::new(Lift::new(self))
    }

    /// Fallible counterpart of [`publish`](PartitionStreamExt::publish).
    fn try_publish<T, E>(self) -> PublishBuffer<TryLift<Self>>
    where
        Self: Stream<Item = Result<T, E>> + Sized + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        PublishBuffer::new(TryLift::new(self))
    }

    /// Shares one run of this stream with full replay and a declared reader
    /// budget. `None` leaves the reader count unbounded.
    ///
    /// ```
    /// use futures_util::stream;
    /// use stream_partition::{PartitionStreamExt, ShareError};
    ///
    /// let memoized = stream::iter(0..3).memoize(Some(2));
    /// assert!(memoized.cursor().is_ok());
    /// assert!(memoized.cursor().is_ok());
    /// assert!(matches!(
    ///     memoized.cursor(),
    ///     Err(ShareError::ReaderBudgetExceeded { max: 2 })
    /// ));
    /// ```
    fn memoize(self, max_readers: Option<usize>) -> MemoizeBuffer<Lift<Self>>
    where
        Self: Sized + Unpin,
    {
        MemoizeBuffer::new(Lift::new(self), max_readers)
    }

    /// Fallible counterpart of [`memoize`](PartitionStreamExt::memoize).
    fn try_memoize<T, E>(self, max_readers: Option<usize>) -> MemoizeBuffer<TryLift<Self>>
    where
        Self: Stream<Item = Result<T, E>> + Sized + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        MemoizeBuffer::new(TryLift::new(self), max_readers)
    }
}

impl<S> PartitionStreamExt for S where S: Stream {}
