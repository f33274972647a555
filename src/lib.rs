//! A library for sharing one lazily-produced stream across many concurrent
//! consumers, exactly once.
//!
//! The crate wraps a single run of a [`Stream`](futures_util::Stream) in a
//! buffer that many cursors can pull from concurrently, then builds
//! partitioning on top of that buffer:
//!
//! - [`SharedBuffer`] — all cursors share one position; each source element
//!   is delivered to exactly one cursor, decided by whoever asks first.
//!   Cursors created later join at the current frontier.
//! - [`PublishBuffer`] — every cursor starts at position 0 and replays the
//!   retained history before pulling new elements; the source still runs at
//!   most once.
//! - [`MemoizeBuffer`] — like [`PublishBuffer`] with a strictly enforced
//!   maximum number of readers.
//! - [`StaticPartitioner`] / [`DynamicPartitioner`] — a fixed set of
//!   load-balanced partitions, or a cloneable view for a worker pool whose
//!   size is chosen at runtime. Both plug into parallel drivers through the
//!   [`Partitioner`] trait.
//! - [`materialize`] — drains `n` static partitions on `n` concurrent worker
//!   tasks and returns the collected partitions once all workers finished.
//!
//! # Examples
//!
//! Sharing forces a side-effecting source to run exactly once even when the
//! handle appears twice in one query:
//!
//! ```
//! use futures_util::stream::{self, StreamExt};
//! use stream_partition::PartitionStreamExt;
//!
//! # tokio_test::block_on(async {
//! let shared = stream::iter(0..5).share();
//!
//! // Concatenating the handle with itself does not restart production: the
//! // second cursor joins at the frontier and finds the source exhausted.
//! let first = shared.cursor().into_stream();
//! let second = shared.cursor().into_stream();
//! let values: Vec<i32> = first
//!     .chain(second)
//!     .map(|item| item.unwrap())
//!     .collect()
//!     .await;
//! assert_eq!(values, vec![0, 1, 2, 3, 4]);
//! # });
//! ```
//!
//! Partitioning a source over a fixed pool of workers:
//!
//! ```
//! use futures_util::stream;
//! use stream_partition::{materialize, StaticPartitioner};
//!
//! # tokio_test::block_on(async {
//! let partitioner = StaticPartitioner::new(stream::iter(0..40));
//! let partitions = materialize(&partitioner, 4).await.unwrap();
//!
//! let mut values: Vec<i32> = partitions.into_iter().flatten().collect();
//! values.sort_unstable();
//! assert_eq!(values, (0..40).collect::<Vec<_>>());
//! # });
//! ```
//!
//! # Behavior
//!
//! A buffer is fully lazy: nothing is pulled from the source until a cursor
//! first advances. The pull-and-publish step is the single critical section,
//! guarded by an async mutex held for exactly one pull — a cursor never waits
//! on another cursor's unrelated work. Production order is preserved, and
//! delivery to any single cursor follows source order; delivery order across
//! cursors is unspecified and load-dependent.
//!
//! Disposing a [`SharedBuffer`] is the only cancellation primitive: after
//! [`dispose`](SharedBuffer::dispose), every advancement on every cursor
//! fails with [`ShareError::Disposed`] rather than stopping silently. A
//! failing source is handled the same way — the failure is published at the
//! frontier and surfaced to every cursor that reaches it.
//!
//! # Thread Safety
//!
//! Buffers and cursors are `Send` and `Sync` whenever the wrapped stream and
//! its items are `Send`, so cursors can be moved freely into spawned tasks.
//! On a multi-threaded runtime the partition workers run in parallel; the
//! exactly-once guarantee holds under arbitrary interleavings.
//!
//! # Performance Considerations
//!
//! - Shared cursors never copy elements: each one is handed to exactly one
//!   consumer.
//! - Replaying buffers clone one element per delivery and retain the full
//!   history for the buffer's lifetime; prefer small or `Arc`-wrapped items.
//! - Every advancement takes the buffer lock briefly, so very cheap sources
//!   with many consumers will contend; batching upstream amortizes this.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod ext;
mod materialize;
mod partition;
mod replay;
mod share;
mod source;
#[cfg(feature = "stats")]
mod stats;

pub use error::{ShareError, SourceFailure};
pub use ext::PartitionStreamExt;
pub use materialize::{materialize, MaterializeError, PartitionFailure};
pub use partition::{DynamicPartitioner, Partitioner, StaticPartitioner};
pub use replay::{MemoizeBuffer, PublishBuffer, ReplayCursor};
pub use share::{SharedBuffer, SharedCursor};
pub use source::{defer, Defer, LazySource, Lift, TryLift};
#[cfg(feature = "stats")]
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
pub use stats::Stats;
