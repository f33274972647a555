//! Static and dynamic partitioning of one shared stream.
//!
//! Both partitioners hand out cursors over a single internal
//! [`SharedBuffer`], so together the partitions exhaust the source exactly
//! once. Work distribution is load-balanced by construction: whichever
//! partition asks next gets the next element.

use futures_util::stream::{Stream, TryStream};
use tracing::debug;

use crate::error::{ShareError, SourceFailure};
use crate::share::{SharedBuffer, SharedCursor};
use crate::source::{LazySource, Lift};

/// The seam between a partitioned sequence and a parallel-execution driver.
///
/// A driver asks for a fixed number of partitions up front, or — when
/// [`supports_dynamic_partitions`](Partitioner::supports_dynamic_partitions)
/// is `true` — for a single shared view it can pull from with as many workers
/// as it decides to start at runtime.
pub trait Partitioner {
    /// The element type delivered to partitions.
    type Item;
    /// One partition's cursor.
    type Partition;

    /// Returns exactly `count` partitions which together exhaust the source
    /// exactly once.
    ///
    /// Fails with [`ShareError::InvalidPartitionCount`] when `count` is zero.
    fn partitions(&self, count: usize) -> Result<Vec<Self::Partition>, ShareError>;

    /// Whether [`dynamic_partitions`](Partitioner::dynamic_partitions) is
    /// available.
    fn supports_dynamic_partitions(&self) -> bool {
        false
    }

    /// Returns a single shared view for a runtime-determined number of
    /// concurrent pullers.
    fn dynamic_partitions(&self) -> Result<Self::Partition, ShareError> {
        Err(ShareError::DynamicPartitionsUnsupported)
    }
}

/// Partitions a source into a fixed number of load-balanced cursors.
///
/// Each partition delivers elements in source order, but the assignment of
/// elements to partitions is a pure race: a fast consumer drains more of the
/// source than a slow one.
///
/// ```
/// use futures_util::stream;
/// use stream_partition::{Partitioner, StaticPartitioner};
///
/// # tokio_test::block_on(async {
/// let partitioner = StaticPartitioner::new(stream::iter(0..8));
/// let mut partitions = partitioner.partitions(2).unwrap();
/// let mut counts = [0usize; 2];
/// for (index, partition) in partitions.iter_mut().enumerate() {
///     while let Some(_) = partition.next().await.unwrap() {
///         counts[index] += 1;
///     }
/// }
/// assert_eq!(counts[0] + counts[1], 8);
/// # });
/// ```
pub struct StaticPartitioner<S> {
    buffer: SharedBuffer<S>,
}

impl<S> StaticPartitioner<Lift<S>>
where
    S: Stream + Unpin,
{
    /// Partitions one run of the given source.
    pub fn new(source: S) -> Self {
        Self::from_buffer(SharedBuffer::new(Lift::new(source)))
    }

    /// Partitions one fresh run produced by a [`LazySource`] factory.
    pub fn from_source<L>(source: &L) -> Self
    where
        L: LazySource<Stream = S>,
    {
        Self::new(source.produce())
    }
}

impl<S> StaticPartitioner<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    /// Partitions an existing shared buffer.
    pub fn from_buffer(buffer: SharedBuffer<S>) -> Self {
        Self { buffer }
    }
}

impl<S> Partitioner for StaticPartitioner<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    type Item = S::Ok;
    type Partition = SharedCursor<S>;

    fn partitions(&self, count: usize) -> Result<Vec<SharedCursor<S>>, ShareError> {
        if count == 0 {
            return Err(ShareError::InvalidPartitionCount { requested: count });
        }
        debug!(count, "creating static partitions");
        Ok((0..count).map(|_| self.buffer.cursor()).collect())
    }
}

/// A [`StaticPartitioner`] that additionally hands out a dynamic view.
///
/// The dynamic view is a cloneable cursor: a parallel driver starts as many
/// iteration loops against clones of it as it likes, and idle workers simply
/// pull more. The partitioner places no bound on the number of pullers.
pub struct DynamicPartitioner<S> {
    inner: StaticPartitioner<S>,
}

impl<S> DynamicPartitioner<Lift<S>>
where
    S: Stream + Unpin,
{
    /// Partitions one run of the given source.
    pub fn new(source: S) -> Self {
        Self {
            inner: StaticPartitioner::new(source),
        }
    }

    /// Partitions one fresh run produced by a [`LazySource`] factory.
    pub fn from_source<L>(source: &L) -> Self
    where
        L: LazySource<Stream = S>,
    {
        Self {
            inner: StaticPartitioner::from_source(source),
        }
    }
}

impl<S> DynamicPartitioner<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    /// Partitions an existing shared buffer.
    pub fn from_buffer(buffer: SharedBuffer<S>) -> Self {
        Self {
            inner: StaticPartitioner::from_buffer(buffer),
        }
    }
}

impl<S> Partitioner for DynamicPartitioner<S>
where
    S: TryStream<Error = SourceFailure> + Unpin,
{
    type Item = S::Ok;
    type Partition = SharedCursor<S>;

    fn partitions(&self, count: usize) -> Result<Vec<SharedCursor<S>>, ShareError> {
        self.inner.partitions(count)
    }

    fn supports_dynamic_partitions(&self) -> bool {
        true
    }

    fn dynamic_partitions(&self) -> Result<SharedCursor<S>, ShareError> {
        debug!("creating dynamic partition view");
        Ok(self.inner.buffer.cursor())
    }
}
