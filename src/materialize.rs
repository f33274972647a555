//! Draining static partitions on a pool of worker tasks.

use std::panic;

use futures_util::stream::TryStream;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{ShareError, SourceFailure};
use crate::partition::Partitioner;
use crate::share::SharedCursor;

/// A worker's failure, tagged with the index of the partition it was
/// draining.
#[derive(Debug, Clone)]
pub struct PartitionFailure {
    /// Index of the failed partition.
    pub partition: usize,
    /// The advancement error the worker observed.
    pub error: ShareError,
}

/// Failure of a [`materialize`] call.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The partitions themselves could not be created.
    #[error(transparent)]
    Partition(#[from] ShareError),

    /// One or more workers failed while draining their partition.
    #[error("{} partition worker(s) failed", .failures.len())]
    Workers {
        /// Every failed worker, in partition order.
        failures: Vec<PartitionFailure>,
    },
}

/// Drains `count` static partitions concurrently, one worker task each.
///
/// Every worker owns exactly one partition cursor and collects into its own
/// private vector, so the output side needs no locking. All workers are
/// started, then all are joined before the partitions are returned in index
/// order. A failing worker does not cancel its siblings: errors are gathered
/// and reported together once every worker has finished.
///
/// On a multi-threaded runtime the workers run in parallel, which makes the
/// element-to-partition assignment a genuine race — repeated runs distribute
/// the source differently, but always exactly once in total.
///
/// # Examples
///
/// ```
/// use futures_util::stream;
/// use stream_partition::{materialize, StaticPartitioner};
///
/// # tokio_test::block_on(async {
/// let partitioner = StaticPartitioner::new(stream::iter(0..40));
/// let partitions = materialize(&partitioner, 4).await.unwrap();
/// assert_eq!(partitions.len(), 4);
///
/// let mut values: Vec<i32> = partitions.into_iter().flatten().collect();
/// values.sort_unstable();
/// assert_eq!(values, (0..40).collect::<Vec<_>>());
/// # });
/// ```
pub async fn materialize<P, S>(
    partitioner: &P,
    count: usize,
) -> Result<Vec<Vec<S::Ok>>, MaterializeError>
where
    P: Partitioner<Partition = SharedCursor<S>>,
    S: TryStream<Error = SourceFailure> + Unpin + Send + 'static,
    S::Ok: Send + 'static,
{
    let cursors = partitioner.partitions(count)?;
    debug!(count, "materializing partitions");

    let workers: Vec<JoinHandle<Result<Vec<S::Ok>, ShareError>>> = cursors
        .into_iter()
        .map(|mut cursor| {
            tokio::spawn(async move {
                let mut drained = Vec::new();
                loop {
                    match cursor.next().await? {
                        Some(item) => drained.push(item),
                        None => return Ok(drained),
                    }
                }
            })
        })
        .collect();

    let mut partitions = Vec::with_capacity(count);
    let mut failures = Vec::new();
    for (index, worker) in workers.into_iter().enumerate() {
        match worker.await {
            Ok(Ok(drained)) => {
                trace!(partition = index, drained = drained.len(), "worker finished");
                partitions.push(drained);
            }
            Ok(Err(error)) => {
                debug!(partition = index, %error, "worker failed");
                failures.push(PartitionFailure {
                    partition: index,
                    error,
                });
            }
            Err(join_error) => match join_error.try_into_panic() {
                Ok(payload) => panic::resume_unwind(payload),
                Err(join_error) => panic!("partition worker cancelled: {join_error}"),
            },
        }
    }

    if failures.is_empty() {
        Ok(partitions)
    } else {
        Err(MaterializeError::Workers { failures })
    }
}
