use criterion::{criterion_group, criterion_main, Criterion};
use futures_util::future::join_all;
use futures_util::stream::{Stream, StreamExt, TryStream};
use std::time::Duration;
use stream_partition::{
    materialize, PartitionStreamExt, SharedCursor, SourceFailure, StaticPartitioner,
};
use tokio::runtime::Runtime;

mod utils;
use utils::{
    generate_in_memory_stream, generate_simulated_io_stream, run_channel_scatter, ArcData,
    NUM_CONSUMERS,
};

// --- Benchmark Runner Functions ---

// Drain N shared cursors concurrently until the buffer is exhausted.
async fn consume_cursors<S>(cursors: Vec<SharedCursor<S>>)
where
    S: TryStream<Ok = ArcData, Error = SourceFailure> + Unpin,
{
    let futures: Vec<_> = cursors
        .into_iter()
        .map(|mut cursor| async move {
            let mut consumed_count = 0;
            while let Ok(Some(_)) = cursor.next().await {
                consumed_count += 1;
            }
            consumed_count
        })
        .collect();

    // Wait for all consumers to finish
    let _results = join_all(futures).await;
}

// Drain N receiver streams concurrently (channel scatter baseline).
async fn consume_streams<S>(streams: Vec<S>)
where
    S: Stream<Item = ArcData> + Unpin,
{
    let futures: Vec<_> = streams
        .into_iter()
        .map(|mut stream| async move {
            let mut consumed_count = 0;
            while stream.next().await.is_some() {
                consumed_count += 1;
            }
            consumed_count
        })
        .collect();

    let _results = join_all(futures).await;
}

// --- Criterion Benchmarks ---

fn benchmark_group(c: &mut Criterion) {
    let item_counts = [1_000, 10_000, 100_000];

    let rt = Runtime::new().expect("Failed to create Tokio runtime");

    // --- 1. Contention Benchmarks (5 Consumers) ---
    let mut contention_group = c.benchmark_group("Contention (N=5)");

    contention_group.measurement_time(Duration::from_secs(10));
    contention_group.sample_size(50);

    for &count in item_counts.iter() {
        // --- SharedBuffer (Contended Synchronization) ---
        contention_group.bench_function(format!("SharedBuffer_MEM__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let shared = generate_in_memory_stream(count).share();
                    let cursors: Vec<_> = (0..NUM_CONSUMERS).map(|_| shared.cursor()).collect();
                    consume_cursors(cursors).await;
                })
            })
        });

        contention_group.bench_function(format!("SharedBuffer_IO__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let shared = generate_simulated_io_stream(count).share();
                    let cursors: Vec<_> = (0..NUM_CONSUMERS).map(|_| shared.cursor()).collect();
                    consume_cursors(cursors).await;
                })
            })
        });

        // --- Channel Scatter (Centralized I/O) ---
        contention_group.bench_function(format!("ChannelScatter_MEM__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let stream = generate_in_memory_stream(count);
                    let consumers = run_channel_scatter(stream);
                    consume_streams(consumers).await;
                })
            })
        });

        contention_group.bench_function(format!("ChannelScatter_IO__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let stream = generate_simulated_io_stream(count);
                    let consumers = run_channel_scatter(stream);
                    consume_streams(consumers).await;
                })
            })
        });
    }
    contention_group.finish();

    // --- 2. Wrapper Overhead Benchmarks (Single Consumer N=1) ---
    let mut overhead_group = c.benchmark_group("Wrapper Overhead (N=1)");
    overhead_group.measurement_time(Duration::from_secs(10));
    overhead_group.sample_size(50);

    for &count in item_counts.iter() {
        // A. Raw Stream Consumption (Baseline, MEM)
        overhead_group.bench_function(format!("RawStream_MEM__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let stream = generate_in_memory_stream(count);
                    consume_streams(vec![stream]).await;
                })
            })
        });

        // B. Shared Cursor Consumption (Wrapper Overhead, MEM)
        overhead_group.bench_function(format!("SharedCursor_MEM__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let shared = generate_in_memory_stream(count).share();
                    consume_cursors(vec![shared.cursor()]).await;
                })
            })
        });

        // C. Raw Stream IO Consumption (Baseline, IO)
        overhead_group.bench_function(format!("RawStream_IO__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let stream = generate_simulated_io_stream(count);
                    consume_streams(vec![stream]).await;
                })
            })
        });

        // D. Shared Cursor IO Consumption (Wrapper Overhead, IO)
        overhead_group.bench_function(format!("SharedCursor_IO__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let shared = generate_simulated_io_stream(count).share();
                    consume_cursors(vec![shared.cursor()]).await;
                })
            })
        });
    }
    overhead_group.finish();

    // --- 3. Materialize Benchmarks (4 Workers) ---
    let mut materialize_group = c.benchmark_group("Materialize (N=4)");
    materialize_group.measurement_time(Duration::from_secs(10));
    materialize_group.sample_size(50);

    for &count in item_counts.iter() {
        materialize_group.bench_function(format!("Materialize_MEM__{}", count), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let partitioner = StaticPartitioner::new(generate_in_memory_stream(count));
                    let partitions = materialize(&partitioner, 4).await.unwrap();
                    assert_eq!(
                        partitions.iter().map(Vec::len).sum::<usize>(),
                        count as usize
                    );
                })
            })
        });
    }
    materialize_group.finish();
}

criterion_group!(benches, benchmark_group);
criterion_main!(benches);
