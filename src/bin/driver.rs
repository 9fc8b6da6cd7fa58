//! Benchmark driver: spins up producer and consumer threads against a single
//! ring buffer and reports throughput.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use ringflux::{RingBuffer, TradeRecord};

#[derive(Parser)]
#[command(about = "Drive a lock-free MPMC ring buffer and report throughput")]
struct Cli {
    /// Ring buffer capacity (must be a nonzero power of two).
    #[arg(long, default_value_t = ringflux::constants::DEFAULT_RING_CAPACITY)]
    capacity: u64,

    /// Number of producer threads. Defaults to half the available cores.
    #[arg(short = 'p', long, default_value_t = default_thread_count())]
    producers: u64,

    /// Number of consumer threads. Defaults to half the available cores.
    #[arg(short = 'c', long, default_value_t = default_thread_count())]
    consumers: u64,

    /// Records each producer sends before exiting.
    #[arg(long, default_value_t = 1_000_000)]
    quota: u64,

    /// Batch size for enqueue/dequeue. 1 means single-record operations.
    #[arg(long, default_value_t = 1)]
    batch: usize,
}

fn default_thread_count() -> u64 {
    (num_cpus::get() as u64 / 2).max(1)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let ring = Arc::new(
        RingBuffer::<TradeRecord>::new(cli.capacity).context("failed to construct ring buffer")?,
    );
    let total_records = cli.producers * cli.quota;

    tracing::info!(
        capacity = cli.capacity,
        producers = cli.producers,
        consumers = cli.consumers,
        quota = cli.quota,
        batch = cli.batch,
        "starting driver run"
    );

    let consumed = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    let mut handles = Vec::new();

    for p in 0..cli.producers {
        let ring = ring.clone();
        let quota = cli.quota;
        let batch = cli.batch;
        handles.push(thread::spawn(move || run_producer(ring, p, quota, batch)));
    }

    for _ in 0..cli.consumers {
        let ring = ring.clone();
        let consumed = consumed.clone();
        let batch = cli.batch;
        handles.push(thread::spawn(move || {
            run_consumer(ring, consumed, total_records, batch)
        }));
    }

    for h in handles {
        h.join().expect("driver thread panicked");
    }

    let elapsed = start.elapsed();
    let throughput = total_records as f64 / elapsed.as_secs_f64();
    println!("records: {total_records}");
    println!("elapsed: {elapsed:?}");
    println!("throughput: {throughput:.0} records/sec");

    Ok(())
}

fn run_producer(ring: Arc<RingBuffer<TradeRecord>>, producer_id: u64, quota: u64, batch: usize) {
    let base = producer_id * quota;
    if batch <= 1 {
        for i in 0..quota {
            let record = TradeRecord::new(base + i, 100.0, 1);
            while !ring.enqueue(record) {
                std::hint::spin_loop();
            }
        }
        return;
    }

    let mut sent = 0u64;
    let mut staging = vec![TradeRecord::default(); batch];
    while sent < quota {
        let n = batch.min((quota - sent) as usize);
        for (i, slot) in staging[..n].iter_mut().enumerate() {
            *slot = TradeRecord::new(base + sent + i as u64, 100.0, 1);
        }
        loop {
            match ring.enqueue_batch(&staging[..n]) {
                Ok(0) => std::hint::spin_loop(),
                Ok(_) => break,
                Err(err) => {
                    tracing::error!(%err, "producer batch rejected");
                    return;
                }
            }
        }
        sent += n as u64;
    }
}

fn run_consumer(
    ring: Arc<RingBuffer<TradeRecord>>,
    consumed: Arc<AtomicU64>,
    total_records: u64,
    batch: usize,
) {
    if batch <= 1 {
        loop {
            if ring.dequeue().is_some() {
                consumed.fetch_add(1, Ordering::Relaxed);
            } else if consumed.load(Ordering::Relaxed) >= total_records {
                return;
            } else {
                std::hint::spin_loop();
            }
        }
    }

    let mut staging = vec![TradeRecord::default(); batch];
    loop {
        match ring.dequeue_batch(&mut staging) {
            Ok(0) => {
                if consumed.load(Ordering::Relaxed) >= total_records {
                    return;
                }
                std::hint::spin_loop();
            }
            Ok(n) => {
                consumed.fetch_add(n, Ordering::Relaxed);
            }
            Err(err) => {
                tracing::error!(%err, "consumer batch rejected");
                return;
            }
        }
    }
}
