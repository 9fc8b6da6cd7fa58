//! Criterion benchmark comparing single-record and batch enqueue/dequeue
//! throughput on the MPMC ring buffer.
//!
//! Run: cargo bench --bench ring_buffer

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use ringflux::{RingBuffer, TradeRecord};

const RING_CAPACITY: u64 = 1 << 16;
const TOTAL_RECORDS: u64 = 1_000_000;

fn run_single(producers: u64, consumers: u64, events: u64) -> u64 {
    let ring = Arc::new(RingBuffer::<TradeRecord>::new(RING_CAPACITY).unwrap());
    let consumed = Arc::new(AtomicU64::new(0));
    let per_producer = events / producers;

    let mut handles = Vec::new();
    for p in 0..producers {
        let ring = ring.clone();
        handles.push(thread::spawn(move || {
            let base = p * per_producer;
            for i in 0..per_producer {
                let record = TradeRecord::new(base + i, 1.0, 1);
                while !ring.enqueue(record) {
                    std::hint::spin_loop();
                }
            }
        }));
    }

    for _ in 0..consumers {
        let ring = ring.clone();
        let consumed = consumed.clone();
        handles.push(thread::spawn(move || loop {
            if ring.dequeue().is_some() {
                consumed.fetch_add(1, Ordering::Relaxed);
            } else if consumed.load(Ordering::Relaxed) >= events {
                return;
            } else {
                std::hint::spin_loop();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    events
}

fn run_batch(producers: u64, consumers: u64, events: u64, batch: usize) -> u64 {
    let ring = Arc::new(RingBuffer::<TradeRecord>::new(RING_CAPACITY).unwrap());
    let consumed = Arc::new(AtomicU64::new(0));
    let per_producer = events / producers;

    let mut handles = Vec::new();
    for p in 0..producers {
        let ring = ring.clone();
        handles.push(thread::spawn(move || {
            let base = p * per_producer;
            let mut staging = vec![TradeRecord::default(); batch];
            let mut sent = 0u64;
            while sent < per_producer {
                let n = batch.min((per_producer - sent) as usize);
                for (i, slot) in staging[..n].iter_mut().enumerate() {
                    *slot = TradeRecord::new(base + sent + i as u64, 1.0, 1);
                }
                loop {
                    match ring.enqueue_batch(&staging[..n]) {
                        Ok(0) => std::hint::spin_loop(),
                        Ok(_) => break,
                        Err(_) => unreachable!("batch never exceeds capacity"),
                    }
                }
                sent += n as u64;
            }
        }));
    }

    for _ in 0..consumers {
        let ring = ring.clone();
        let consumed = consumed.clone();
        handles.push(thread::spawn(move || {
            let mut staging = vec![TradeRecord::default(); batch];
            loop {
                match ring.dequeue_batch(&mut staging) {
                    Ok(0) => {
                        if consumed.load(Ordering::Relaxed) >= events {
                            return;
                        }
                        std::hint::spin_loop();
                    }
                    Ok(n) => {
                        consumed.fetch_add(n, Ordering::Relaxed);
                    }
                    Err(_) => unreachable!("batch never exceeds capacity"),
                }
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    events
}

fn bench_single_vs_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("single vs batch (4P/4C)");
    group.throughput(Throughput::Elements(TOTAL_RECORDS));
    group.sample_size(20);

    group.bench_function(BenchmarkId::new("records", "single"), |b| {
        b.iter(|| run_single(4, 4, TOTAL_RECORDS))
    });

    for batch in [8usize, 64, 512] {
        group.bench_function(BenchmarkId::new("records", format!("batch-{batch}")), |b| {
            b.iter(|| run_batch(4, 4, TOTAL_RECORDS, batch))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_vs_batch);
criterion_main!(benches);
