//! Per-operation latency recording
//!
//! Four independent timers (create, write, close, delete) accumulate one
//! duration sample per completed file operation. Workers append concurrently;
//! the snapshot is taken once, after both phases have drained.

use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

/// The four timed file operations of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Write,
    Close,
    Delete,
}

impl Op {
    pub const ALL: [Op; 4] = [Op::Create, Op::Write, Op::Close, Op::Delete];

    /// Human-readable timer name, matching the report column.
    pub fn label(self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::Write => "write",
            Op::Close => "close",
            Op::Delete => "delete",
        }
    }
}

/// Statistics for one timer, all durations in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TimerStats {
    pub count: u64,
    pub min_us: f64,
    pub max_us: f64,
    pub mean_us: f64,
    pub p50_us: f64,
    pub p75_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub p999_us: f64,
}

/// Point-in-time statistics for all four timers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub create: TimerStats,
    pub write: TimerStats,
    pub close: TimerStats,
    pub delete: TimerStats,
}

impl Snapshot {
    pub fn get(&self, op: Op) -> &TimerStats {
        match op {
            Op::Create => &self.create,
            Op::Write => &self.write,
            Op::Close => &self.close,
            Op::Delete => &self.delete,
        }
    }
}

/// Thread-safe accumulator of duration samples for the four timers.
///
/// One lock per timer, so concurrent appends to different timers never
/// contend and appends to the same timer contend only briefly.
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    samples: [Mutex<Vec<u64>>; 4],
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample to the timer for `op`.
    pub fn record(&self, op: Op, elapsed: Duration) {
        let us = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        self.samples[op as usize]
            .lock()
            .expect("recorder lock poisoned")
            .push(us);
    }

    /// Number of samples recorded so far for `op`.
    pub fn count(&self, op: Op) -> u64 {
        self.samples[op as usize]
            .lock()
            .expect("recorder lock poisoned")
            .len() as u64
    }

    /// Compute statistics over everything recorded so far.
    pub fn snapshot(&self) -> Snapshot {
        let [create, write, close, delete] = Op::ALL.map(|op| {
            let guard = self.samples[op as usize]
                .lock()
                .expect("recorder lock poisoned");
            timer_stats(&guard)
        });
        Snapshot {
            create,
            write,
            close,
            delete,
        }
    }
}

fn timer_stats(samples: &[u64]) -> TimerStats {
    if samples.is_empty() {
        return TimerStats::default();
    }
    let mut sorted: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len() as u64;
    let sum: f64 = sorted.iter().sum();

    TimerStats {
        count,
        min_us: sorted[0],
        max_us: sorted[sorted.len() - 1],
        mean_us: sum / count as f64,
        p50_us: percentile(&sorted, 50.0),
        p75_us: percentile(&sorted, 75.0),
        p95_us: percentile(&sorted, 95.0),
        p99_us: percentile(&sorted, 99.0),
        p999_us: percentile(&sorted, 99.9),
    }
}

/// Linear-interpolation percentile over sorted data.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let index = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_and_count() {
        let recorder = LatencyRecorder::new();
        recorder.record(Op::Create, Duration::from_micros(100));
        recorder.record(Op::Create, Duration::from_micros(200));
        recorder.record(Op::Delete, Duration::from_micros(50));

        assert_eq!(recorder.count(Op::Create), 2);
        assert_eq!(recorder.count(Op::Write), 0);
        assert_eq!(recorder.count(Op::Close), 0);
        assert_eq!(recorder.count(Op::Delete), 1);
    }

    #[test]
    fn test_empty_snapshot_is_zeroed() {
        let recorder = LatencyRecorder::new();
        let snap = recorder.snapshot();
        for op in Op::ALL {
            assert_eq!(snap.get(op).count, 0);
            assert_eq!(snap.get(op).mean_us, 0.0);
        }
    }

    #[test]
    fn test_snapshot_basic_stats() {
        let recorder = LatencyRecorder::new();
        for us in [100, 200, 300, 400] {
            recorder.record(Op::Write, Duration::from_micros(us));
        }
        let stats = recorder.snapshot().write;
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min_us, 100.0);
        assert_eq!(stats.max_us, 400.0);
        assert_eq!(stats.mean_us, 250.0);
        assert_eq!(stats.p50_us, 250.0);
    }

    #[test]
    fn test_single_sample_percentiles_collapse() {
        let recorder = LatencyRecorder::new();
        recorder.record(Op::Close, Duration::from_micros(42));
        let stats = recorder.snapshot().close;
        assert_eq!(stats.p50_us, 42.0);
        assert_eq!(stats.p999_us, 42.0);
        assert_eq!(stats.min_us, 42.0);
        assert_eq!(stats.max_us, 42.0);
    }

    #[test]
    fn test_percentiles_are_ordered() {
        let recorder = LatencyRecorder::new();
        for us in 1..=1000 {
            recorder.record(Op::Delete, Duration::from_micros(us));
        }
        let stats = recorder.snapshot().delete;
        assert!(stats.min_us <= stats.p50_us);
        assert!(stats.p50_us <= stats.p75_us);
        assert!(stats.p75_us <= stats.p95_us);
        assert!(stats.p95_us <= stats.p99_us);
        assert!(stats.p99_us <= stats.p999_us);
        assert!(stats.p999_us <= stats.max_us);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = vec![0.0, 10.0];
        assert_eq!(percentile(&sorted, 50.0), 5.0);
        assert_eq!(percentile(&sorted, 0.0), 0.0);
        assert_eq!(percentile(&sorted, 100.0), 10.0);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let recorder = Arc::new(LatencyRecorder::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let recorder = Arc::clone(&recorder);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    recorder.record(Op::Create, Duration::from_micros(i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(recorder.count(Op::Create), 8 * 500);
        assert_eq!(recorder.snapshot().create.count, 8 * 500);
    }

    #[test]
    fn test_timers_are_independent() {
        let recorder = LatencyRecorder::new();
        recorder.record(Op::Create, Duration::from_micros(10));
        recorder.record(Op::Write, Duration::from_micros(1000));
        let snap = recorder.snapshot();
        assert_eq!(snap.create.max_us, 10.0);
        assert_eq!(snap.write.max_us, 1000.0);
        assert_eq!(snap.close.count, 0);
    }
}
