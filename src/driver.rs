//! Benchmark orchestration
//!
//! One run walks a fixed sequence of states:
//!
//! ```text
//! Initialized -> WritingFiles -> AwaitingWriteBarrier
//!             -> DeletingFiles -> AwaitingDeleteBarrier -> Completed
//! ```
//!
//! The write phase creates, fills, and closes every file; the delete phase
//! removes them. The two phases never overlap: a full barrier separates
//! them, so delete-path latency is measured against a directory holding the
//! complete burst of live files. Any write failure aborts the run; delete
//! failures are logged and counted but never fatal.

use crate::pool::{CountdownLatch, WorkerPool};
use crate::preflight::RunConfig;
use crate::recorder::{LatencyRecorder, Op};
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Progress sink invoked with `(total, completed)` at the configured cadence.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// What a completed run hands back to the caller.
#[derive(Debug)]
pub struct RunOutcome {
    /// Wall-clock time from first submission to the delete barrier.
    pub elapsed: Duration,
    /// Files that could not be removed during the delete phase.
    pub failed_deletes: u64,
}

/// Drives the write and delete phases of one benchmark run.
pub struct BenchmarkDriver {
    dir: PathBuf,
    iterations: u64,
    threads: usize,
    cadence: u64,
    payload: Arc<[u8]>,
    recorder: Arc<LatencyRecorder>,
    progress: ProgressFn,
}

impl BenchmarkDriver {
    pub fn new(
        config: &RunConfig,
        payload: Arc<[u8]>,
        recorder: Arc<LatencyRecorder>,
        progress: ProgressFn,
    ) -> Self {
        Self {
            dir: config.dir.clone(),
            iterations: config.loops,
            threads: config.threads,
            cadence: config.progress_every,
            payload,
            recorder,
            progress,
        }
    }

    /// Execute one full run. Returns the wall-clock elapsed time and the
    /// number of delete failures; any write-phase error aborts the run.
    pub fn run(&self) -> Result<RunOutcome> {
        tracing::debug!(iterations = self.iterations, threads = self.threads, "state: Initialized");
        let files: Vec<Arc<Path>> = (0..self.iterations)
            .map(|i| Arc::from(self.dir.join(format!("file{i}.txt")).as_path()))
            .collect();

        let mut pool = WorkerPool::new(self.threads)?;
        let start = Instant::now();

        tracing::debug!("state: WritingFiles");
        let write_latch = Arc::new(CountdownLatch::new(self.iterations));
        let write_progress =
            PhaseProgress::new(self.iterations, self.cadence, Arc::clone(&self.progress));
        for path in &files {
            let path = Arc::clone(path);
            let payload = Arc::clone(&self.payload);
            let recorder = Arc::clone(&self.recorder);
            let progress = Arc::clone(&write_progress);
            pool.submit(
                Arc::clone(&write_latch),
                Box::new(move || {
                    write_file(&path, &payload, &recorder)?;
                    progress.complete_one();
                    Ok(())
                }),
            );
        }

        tracing::debug!("state: AwaitingWriteBarrier");
        write_latch.wait();
        if let Some(err) = pool.take_error() {
            pool.shutdown();
            return Err(err.context("write phase failed, aborting run"));
        }

        tracing::debug!("state: DeletingFiles");
        let delete_latch = Arc::new(CountdownLatch::new(self.iterations));
        let delete_progress =
            PhaseProgress::new(self.iterations, self.cadence, Arc::clone(&self.progress));
        let failed_deletes = Arc::new(AtomicU64::new(0));
        for path in &files {
            let path = Arc::clone(path);
            let recorder = Arc::clone(&self.recorder);
            let failed = Arc::clone(&failed_deletes);
            let progress = Arc::clone(&delete_progress);
            pool.submit(
                Arc::clone(&delete_latch),
                Box::new(move || {
                    if let Err(err) = delete_file(&path, &recorder) {
                        tracing::warn!("failed to delete '{}': {err}", path.display());
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    progress.complete_one();
                    Ok(())
                }),
            );
        }

        tracing::debug!("state: AwaitingDeleteBarrier");
        delete_latch.wait();

        let elapsed = start.elapsed();
        pool.shutdown();
        tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "state: Completed");

        Ok(RunOutcome {
            elapsed,
            failed_deletes: failed_deletes.load(Ordering::Relaxed),
        })
    }
}

/// Per-phase progress accounting shared by every task in the phase.
///
/// Workers decrement `remaining` and, at the cadence, hand `(total,
/// completed)` to the sink. Delivery goes through a high-water mark held
/// under a lock: a worker that captured a smaller `completed` but lost the
/// race to a faster peer is dropped instead of delivered out of order, so
/// the sink always observes non-decreasing values and nothing lands after
/// the 100% update. The final completion always emits.
struct PhaseProgress {
    total: u64,
    cadence: u64,
    remaining: AtomicU64,
    emitted: Mutex<u64>,
    sink: ProgressFn,
}

impl PhaseProgress {
    fn new(total: u64, cadence: u64, sink: ProgressFn) -> Arc<Self> {
        Arc::new(Self {
            total,
            cadence,
            remaining: AtomicU64::new(total),
            emitted: Mutex::new(0),
            sink,
        })
    }

    fn complete_one(&self) {
        let left = self.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if left != 0 && left % self.cadence != 0 {
            return;
        }
        let completed = self.total - left;
        let mut emitted = self.emitted.lock().expect("progress lock poisoned");
        if completed > *emitted {
            *emitted = completed;
            (self.sink)(self.total, completed);
        }
    }
}

/// Write phase for one file: exclusive create, full payload write + flush,
/// then close, each timed separately. The create must fail if the file
/// already exists; a leftover file means the target directory is dirty and
/// the timings would be meaningless.
fn write_file(path: &Path, payload: &[u8], recorder: &LatencyRecorder) -> Result<()> {
    let started = Instant::now();
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create '{}'", path.display()))?;
    recorder.record(Op::Create, started.elapsed());

    let started = Instant::now();
    file.write_all(payload)
        .and_then(|()| file.flush())
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    recorder.record(Op::Write, started.elapsed());

    let started = Instant::now();
    close_file(file).with_context(|| format!("failed to close '{}'", path.display()))?;
    recorder.record(Op::Close, started.elapsed());
    Ok(())
}

/// Close the file handle, surfacing the OS close result. Dropping a `File`
/// would swallow a failing close, and a close error is just as fatal to the
/// write phase as a failed write.
#[cfg(unix)]
fn close_file(file: std::fs::File) -> std::io::Result<()> {
    use std::os::fd::IntoRawFd;
    let fd = file.into_raw_fd();
    // SAFETY: into_raw_fd transferred ownership of the descriptor to us;
    // this is its only close.
    if unsafe { libc::close(fd) } == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn close_file(file: std::fs::File) -> std::io::Result<()> {
    drop(file);
    Ok(())
}

/// Delete phase for one file. Records a sample only when the removal
/// succeeds, so the delete timer count equals successful deletions.
fn delete_file(path: &Path, recorder: &LatencyRecorder) -> std::io::Result<()> {
    let started = Instant::now();
    fs::remove_file(path)?;
    recorder.record(Op::Delete, started.elapsed());
    Ok(())
}
