//! Fixed-size worker pool with batch barriers
//!
//! A pool of OS threads drains a crossbeam channel of jobs. The driver
//! groups jobs into batches (one batch per phase) and blocks on a
//! [`CountdownLatch`] until every job in the batch has finished.
//!
//! Failure policy: the first job that returns an error trips a pool-wide
//! fatal flag. Jobs dequeued after that are skipped, but they still count
//! down their latch so barriers always release; the driver picks the error
//! up with [`WorkerPool::take_error`] and aborts the run in an orderly way.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// A unit of work executed by one worker thread.
pub type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Countdown barrier: `wait` blocks until `count_down` has been called
/// `count` times.
#[derive(Debug)]
pub struct CountdownLatch {
    remaining: Mutex<u64>,
    zeroed: Condvar,
}

impl CountdownLatch {
    pub fn new(count: u64) -> Self {
        Self {
            remaining: Mutex::new(count),
            zeroed: Condvar::new(),
        }
    }

    /// Decrement the latch, waking waiters when it reaches zero.
    /// Returns the count remaining after this call.
    pub fn count_down(&self) -> u64 {
        let mut remaining = self.remaining.lock().expect("latch lock poisoned");
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.zeroed.notify_all();
        }
        *remaining
    }

    /// Block until the latch reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().expect("latch lock poisoned");
        while *remaining > 0 {
            remaining = self.zeroed.wait(remaining).expect("latch lock poisoned");
        }
    }

    pub fn remaining(&self) -> u64 {
        *self.remaining.lock().expect("latch lock poisoned")
    }
}

#[derive(Debug, Default)]
struct FatalState {
    tripped: AtomicBool,
    first_error: Mutex<Option<anyhow::Error>>,
}

impl FatalState {
    fn trip(&self, err: anyhow::Error) {
        // Keep only the first error; later ones are consequences of aborting.
        let mut slot = self.first_error.lock().expect("fatal lock poisoned");
        if slot.is_none() {
            *slot = Some(err);
        }
        self.tripped.store(true, Ordering::Release);
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

/// Fixed pool of worker threads, created once per run.
pub struct WorkerPool {
    sender: Option<Sender<(Arc<CountdownLatch>, Job)>>,
    workers: Vec<JoinHandle<()>>,
    fatal: Arc<FatalState>,
}

impl WorkerPool {
    /// Spawn `threads` workers, each draining the shared job channel.
    pub fn new(threads: usize) -> anyhow::Result<Self> {
        let (sender, receiver) = unbounded::<(Arc<CountdownLatch>, Job)>();
        let fatal = Arc::new(FatalState::default());

        let mut workers = Vec::with_capacity(threads);
        for id in 0..threads {
            let receiver: Receiver<(Arc<CountdownLatch>, Job)> = receiver.clone();
            let fatal = Arc::clone(&fatal);
            let handle = thread::Builder::new()
                .name(format!("fsburst-worker-{id}"))
                .spawn(move || worker_loop(&receiver, &fatal))?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
            fatal,
        })
    }

    /// Enqueue a job; non-blocking. The job's latch is counted down when the
    /// job finishes (or is skipped after a fatal error). Submitting to a pool
    /// that has shut down is a caller bug: the job is dropped unexecuted, but
    /// its latch is still counted down so no waiter hangs on it.
    pub fn submit(&self, latch: Arc<CountdownLatch>, job: Job) {
        match &self.sender {
            // Workers hold receivers until the sender drops; send cannot fail
            // while the sender is alive.
            Some(sender) => {
                let _ = sender.send((latch, job));
            }
            None => {
                tracing::error!("job submitted after pool shutdown; dropped without running");
                latch.count_down();
            }
        }
    }

    /// Take the first job error, if any job has failed.
    pub fn take_error(&self) -> Option<anyhow::Error> {
        self.fatal
            .first_error
            .lock()
            .expect("fatal lock poisoned")
            .take()
    }

    /// Close the queue and join every worker.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: &Receiver<(Arc<CountdownLatch>, Job)>, fatal: &FatalState) {
    while let Ok((latch, job)) = receiver.recv() {
        if fatal.is_tripped() {
            tracing::debug!("skipping queued job after fatal error");
        } else if let Err(err) = job() {
            tracing::error!("worker job failed: {err:#}");
            fatal.trip(err);
        }
        latch.count_down();
    }
}
