// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The background task runner: one dedicated worker thread that repeatedly
//! swaps the shared pending queue into a local batch and drains it.
//!
//! Producers on any thread call [`TaskLooper::add_task`]; the worker detaches
//! the whole queue under one exclusive lock, runs the batch with per-task
//! panic isolation, and sleeps for the current poll interval. The thread
//! exits only through one of the two shutdown paths: forced (remaining tasks
//! are returned to the caller, undrained) or graceful (the queue is drained
//! to empty first, including tasks enqueued mid-drain).

use crate::error::{LooperError, LooperResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempo_core::{log_sink, run_isolated, FailureSink, TaskBatch};

/// A unit of deferred work executed on the worker thread.
///
/// Tasks receive the looper handle so they can resubmit themselves or
/// schedule follow-up work without a captured reference cycle.
pub type LooperTask = Box<dyn FnOnce(&dyn TaskLooper) + Send + 'static>;

/// The deferred-execution interface shared by producers and running tasks.
pub trait TaskLooper: Send + Sync {
    /// Queues a task for a later drain cycle. Never blocks longer than one
    /// queue append.
    ///
    /// Fails with [`LooperError::ShutDown`] once the worker thread has
    /// terminated.
    fn add_task(&self, task: LooperTask) -> LooperResult<()>;
}

/// Configuration for a [`BackgroundTaskRunner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How long the worker sleeps between drain cycles. May be changed at
    /// runtime with [`BackgroundTaskRunner::set_poll_interval`].
    pub poll_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// State shared between the runner handle, the worker thread, and running
/// tasks.
struct RunnerShared {
    /// One exclusive lock guards every queue mutation, producer appends and
    /// the worker's detach alike.
    pending: Mutex<Vec<LooperTask>>,
    poll_interval_ms: AtomicU64,
    force_shutdown: AtomicBool,
    graceful_shutdown: AtomicBool,
    /// Set by the worker thread on exit; gates task submission afterwards.
    terminated: AtomicBool,
    sink: FailureSink,
}

impl RunnerShared {
    fn add_task(&self, task: LooperTask) -> LooperResult<()> {
        let mut pending = self.pending.lock().expect("pending queue lock poisoned");
        // Checked under the queue lock: the worker declares termination
        // while holding the same lock, so an `Ok` here guarantees the task
        // was visible to the worker's final empty-queue check.
        if self.terminated.load(Ordering::SeqCst) {
            return Err(LooperError::ShutDown);
        }
        pending.push(task);
        Ok(())
    }
}

/// The handle the worker passes into each running task.
struct LooperHandle {
    shared: Arc<RunnerShared>,
}

impl TaskLooper for LooperHandle {
    fn add_task(&self, task: LooperTask) -> LooperResult<()> {
        self.shared.add_task(task)
    }
}

/// Owns one dedicated thread that drains queued tasks at a configurable
/// poll interval.
///
/// The thread starts at construction and terminates only via
/// [`shutdown`](Self::shutdown) or
/// [`shutdown_gracefully`](Self::shutdown_gracefully); a task panic never
/// kills it. Dropping the runner forces a shutdown.
pub struct BackgroundTaskRunner {
    shared: Arc<RunnerShared>,
    wake_tx: Sender<()>,
    worker: Option<thread::JoinHandle<()>>,
}

impl BackgroundTaskRunner {
    /// Creates a runner and starts its worker thread, reporting caught task
    /// failures through the default `log` sink.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_failure_sink(config, log_sink())
    }

    /// Creates a runner with an explicit failure sink.
    pub fn with_failure_sink(config: RunnerConfig, sink: FailureSink) -> Self {
        let shared = Arc::new(RunnerShared {
            pending: Mutex::new(Vec::new()),
            poll_interval_ms: AtomicU64::new(config.poll_interval.as_millis() as u64),
            force_shutdown: AtomicBool::new(false),
            graceful_shutdown: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            sink,
        });
        // Capacity 1: a single pending wakeup is enough to interrupt the
        // poll sleep.
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || run_worker(worker_shared, wake_rx));
        Self {
            shared,
            wake_tx,
            worker: Some(worker),
        }
    }

    /// Returns the current poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.shared.poll_interval_ms.load(Ordering::Relaxed))
    }

    /// Changes the poll interval. The worker reads it fresh before every
    /// sleep, so the change applies without restarting the runner.
    pub fn set_poll_interval(&self, interval: Duration) {
        self.shared
            .poll_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    /// Stops the worker immediately and returns the tasks that were still
    /// pending and therefore never executed. Disposal of those tasks passes
    /// to the caller.
    ///
    /// The worker finishes the batch it is currently draining but never
    /// detaches another one. A second call returns an empty list.
    pub fn shutdown(&mut self) -> Vec<LooperTask> {
        self.shared.force_shutdown.store(true, Ordering::SeqCst);
        let _ = self.wake_tx.try_send(());
        if let Some(worker) = self.worker.take() {
            log::info!("Task runner shutting down (forced)");
            let _ = worker.join();
        }
        let mut pending = self
            .shared
            .pending
            .lock()
            .expect("pending queue lock poisoned");
        std::mem::take(&mut *pending)
    }

    /// Blocks until the worker has drained the pending queue to empty,
    /// including tasks enqueued by other threads or by running tasks during
    /// the drain, then stops it. On return the queue is empty.
    ///
    /// A second call is a no-op.
    pub fn shutdown_gracefully(&mut self) {
        self.shared.graceful_shutdown.store(true, Ordering::SeqCst);
        let _ = self.wake_tx.try_send(());
        if let Some(worker) = self.worker.take() {
            log::info!("Task runner shutting down (graceful)");
            let _ = worker.join();
        }
    }
}

impl TaskLooper for BackgroundTaskRunner {
    fn add_task(&self, task: LooperTask) -> LooperResult<()> {
        self.shared.add_task(task)
    }
}

impl Drop for BackgroundTaskRunner {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.shutdown();
        }
    }
}

fn run_worker(shared: Arc<RunnerShared>, wake_rx: Receiver<()>) {
    log::debug!("Task runner worker started");
    let handle = LooperHandle {
        shared: Arc::clone(&shared),
    };
    loop {
        if shared.force_shutdown.load(Ordering::SeqCst) {
            break;
        }

        // Detach the whole queue; producers only ever see it empty or
        // whole, never mid-drain.
        let detached: Vec<LooperTask> = {
            let mut pending = shared.pending.lock().expect("pending queue lock poisoned");
            if shared.graceful_shutdown.load(Ordering::SeqCst) && pending.is_empty() {
                // Declare termination while still holding the queue lock:
                // any producer whose `add_task` returned `Ok` has already
                // pushed under this lock, so the queue really is empty.
                shared.terminated.store(true, Ordering::SeqCst);
                break;
            }
            std::mem::take(&mut *pending)
        };

        if !detached.is_empty() {
            let mut batch = TaskBatch::new(detached);
            batch.drain(&shared.sink, |task| run_isolated(|| task(&handle)));
        }

        if shared.force_shutdown.load(Ordering::SeqCst) {
            // Forced mid-drain: finish the current batch only, leave the
            // rest of the queue for the caller.
            break;
        }
        if shared.graceful_shutdown.load(Ordering::SeqCst) {
            // Draining down to empty; skip the sleep between passes.
            continue;
        }

        let poll = Duration::from_millis(shared.poll_interval_ms.load(Ordering::Relaxed));
        match wake_rx.recv_timeout(poll) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            // The runner handle is gone; there is nobody left to shut us
            // down, so exit.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    shared.terminated.store(true, Ordering::SeqCst);
    log::debug!("Task runner worker stopped");
}
