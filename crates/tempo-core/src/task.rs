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

//! Batch draining of deferred tasks with per-task failure isolation.
//!
//! Every ticker variant and the background runner share the same drain
//! behavior: detach the queued tasks, run them in FIFO order, and report a
//! failing task to the failure sink instead of letting it abort the batch.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Description of a single caught task failure.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    /// Creates a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a failure from a panic payload, recovering the panic message
    /// when the payload is a string.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked with a non-string payload".to_string()
        };
        Self { message }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaskFailure {}

/// Where caught task failures are reported.
///
/// Injected by the host; the core never prints on its own.
pub type FailureSink = Arc<dyn Fn(&TaskFailure) + Send + Sync>;

/// Returns the default sink, which reports failures through [`log::error!`].
pub fn log_sink() -> FailureSink {
    Arc::new(|failure| log::error!("Deferred task failed: {failure}"))
}

/// Runs `f`, converting a panic into a [`TaskFailure`].
///
/// This is the unit of failure isolation used by batch drains.
pub fn run_isolated<F: FnOnce()>(f: F) -> Result<(), TaskFailure> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| TaskFailure::from_panic(payload.as_ref()))
}

/// An ordered, single-use batch of deferred tasks.
///
/// A batch is created fresh per drain cycle from the tasks queued so far,
/// owned exclusively by the draining call, and spent once drained.
pub struct TaskBatch<T> {
    tasks: Vec<T>,
    draining: bool,
}

impl<T> TaskBatch<T> {
    /// Creates a batch from the detached pending tasks, in enqueue order.
    pub fn new(tasks: Vec<T>) -> Self {
        Self {
            tasks,
            draining: false,
        }
    }

    /// Returns the number of tasks still in the batch.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the batch holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every task once, in enqueue order.
    ///
    /// `invoke` executes one task and reports its failure, if any. A failing
    /// task is passed to `sink` and does not stop the remaining tasks, nor
    /// does it propagate to the caller.
    ///
    /// # Panics
    ///
    /// Draining a batch that is already draining, or that has already been
    /// drained, is a caller bug and panics. It would silently corrupt task
    /// ordering otherwise.
    pub fn drain<F>(&mut self, sink: &FailureSink, mut invoke: F)
    where
        F: FnMut(T) -> Result<(), TaskFailure>,
    {
        if self.draining {
            panic!("TaskBatch::drain called on a batch that is draining or spent");
        }
        // Stays set afterwards: a batch is single-use.
        self.draining = true;
        for task in self.tasks.drain(..) {
            if let Err(failure) = invoke(task) {
                sink(&failure);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collecting_sink() -> (FailureSink, Arc<Mutex<Vec<String>>>) {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&failures);
        let sink: FailureSink = Arc::new(move |failure: &TaskFailure| {
            captured.lock().unwrap().push(failure.message().to_string());
        });
        (sink, failures)
    }

    #[test]
    fn drains_all_tasks_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<Box<dyn FnOnce() + Send>> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                Box::new(move || order.lock().unwrap().push(i)) as Box<dyn FnOnce() + Send>
            })
            .collect();

        let (sink, failures) = collecting_sink();
        let mut batch = TaskBatch::new(tasks);
        assert_eq!(batch.len(), 5);
        batch.drain(&sink, |task| run_isolated(task));

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(failures.lock().unwrap().is_empty());
        assert!(batch.is_empty());
    }

    #[test]
    fn failing_task_does_not_stop_the_batch() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tasks: Vec<Box<dyn FnOnce() + Send>> = Vec::new();
        {
            let order = Arc::clone(&order);
            tasks.push(Box::new(move || order.lock().unwrap().push(1)));
        }
        tasks.push(Box::new(|| panic!("boom")));
        {
            let order = Arc::clone(&order);
            tasks.push(Box::new(move || order.lock().unwrap().push(3)));
        }

        let (sink, failures) = collecting_sink();
        let mut batch = TaskBatch::new(tasks);
        batch.drain(&sink, |task| run_isolated(task));

        assert_eq!(*order.lock().unwrap(), vec![1, 3]);
        assert_eq!(*failures.lock().unwrap(), vec!["boom".to_string()]);
    }

    #[test]
    #[should_panic(expected = "draining or spent")]
    fn draining_a_spent_batch_panics() {
        let (sink, _) = collecting_sink();
        let mut batch: TaskBatch<Box<dyn FnOnce() + Send>> = TaskBatch::new(vec![Box::new(|| {})]);
        batch.drain(&sink, |task| run_isolated(task));
        batch.drain(&sink, |task| run_isolated(task));
    }

    struct MemoryLogger {
        records: Mutex<Vec<String>>,
    }

    impl log::Log for MemoryLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.records
                .lock()
                .unwrap()
                .push(format!("{} {}", record.level(), record.args()));
        }

        fn flush(&self) {}
    }

    static MEMORY_LOGGER: MemoryLogger = MemoryLogger {
        records: Mutex::new(Vec::new()),
    };

    #[test]
    fn default_sink_reports_through_log() {
        // The process-wide logger can only be installed once; this is the
        // only test that does so.
        log::set_logger(&MEMORY_LOGGER).expect("another test installed a logger");
        log::set_max_level(log::LevelFilter::Error);

        let sink = log_sink();
        sink(&TaskFailure::new("sink smoke"));

        let records = MEMORY_LOGGER.records.lock().unwrap();
        assert!(
            records
                .iter()
                .any(|r| r.starts_with("ERROR") && r.contains("sink smoke")),
            "Default sink should emit an error record (got {records:?})"
        );
    }

    #[test]
    fn panic_payload_message_is_recovered() {
        let static_str = TaskFailure::from_panic(&"static message");
        assert_eq!(static_str.message(), "static message");

        let owned = TaskFailure::from_panic(&"formatted 42".to_string());
        assert_eq!(owned.message(), "formatted 42");

        let opaque = TaskFailure::from_panic(&17usize);
        assert_eq!(opaque.message(), "task panicked with a non-string payload");
    }
}
