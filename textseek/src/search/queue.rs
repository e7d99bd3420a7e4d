use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::trace;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<PathBuf>,
    /// Pushed but not yet fully processed, including tasks a worker holds
    outstanding: usize,
    shutdown: bool,
    cancelled: bool,
}

/// Shared queue of directories waiting to be enumerated.
///
/// Besides the pending paths the queue tracks how many pushed tasks have not
/// been finished yet. A worker calls [`task_done`](Self::task_done) only after
/// it has pushed every sub-directory it found, so the count reaching zero means
/// the whole tree has been discovered and drained.
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    drained: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a directory and wakes one waiting worker.
    ///
    /// Returns false, without queueing, once the queue has been cancelled.
    pub fn push(&self, path: PathBuf) -> bool {
        let mut state = self.state.lock();
        if state.cancelled {
            trace!("Dropping {} pushed after cancellation", path.display());
            return false;
        }
        state.pending.push_back(path);
        state.outstanding += 1;
        drop(state);
        self.available.notify_one();
        true
    }

    /// Removes the earliest pushed directory, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is empty and shutdown has been requested,
    /// or immediately after cancellation.
    pub fn pop_blocking(&self) -> Option<PathBuf> {
        let mut state = self.state.lock();
        loop {
            if state.cancelled {
                return None;
            }
            if let Some(path) = state.pending.pop_front() {
                return Some(path);
            }
            if state.shutdown {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Marks one popped task as fully processed.
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.outstanding > 0, "task_done without a matching push");
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            drop(state);
            self.drained.notify_all();
        }
    }

    /// Blocks until no task is outstanding or shutdown has been requested.
    pub fn wait_until_drained(&self) {
        let mut state = self.state.lock();
        while state.outstanding > 0 && !state.shutdown {
            self.drained.wait(&mut state);
        }
    }

    /// Lets blocked workers return once the queue is empty. Idempotent.
    pub fn request_shutdown(&self) {
        self.state.lock().shutdown = true;
        self.available.notify_all();
        self.drained.notify_all();
    }

    /// Stops the queue handing out further work.
    ///
    /// Pending directories are discarded and later pushes are refused; tasks
    /// already popped run to completion. Returns how many tasks were dropped.
    pub fn cancel(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.outstanding = state.outstanding.saturating_sub(dropped);
        state.cancelled = true;
        state.shutdown = true;
        drop(state);
        self.available.notify_all();
        self.drained.notify_all();
        dropped
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }
}
