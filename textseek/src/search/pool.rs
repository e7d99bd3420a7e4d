use std::any::Any;
use std::fs::{self, DirEntry};
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;
use tracing::{debug, info, trace, warn};

use super::matcher::TextMatcher;
use super::queue::TaskQueue;
use crate::errors::{SearchError, SearchResult};
use crate::filters::PathFilter;
use crate::results::ResultStore;

/// What the workers of one run did, summed over all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Workers that were actually started
    pub workers: usize,
    /// Directory tasks taken from the queue
    pub directories: u64,
    /// Directory tasks whose listing failed
    pub unreadable_directories: u64,
}

#[derive(Debug, Default)]
struct WorkerStats {
    directories: u64,
    unreadable_directories: u64,
}

enum EntryKind {
    Directory,
    File,
    Skip(&'static str),
}

/// Fixed-size set of threads draining a [`TaskQueue`].
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: NonZeroUsize,
    filter: Option<PathFilter>,
}

impl WorkerPool {
    pub fn new(size: NonZeroUsize) -> Self {
        Self { size, filter: None }
    }

    /// Restricts which sub-directories are queued and which files are scanned
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = (!filter.is_pass_through()).then_some(filter);
        self
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// Runs the pool until the tree reachable from the queued tasks is exhausted.
    ///
    /// The calling thread acts as the driver: it waits for the queue's
    /// outstanding-task count to reach zero and only then requests shutdown,
    /// so no worker is told to stop while a sibling may still push work.
    /// Cancelling the queue from elsewhere ends the run early. Returns after
    /// every worker has been joined.
    pub fn run(
        &self,
        queue: &TaskQueue,
        matcher: &TextMatcher,
        store: &ResultStore,
    ) -> SearchResult<PoolReport> {
        let size = self.size.get();
        info!("Starting {} workers for pattern: {}", size, matcher.pattern());

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(size);
            let mut spawn_error = None;

            for id in 0..size {
                let worker = Worker {
                    id,
                    queue,
                    matcher,
                    store,
                    filter: self.filter.as_ref(),
                };
                match thread::Builder::new()
                    .name(format!("textseek-worker-{}", id))
                    .spawn_scoped(scope, move || worker.run())
                {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        warn!("Could not start worker {}: {}", id, e);
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            if handles.is_empty() {
                queue.cancel();
                return Err(spawn_error.map(SearchError::IoError).unwrap_or_else(|| {
                    SearchError::worker_panicked("no worker could be started")
                }));
            }

            queue.wait_until_drained();
            debug!("No outstanding tasks left, requesting shutdown");
            queue.request_shutdown();

            let mut report = PoolReport {
                workers: handles.len(),
                ..PoolReport::default()
            };
            let mut panicked = None;
            for handle in handles {
                match handle.join() {
                    Ok(stats) => {
                        report.directories += stats.directories;
                        report.unreadable_directories += stats.unreadable_directories;
                    }
                    Err(payload) => panicked = Some(panic_message(&*payload)),
                }
            }

            if let Some(msg) = panicked {
                return Err(SearchError::worker_panicked(msg));
            }

            info!(
                "Pool finished: {} directories ({} unreadable) across {} workers",
                report.directories, report.unreadable_directories, report.workers
            );
            Ok(report)
        })
    }
}

struct Worker<'a> {
    id: usize,
    queue: &'a TaskQueue,
    matcher: &'a TextMatcher,
    store: &'a ResultStore,
    filter: Option<&'a PathFilter>,
}

impl Worker<'_> {
    fn run(self) -> WorkerStats {
        debug!("Worker {} started", self.id);
        let mut stats = WorkerStats::default();

        while let Some(dir) = self.queue.pop_blocking() {
            let _task = TaskGuard(self.queue);
            stats.directories += 1;
            if !self.process_directory(&dir) {
                stats.unreadable_directories += 1;
            }
        }

        debug!(
            "Worker {} exiting after {} directories",
            self.id, stats.directories
        );
        stats
    }

    /// Queues the sub-directories of `dir` and scans its files.
    /// Returns false when the directory could not be listed.
    fn process_directory(&self, dir: &Path) -> bool {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot enumerate {}: {}", dir.display(), e);
                return false;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let path = entry.path();

            match classify(&entry) {
                EntryKind::Directory => {
                    if self.filter.map_or(true, |f| f.should_descend(&path)) {
                        self.queue.push(path);
                    } else {
                        trace!("Ignoring directory: {}", path.display());
                    }
                }
                EntryKind::File => {
                    if self.filter.map_or(true, |f| f.should_scan(&path)) {
                        let first_match = self.matcher.scan(&path);
                        self.store.record_scan(&path, first_match);
                    } else {
                        trace!("Filtered out: {}", path.display());
                    }
                }
                EntryKind::Skip(reason) => {
                    trace!("Skipping {} ({})", path.display(), reason);
                }
            }
        }
        true
    }
}

/// Marks the popped task finished when dropped, including during a panic.
/// A panicking worker also cancels the queue so the driver cannot wait forever.
struct TaskGuard<'a>(&'a TaskQueue);

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.cancel();
        }
        self.0.task_done();
    }
}

/// Symlinked directories are not followed. Anything whose type cannot be
/// determined is scanned as a file so the failure shows up as an unreadable file.
/// Pipes, sockets and devices are skipped since opening them can block.
fn classify(entry: &DirEntry) -> EntryKind {
    let file_type = match entry.file_type() {
        Ok(ft) => ft,
        Err(_) => return EntryKind::File,
    };

    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_symlink() {
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_dir() => EntryKind::Skip("symlinked directory"),
            Ok(meta) if meta.is_file() => EntryKind::File,
            Ok(_) => EntryKind::Skip("symlink to special file"),
            Err(_) => EntryKind::File,
        }
    } else {
        EntryKind::Skip("special file")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
