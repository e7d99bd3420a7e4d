use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::matcher::TextMatcher;
use super::pool::{PoolReport, WorkerPool};
use super::queue::TaskQueue;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::filters::PathFilter;
use crate::results::{Counters, MatchRecord, ResultStore};

/// Root directory and pattern for one session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    root_path: PathBuf,
    pattern: String,
}

impl SearchRequest {
    /// Checks the caller-side preconditions: a non-empty root and pattern.
    pub fn new(root_path: impl Into<PathBuf>, pattern: impl Into<String>) -> SearchResult<Self> {
        let root_path = root_path.into();
        let pattern = pattern.into();
        if root_path.as_os_str().is_empty() {
            return Err(SearchError::MissingRoot);
        }
        if pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        Ok(Self { root_path, pattern })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final state of a finished session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: u64,
    pub status: SessionStatus,
    pub counters: Counters,
    pub pool: PoolReport,
    pub elapsed: Duration,
}

/// Receives completion notices on the session's background thread.
pub trait SessionObserver: Send + Sync + 'static {
    /// Called once the pool has joined. The session slot is already free,
    /// so starting the next search from here is allowed.
    fn on_complete(&self, summary: &SessionSummary);
}

struct SessionShared {
    id: u64,
    queue: TaskQueue,
    status: Mutex<SessionStatus>,
}

/// Handle to a running or finished session.
///
/// Dropping the handle detaches it; the session still runs to completion and
/// keeps the session slot until then.
pub struct SessionHandle {
    shared: Arc<SessionShared>,
    thread: Option<JoinHandle<SearchResult<SessionSummary>>>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.lock()
    }

    pub fn is_finished(&self) -> bool {
        self.status() != SessionStatus::Running
    }

    /// Stops handing out directories. Scans already in progress finish.
    /// Returns false when the session had already finished.
    pub fn cancel(&self) -> bool {
        // Held across the queue cancel so the session cannot publish
        // `Completed` after a cancel was accepted.
        let status = self.shared.status.lock();
        if *status != SessionStatus::Running {
            return false;
        }
        let dropped = self.shared.queue.cancel();
        drop(status);
        debug!(
            "Session {} cancelled with {} directories still queued",
            self.shared.id, dropped
        );
        true
    }

    /// Blocks until the session thread exits and returns its summary
    pub fn wait(mut self) -> SearchResult<SessionSummary> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| SearchError::worker_panicked("session thread panicked"))?,
            None => Err(SearchError::worker_panicked("session already joined")),
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

/// Releases the single session slot when dropped
struct ActiveSlot(Arc<AtomicBool>);

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Entry point for the UI: starts searches and serves their results.
///
/// One instance owns one [`ResultStore`] and allows a single running session
/// at a time; a second [`start`](Self::start) while one runs is rejected with
/// [`SearchError::SessionActive`].
pub struct SearchSession {
    config: SearchConfig,
    store: Arc<ResultStore>,
    active: Arc<AtomicBool>,
    next_id: AtomicU64,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl SearchSession {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            store: Arc::new(ResultStore::new()),
            active: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Validates `root_path` and `pattern`, then starts a session
    pub fn start_search(
        &self,
        root_path: impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> SearchResult<SessionHandle> {
        self.start(SearchRequest::new(root_path, pattern)?)
    }

    /// Resets the store, seeds the queue with the root and runs the pool on
    /// a background thread. Returns without waiting for the search.
    pub fn start(&self, request: SearchRequest) -> SearchResult<SessionHandle> {
        let context = self.prepare(request)?;
        let shared = Arc::clone(&context.shared);

        // On spawn failure the context, and with it the slot, is dropped.
        let thread = thread::Builder::new()
            .name(format!("textseek-session-{}", shared.id))
            .spawn(move || context.run())?;

        Ok(SessionHandle {
            shared,
            thread: Some(thread),
        })
    }

    /// Claims the session slot and sets up everything a run needs
    fn prepare(&self, request: SearchRequest) -> SearchResult<SessionContext> {
        let filter = PathFilter::from_config(&self.config)?.rooted_at(request.root_path());

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejecting search while another session is running");
            return Err(SearchError::SessionActive);
        }
        let slot = ActiveSlot(Arc::clone(&self.active));

        self.store.reset();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let shared = Arc::new(SessionShared {
            id,
            queue: TaskQueue::new(),
            status: Mutex::new(SessionStatus::Running),
        });
        shared.queue.push(request.root_path().to_path_buf());

        Ok(SessionContext {
            slot,
            shared,
            pool: WorkerPool::new(self.config.worker_count).with_filter(filter),
            matcher: TextMatcher::new(request.pattern(), self.config.encoding_mode),
            store: Arc::clone(&self.store),
            observer: self.observer.clone(),
            request,
        })
    }

    /// Up to `count` records starting at `offset`, in completion order
    pub fn results_page(&self, offset: usize, count: usize) -> Vec<MatchRecord> {
        self.store.snapshot(offset, count)
    }

    pub fn counters(&self) -> Counters {
        self.store.counters()
    }

    pub fn cancel(&self, handle: &SessionHandle) -> bool {
        handle.cancel()
    }

    /// True while a session holds the slot
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

struct SessionContext {
    slot: ActiveSlot,
    shared: Arc<SessionShared>,
    pool: WorkerPool,
    matcher: TextMatcher,
    store: Arc<ResultStore>,
    observer: Option<Arc<dyn SessionObserver>>,
    request: SearchRequest,
}

impl SessionContext {
    fn run(self) -> SearchResult<SessionSummary> {
        let started = Instant::now();
        info!(
            "Session {} searching {} for '{}'",
            self.shared.id,
            self.request.root_path().display(),
            self.request.pattern()
        );

        let outcome = self.pool.run(&self.shared.queue, &self.matcher, &self.store);
        self.finish(outcome, started)
    }

    /// Publishes the final status, frees the slot and notifies the observer.
    /// Runs for failed pools too; the pool error is returned afterwards.
    fn finish(
        self,
        outcome: SearchResult<PoolReport>,
        started: Instant,
    ) -> SearchResult<SessionSummary> {
        let status = {
            let mut current = self.shared.status.lock();
            *current = match (&outcome, self.shared.queue.is_cancelled()) {
                (Err(_), _) => SessionStatus::Failed,
                (Ok(_), true) => SessionStatus::Cancelled,
                (Ok(_), false) => SessionStatus::Completed,
            };
            *current
        };
        // Read before the slot is released; the next session resets the store.
        let counters = self.store.counters();
        drop(self.slot);

        let summary = SessionSummary {
            id: self.shared.id,
            status,
            counters,
            pool: outcome.as_ref().copied().unwrap_or_default(),
            elapsed: started.elapsed(),
        };
        match &outcome {
            Ok(_) => info!(
                "Session {} {}: {} files scanned, {} matches",
                summary.id, status, counters.files_scanned, counters.matches_found
            ),
            Err(e) => warn!(
                "Session {} {} after {} files scanned: {}",
                summary.id, status, counters.files_scanned, e
            ),
        }

        if let Some(observer) = &self.observer {
            observer.on_complete(&summary);
        }
        outcome.map(|_| summary)
    }
}
