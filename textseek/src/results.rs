//! Shared result storage for a search session.
//!
//! Records are kept in the order scans completed, which differs between runs
//! over the same tree. Readers must not assume any sorting.
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// First occurrence of the pattern in one file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchRecord {
    /// The file that matched
    pub path: PathBuf,
    /// 1-based line number of the first matching line
    pub line_number: usize,
}

impl MatchRecord {
    pub fn new(path: impl Into<PathBuf>, line_number: usize) -> Self {
        debug_assert!(line_number > 0, "line numbers are 1-based");
        Self {
            path: path.into(),
            line_number,
        }
    }
}

/// Running totals for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Files handed to the matcher, whether or not they matched
    pub files_scanned: u64,
    /// Files that produced a record
    pub matches_found: u64,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<MatchRecord>,
    counters: Counters,
}

/// Append-only record list plus counters, all behind one lock.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<StoreInner>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record
    pub fn record(&self, record: MatchRecord) {
        self.inner.lock().records.push(record);
    }

    pub fn increment_scanned(&self) {
        self.inner.lock().counters.files_scanned += 1;
    }

    pub fn increment_matched(&self) {
        self.inner.lock().counters.matches_found += 1;
    }

    /// Books one finished file scan under a single lock acquisition.
    ///
    /// The scanned counter always moves; a match also appends a record and
    /// bumps the match counter.
    pub fn record_scan(&self, path: &Path, first_match: Option<usize>) {
        let mut inner = self.inner.lock();
        inner.counters.files_scanned += 1;
        if let Some(line_number) = first_match {
            inner.records.push(MatchRecord::new(path, line_number));
            inner.counters.matches_found += 1;
        }
    }

    /// Copies up to `count` records starting at `offset`, in append order
    pub fn snapshot(&self, offset: usize, count: usize) -> Vec<MatchRecord> {
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .skip(offset)
            .take(count)
            .cloned()
            .collect()
    }

    /// Both counters, read together
    pub fn counters(&self) -> Counters {
        self.inner.lock().counters
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all records and counters for a new session
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.records.clear();
        inner.counters = Counters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_scan_updates_counters() {
        let store = ResultStore::new();
        store.record_scan(Path::new("a.txt"), Some(3));
        store.record_scan(Path::new("b.txt"), None);

        assert_eq!(
            store.counters(),
            Counters {
                files_scanned: 2,
                matches_found: 1
            }
        );
        assert_eq!(store.snapshot(0, 10), vec![MatchRecord::new("a.txt", 3)]);
    }

    #[test]
    fn test_individual_operations() {
        let store = ResultStore::new();
        store.record(MatchRecord::new("x.txt", 1));
        store.increment_matched();
        store.increment_scanned();
        store.increment_scanned();

        let counters = store.counters();
        assert_eq!(counters.files_scanned, 2);
        assert_eq!(counters.matches_found, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapshot_paging() {
        let store = ResultStore::new();
        for i in 1..=5 {
            store.record(MatchRecord::new(format!("f{}.txt", i), i));
        }

        let page = store.snapshot(1, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].path, PathBuf::from("f2.txt"));
        assert_eq!(page[1].path, PathBuf::from("f3.txt"));

        // A page running past the end is truncated, not padded
        assert_eq!(store.snapshot(4, 10).len(), 1);
        assert!(store.snapshot(5, 10).is_empty());
        assert!(store.snapshot(100, 10).is_empty());
        assert!(store.snapshot(0, 0).is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = ResultStore::new();
        store.record_scan(Path::new("a.txt"), Some(1));
        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.counters(), Counters::default());
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(ResultStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        let hit = (i % 4 == 0).then_some(i + 1);
                        store.record_scan(Path::new(&format!("t{}/f{}", t, i)), hit);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let counters = store.counters();
        assert_eq!(counters.files_scanned, 800);
        assert_eq!(counters.matches_found, 200);
        assert_eq!(store.len(), 200);
    }
}
