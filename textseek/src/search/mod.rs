//! Concurrent directory walking and content scanning.
//!
//! A [`SearchSession`] seeds a [`TaskQueue`] with the root directory and hands
//! it to a [`WorkerPool`]. Each worker pops a directory, pushes the
//! sub-directories it finds back onto the queue and runs the [`TextMatcher`]
//! over every file, booking the outcome in a [`ResultStore`]:
//!
//! ```text
//!   SearchSession ──seed──► TaskQueue ◄──push sub-dirs──┐
//!                              │                        │
//!                         pop_blocking             ┌────┴─────┐
//!                              └──────────────────►│ worker N │──scan──► TextMatcher
//!                                                  └────┬─────┘
//!                                                       └──record_scan──► ResultStore
//! ```
//!
//! The queue counts tasks that were pushed but not yet fully processed. The
//! pool asks the queue to shut down only when that count reaches zero, so an
//! idle worker is never released while a sibling might still discover work.
//!
//! [`ResultStore`]: crate::results::ResultStore
pub mod matcher;
pub mod pool;
pub mod queue;
pub mod session;

pub use matcher::TextMatcher;
pub use pool::{PoolReport, WorkerPool};
pub use queue::TaskQueue;
pub use session::{
    SearchRequest, SearchSession, SessionHandle, SessionObserver, SessionStatus, SessionSummary,
};
