pub mod config;
pub mod errors;
pub mod filters;
pub mod results;
pub mod search;

pub use config::{CliOverrides, EncodingMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use results::{Counters, MatchRecord, ResultStore};
pub use search::{
    SearchRequest, SearchSession, SessionHandle, SessionObserver, SessionStatus, SessionSummary,
};
