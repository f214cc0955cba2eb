//! Scoring and ranking of catalog tools against generated queries.

pub mod ranker;
pub mod scorer;

pub use ranker::CandidateRanker;
pub use scorer::{MatchScorer, ToolMatch};

use serde::{Deserialize, Serialize};

/// Every surviving candidate for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub matches: Vec<ToolMatch>,
}
