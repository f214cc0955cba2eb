//! Candidate ranking: dedup, deterministic order, bounded output.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::matching::{SearchResult, ToolMatch};

pub struct CandidateRanker {
    max_candidates: usize,
}

impl CandidateRanker {
    pub fn new(max_candidates: usize) -> Self {
        Self { max_candidates }
    }

    /// Flattens per-query results, keeps the best instance of each tool
    /// name, and returns a descending, deterministically ordered, bounded
    /// list. Equal scores are broken by provider priority, then names.
    pub fn rank(&self, results: &[SearchResult]) -> Vec<ToolMatch> {
        let mut best: HashMap<&str, &ToolMatch> = HashMap::new();
        for result in results {
            for candidate in &result.matches {
                match best.get(candidate.tool_name.as_str()) {
                    Some(incumbent) if prefer(candidate, incumbent) != Ordering::Greater => {}
                    _ => {
                        best.insert(candidate.tool_name.as_str(), candidate);
                    }
                }
            }
        }

        let mut ranked: Vec<ToolMatch> = best.into_values().cloned().collect();
        ranked.sort_by(|a, b| prefer(b, a));
        ranked.truncate(self.max_candidates);

        log::debug!(
            "[ranker] {} unique candidates, top score {:.3}",
            ranked.len(),
            ranked.first().map(|m| m.score).unwrap_or(0.0)
        );
        ranked
    }
}

impl Default for CandidateRanker {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Total preference order: score, then provider priority, then reversed
/// lexical names so that `sort_by(|a, b| prefer(b, a))` yields descending
/// scores with ascending names among exact ties.
fn prefer(a: &ToolMatch, b: &ToolMatch) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.provider_priority
                .partial_cmp(&b.provider_priority)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.provider.cmp(&a.provider))
        .then_with(|| b.tool_name.cmp(&a.tool_name))
}
