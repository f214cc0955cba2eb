//! Weighted multi-factor scoring of (query, tool) pairs.
//!
//! Four factors with fixed weights, multiplied by the tool's declared
//! confidence and its provider's priority, clamped to [0, 1]. A pair only
//! becomes a candidate when the raw keyword overlap alone clears the
//! candidacy floor, so category or synonym weight can never carry a tool
//! that shares no vocabulary with the query.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::analysis::QuestionType;
use crate::catalog::{ProviderInfo, ToolDescriptor};
use crate::config::ScoringConfig;
use crate::matching::SearchResult;

const KEYWORD_WEIGHT: f64 = 0.35;
const CATEGORY_WEIGHT: f64 = 0.25;
const CAPABILITY_WEIGHT: f64 = 0.25;
const SEMANTIC_WEIGHT: f64 = 0.15;
/// Contribution of a single synonym-pair hit to the semantic factor.
const SEMANTIC_HIT_WEIGHT: f64 = 0.08;

/// Curated synonym pairs, checked in both directions: one term in the
/// query, the paired term in the tool's name+description text.
static SYNONYM_PAIRS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("search", "find"),
        ("search", "lookup"),
        ("fetch", "retrieve"),
        ("analyze", "evaluate"),
        ("analyze", "assess"),
        ("automate", "workflow"),
        ("compute", "calculate"),
        ("paper", "publication"),
        ("current", "latest"),
        ("record", "data"),
        ("answer", "respond"),
        ("report", "summary"),
    ]
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMatch {
    pub tool_name: String,
    pub provider: String,
    /// Carried along for the ranker's deterministic tie-break.
    pub provider_priority: f64,
    pub score: f64,
    /// Unweighted per-factor subscores keyed by factor name.
    pub relevance_factors: HashMap<String, f64>,
    /// Human-readable overlap notes for logs, never used for scoring.
    pub match_reasons: Vec<String>,
    pub descriptor: ToolDescriptor,
}

pub struct MatchScorer {
    config: ScoringConfig,
}

impl MatchScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Scores one (query, tool) pair. Returns `None` when the pair fails
    /// the keyword candidacy floor.
    pub fn score(
        &self,
        query: &str,
        question_type: QuestionType,
        provider: &ProviderInfo,
        tool: &ToolDescriptor,
    ) -> Option<ToolMatch> {
        let query_lower = query.to_lowercase();
        let query_tokens = token_set(&query_lower);
        let name_desc = format!("{} {}", tool.tool_name, tool.description).to_lowercase();
        let tool_tokens = token_set(&name_desc);

        let keyword = keyword_match(&query_tokens, &tool_tokens);
        if keyword <= self.config.candidacy_floor {
            return None;
        }

        let category = category_match(&query_lower, &tool.categories);
        let capability = capability_match(question_type, &tool.capabilities);
        let semantic = semantic_match(&query_tokens, &name_desc);

        let weighted = KEYWORD_WEIGHT * keyword
            + CATEGORY_WEIGHT * category
            + CAPABILITY_WEIGHT * capability
            + SEMANTIC_WEIGHT * semantic;
        let score = (weighted * tool.confidence_base * provider.priority)
            .min(1.0)
            .max(0.0);

        let relevance_factors = HashMap::from([
            ("keyword".to_string(), keyword),
            ("category".to_string(), category),
            ("capability".to_string(), capability),
            ("semantic".to_string(), semantic),
        ]);
        let match_reasons =
            match_reasons(&query_tokens, &tool_tokens, &query_lower, &tool.categories);

        Some(ToolMatch {
            tool_name: tool.tool_name.clone(),
            provider: provider.name.clone(),
            provider_priority: provider.priority,
            score,
            relevance_factors,
            match_reasons,
            descriptor: tool.clone(),
        })
    }

    /// Scores every query against every pooled tool.
    pub fn score_pool(
        &self,
        queries: &[String],
        question_type: QuestionType,
        pool: &[(ProviderInfo, ToolDescriptor)],
    ) -> Vec<SearchResult> {
        let results: Vec<SearchResult> = queries
            .iter()
            .map(|query| SearchResult {
                query: query.clone(),
                matches: pool
                    .iter()
                    .filter_map(|(provider, tool)| {
                        self.score(query, question_type, provider, tool)
                    })
                    .collect(),
            })
            .collect();

        let total: usize = results.iter().map(|r| r.matches.len()).sum();
        log::debug!(
            "[scorer] {} candidates from {} queries x {} tools",
            total,
            queries.len(),
            pool.len()
        );
        results
    }
}

/// Lowercase word set; identifiers split on underscores and punctuation so
/// `web_search` matches `search`. Single characters are dropped.
fn token_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(|w| w.to_string())
        .collect()
}

/// Jaccard similarity of the two word sets.
fn keyword_match(query_tokens: &HashSet<String>, tool_tokens: &HashSet<String>) -> f64 {
    if query_tokens.is_empty() || tool_tokens.is_empty() {
        return 0.0;
    }
    let intersection = query_tokens.intersection(tool_tokens).count();
    let union = query_tokens.len() + tool_tokens.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Fraction of the tool's categories appearing as substrings of the query.
fn category_match(query_lower: &str, categories: &[String]) -> f64 {
    if categories.is_empty() {
        return 0.0;
    }
    let matched = categories
        .iter()
        .filter(|c| query_lower.contains(&c.to_lowercase()))
        .count();
    matched as f64 / categories.len() as f64
}

/// Fraction of the question type's required keywords found in the tool's
/// capability list, substring in either direction.
fn capability_match(question_type: QuestionType, capabilities: &[String]) -> f64 {
    let required = question_type.required_capability_keywords();
    if required.is_empty() || capabilities.is_empty() {
        return 0.0;
    }
    let lowered: Vec<String> = capabilities.iter().map(|c| c.to_lowercase()).collect();
    let matched = required
        .iter()
        .filter(|keyword| {
            lowered
                .iter()
                .any(|cap| cap.contains(*keyword) || keyword.contains(cap.as_str()))
        })
        .count();
    matched as f64 / required.len() as f64
}

/// Synonym-pair hits against the tool's name+description text.
fn semantic_match(query_tokens: &HashSet<String>, tool_text: &str) -> f64 {
    let hits = SYNONYM_PAIRS
        .iter()
        .filter(|(a, b)| {
            (query_tokens.contains(*a) && tool_text.contains(b))
                || (query_tokens.contains(*b) && tool_text.contains(a))
        })
        .count();
    (hits as f64 * SEMANTIC_HIT_WEIGHT).min(1.0)
}

fn match_reasons(
    query_tokens: &HashSet<String>,
    tool_tokens: &HashSet<String>,
    query_lower: &str,
    categories: &[String],
) -> Vec<String> {
    let mut reasons = Vec::new();

    let mut shared: Vec<&String> = query_tokens.intersection(tool_tokens).collect();
    shared.sort();
    if !shared.is_empty() {
        let top: Vec<&str> = shared.iter().take(3).map(|s| s.as_str()).collect();
        reasons.push(format!("keywords: {}", top.join(", ")));
    }

    let matched: Vec<&str> = categories
        .iter()
        .filter(|c| query_lower.contains(&c.to_lowercase()))
        .take(2)
        .map(|c| c.as_str())
        .collect();
    if !matched.is_empty() {
        reasons.push(format!("categories: {}", matched.join(", ")));
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_tool() -> ToolDescriptor {
        ToolDescriptor::new("record_search", "builtin", "current record search")
            .with_category("record")
            .with_capability("web search")
            .with_capability("current lookup")
            .with_capability("data retrieve")
            .with_confidence_base(1.0)
    }

    fn builtin() -> ProviderInfo {
        ProviderInfo::new("builtin", 1.0)
    }

    #[test]
    fn strong_overlap_clears_execution_threshold() {
        let scorer = MatchScorer::new(ScoringConfig::default());
        let matched = scorer
            .score(
                "current record entity_13",
                QuestionType::FactualSearch,
                &builtin(),
                &search_tool(),
            )
            .expect("candidate expected");
        assert!(
            matched.score > 0.6,
            "expected score above execution threshold, got {}",
            matched.score
        );
        assert!(matched.match_reasons.iter().any(|r| r.starts_with("keywords:")));
        assert_eq!(matched.relevance_factors["category"], 1.0);
        assert!((matched.relevance_factors["keyword"] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn scores_stay_within_bounds() {
        let scorer = MatchScorer::new(ScoringConfig::default());
        let queries = [
            "current record entity_13",
            "search current record data lookup",
            "record search current",
        ];
        for query in queries {
            if let Some(matched) = scorer.score(
                query,
                QuestionType::FactualSearch,
                &ProviderInfo::new("builtin", 1.0),
                &search_tool(),
            ) {
                assert!((0.0..=1.0).contains(&matched.score), "score {}", matched.score);
            }
        }
    }

    #[test]
    fn keyword_floor_rejects_vocabulary_strangers() {
        let scorer = MatchScorer::new(ScoringConfig::default());
        // Categories and capabilities line up, vocabulary does not.
        let tool = ToolDescriptor::new("metrics_pusher", "builtin", "pushes deployment telemetry")
            .with_category("current")
            .with_capability("web search")
            .with_capability("current lookup");
        let result = scorer.score(
            "current record entity_13",
            QuestionType::FactualSearch,
            &builtin(),
            &tool,
        );
        assert!(result.is_none());
    }

    #[test]
    fn provider_priority_scales_the_score() {
        let scorer = MatchScorer::new(ScoringConfig::default());
        let trusted = scorer
            .score(
                "current record entity_13",
                QuestionType::FactualSearch,
                &ProviderInfo::new("builtin", 1.0),
                &search_tool(),
            )
            .unwrap();
        let community = scorer
            .score(
                "current record entity_13",
                QuestionType::FactualSearch,
                &ProviderInfo::new("community", 0.8),
                &search_tool(),
            )
            .unwrap();
        assert!(community.score < trusted.score);
        let ratio = community.score / trusted.score;
        assert!((ratio - 0.8).abs() < 1e-9, "ratio {}", ratio);
    }

    #[test]
    fn semantic_pairs_count_in_both_directions() {
        let query_tokens = token_set("analyze the record");
        // "evaluate" pairs with "analyze", "data" pairs with "record".
        let score = semantic_match(&query_tokens, "evaluate stored data series");
        assert!((score - 2.0 * SEMANTIC_HIT_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn capability_factor_is_fractional() {
        // Four of the five factual-search keywords are covered.
        let caps = vec!["web search".to_string(), "current lookup".to_string()];
        let score = capability_match(QuestionType::FactualSearch, &caps);
        assert!((score - 0.8).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn empty_query_scores_nothing() {
        let scorer = MatchScorer::new(ScoringConfig::default());
        assert!(scorer
            .score("??", QuestionType::SimpleQa, &builtin(), &search_tool())
            .is_none());
    }
}
