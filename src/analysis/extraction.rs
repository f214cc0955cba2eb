//! Entity and topic extraction from raw question text.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::QuestionType;

const MAX_ENTITIES: usize = 5;
const MAX_TOPICS: usize = 6;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "of", "for", "on",
        "in", "at", "to", "from", "with", "about", "into", "over", "under", "and", "or", "but",
        "not", "no", "do", "does", "did", "can", "could", "will", "would", "should", "shall",
        "may", "might", "must", "what", "which", "who", "whom", "whose", "when", "where", "why",
        "how", "this", "that", "these", "those", "it", "its", "my", "your", "our", "their", "me",
        "you", "we", "they", "i", "please", "tell", "give", "show", "find", "get", "there",
        "some", "any", "all", "each", "many", "much", "most",
    ]
    .into_iter()
    .collect()
});

static DELIMITED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'|\[([^\]]+)\]"#).unwrap());
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)+\b").unwrap());
static CAMEL_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]+(?:[A-Z][a-z0-9]*)+\b").unwrap());
static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:#|\bid\s+|\bnumber\s+)(\d+)\b").unwrap());
static PREPOSITION_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:about|of|for)\s+([A-Za-z0-9_][A-Za-z0-9_-]+)").unwrap());
static CAPITALIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap());

/// Seed vocabulary per question type, scanned before falling back to
/// generic content words.
fn topic_seeds(question_type: QuestionType) -> &'static [&'static str] {
    match question_type {
        QuestionType::FactualSearch => &[
            "weather", "climate", "news", "market", "stock", "price", "sports", "energy",
            "traffic", "currency",
        ],
        QuestionType::AcademicPaper => &[
            "physics", "chemistry", "biology", "genetics", "astronomy", "neuroscience",
            "statistics", "linguistics", "robotics",
        ],
        QuestionType::Automation => &[
            "software", "network", "database", "security", "deployment", "pipeline", "email",
            "calendar", "backup",
        ],
        QuestionType::Calculation => &[
            "finance", "interest", "percentage", "geometry", "probability", "statistics",
            "conversion",
        ],
        QuestionType::ComplexAnalysis => &[
            "economics", "politics", "history", "policy", "strategy", "architecture", "risk",
        ],
        QuestionType::SimpleQa => &[
            "geography", "history", "language", "music", "travel", "health", "medicine",
        ],
    }
}

/// Quoted or bracketed spans, `snake_case`/`camelCase` identifiers,
/// referenced numeric ids (normalized to `item_<n>`), preposition objects
/// (`about X`, `of X`, `for X`), and capitalized spans, in that order.
/// Deduplicated case-insensitively, bounded.
pub fn extract_entities(question: &str) -> Vec<String> {
    let mut entities = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |candidate: &str| {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return;
        }
        let key = trimmed.to_lowercase();
        if STOPWORDS.contains(key.as_str()) || !seen.insert(key) {
            return;
        }
        entities.push(trimmed.to_string());
    };

    for capture in DELIMITED.captures_iter(question) {
        let span = capture
            .get(1)
            .or_else(|| capture.get(2))
            .or_else(|| capture.get(3));
        if let Some(m) = span {
            push(m.as_str());
        }
    }
    for m in IDENTIFIER.find_iter(question) {
        push(m.as_str());
    }
    for m in CAMEL_CASE.find_iter(question) {
        push(m.as_str());
    }
    for capture in BARE_ID.captures_iter(question) {
        let normalized = format!("item_{}", &capture[1]);
        push(&normalized);
    }
    for capture in PREPOSITION_OBJECT.captures_iter(question) {
        push(&capture[1]);
    }
    for m in CAPITALIZED.find_iter(question) {
        push(m.as_str());
    }

    entities.truncate(MAX_ENTITIES);
    entities
}

/// Seed hits for the question type first, then leftover content words of
/// length >= 4. Words already captured as entities are skipped.
pub fn extract_topics(
    question: &str,
    question_type: QuestionType,
    entities: &[String],
) -> Vec<String> {
    let lower = question.to_lowercase();
    let entity_words: HashSet<String> = entities
        .iter()
        .flat_map(|e| tokenize(e))
        .collect();

    let mut topics = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for seed in topic_seeds(question_type) {
        if contains_word(&lower, seed) && seen.insert(seed.to_string()) {
            topics.push(seed.to_string());
        }
    }

    for word in tokenize(&lower) {
        if word.len() >= 4
            && !STOPWORDS.contains(word.as_str())
            && !entity_words.contains(&word)
            && seen.insert(word.clone())
        {
            topics.push(word);
        }
    }

    topics.truncate(MAX_TOPICS);
    topics
}

/// Leading interrogative scaffolding stripped off, bounded to the first
/// eight content-bearing words. Used for `{problem}` template slots.
pub fn problem_phrase(question: &str) -> String {
    let lower = question.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .collect();

    let mut start = 0;
    for (i, word) in words.iter().enumerate() {
        if !STOPWORDS.contains(word) {
            start = i;
            break;
        }
    }

    words[start..]
        .iter()
        .take(8)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The phrase following an automation cue, falling back to the problem
/// phrase. Used for `{process}` template slots.
pub fn process_phrase(question: &str) -> String {
    static PROCESS_CUE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b(?:automate|automating|automation of|workflow for|process of)\s+(.+)")
            .unwrap()
    });
    if let Some(capture) = PROCESS_CUE.captures(question) {
        let tail = capture[1].trim_end_matches(['?', '.', '!']).trim();
        let bounded: Vec<&str> = tail.split_whitespace().take(8).collect();
        if !bounded.is_empty() {
            return bounded.join(" ").to_lowercase();
        }
    }
    problem_phrase(question)
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Tokens with stopwords and short words removed, original order kept.
pub(crate) fn content_words(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(w.as_str()))
        .collect()
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}
