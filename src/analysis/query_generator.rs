//! Search-query generation from a question analysis.
//!
//! Question-derived queries and the generic type-derived queries go in
//! ahead of template expansions so downstream scoring never starves even
//! when extraction finds nothing. Output is deduplicated, lowercased, and
//! deterministic for identical input.

use std::collections::HashSet;

use crate::analysis::{extraction, QuestionAnalysis, QuestionType};
use crate::errors::EngineError;

const MAX_SUBSTITUTIONS: usize = 3;

pub struct QueryGenerator {
    max_queries: usize,
}

impl QueryGenerator {
    pub fn new(max_queries: usize) -> Self {
        Self { max_queries }
    }

    pub fn generate(&self, analysis: &QuestionAnalysis) -> Result<Vec<String>, EngineError> {
        if analysis.question.trim().is_empty() {
            return Err(EngineError::QueryGeneration(
                "cannot generate queries from an empty question".to_string(),
            ));
        }

        let mut queries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |raw: String| {
            let normalized = normalize(&raw);
            if !normalized.is_empty() && seen.insert(normalized.clone()) {
                queries.push(normalized);
            }
        };

        // Fallbacks go in first so the query cap can never evict them.
        for fallback in self.fallback_queries(analysis) {
            push(fallback);
        }
        for generic in generic_queries(analysis.question_type) {
            push(generic);
        }

        let problem = extraction::problem_phrase(&analysis.question);
        let process = extraction::process_phrase(&analysis.question);
        for template in templates_for(analysis.question_type) {
            for value in placeholder_values(template, analysis, &problem, &process) {
                push(template_fill(template, &value));
            }
        }

        queries.truncate(self.max_queries);
        log::debug!(
            "[query_generator] {} queries for {} question",
            queries.len(),
            analysis.question_type
        );
        Ok(queries)
    }

    /// Question-derived queries: the normalized question, the question
    /// prefixed with the type hint, and the question reduced to its
    /// content words.
    fn fallback_queries(&self, analysis: &QuestionAnalysis) -> Vec<String> {
        let question = analysis.question.as_str();
        let content_words = extraction::content_words(question).join(" ");
        vec![
            question.to_string(),
            format!("{} {}", analysis.question_type.query_hint(), question),
            content_words,
        ]
    }
}

impl Default for QueryGenerator {
    fn default() -> Self {
        Self::new(16)
    }
}

/// The three type-derived queries every request keeps regardless of what
/// extraction found. Also the queries resolution falls back to when
/// generation itself fails.
pub fn generic_queries(question_type: QuestionType) -> Vec<String> {
    let kind = question_type.as_str();
    vec![
        format!("{} tool API", kind),
        format!("{} service", kind),
        format!("best {} automation tool", kind),
    ]
}

/// Each template carries exactly one placeholder.
fn templates_for(question_type: QuestionType) -> &'static [&'static str] {
    match question_type {
        QuestionType::FactualSearch => &[
            "current information about {entity}",
            "latest {topic} data",
            "{entity} lookup",
            "real-time {topic} source",
        ],
        QuestionType::AcademicPaper => &[
            "research papers on {topic}",
            "academic studies about {entity}",
            "peer reviewed {topic} publications",
            "citations for {entity}",
        ],
        QuestionType::Automation => &[
            "automate {process}",
            "workflow integration for {process}",
            "trigger actions for {topic}",
        ],
        QuestionType::Calculation => &[
            "calculate {problem}",
            "numeric solver for {problem}",
            "{topic} calculator",
        ],
        QuestionType::ComplexAnalysis => &[
            "analyze {problem}",
            "in-depth {topic} analysis",
            "reasoning over {problem}",
        ],
        QuestionType::SimpleQa => &[
            "answer about {topic}",
            "general knowledge of {topic}",
            "explain {entity}",
        ],
    }
}

fn placeholder_values(
    template: &str,
    analysis: &QuestionAnalysis,
    problem: &str,
    process: &str,
) -> Vec<String> {
    if template.contains("{entity}") {
        analysis
            .entities
            .iter()
            .take(MAX_SUBSTITUTIONS)
            .cloned()
            .collect()
    } else if template.contains("{topic}") {
        analysis
            .topics
            .iter()
            .take(MAX_SUBSTITUTIONS)
            .cloned()
            .collect()
    } else if template.contains("{problem}") {
        if problem.is_empty() {
            Vec::new()
        } else {
            vec![problem.to_string()]
        }
    } else if template.contains("{process}") {
        if process.is_empty() {
            Vec::new()
        } else {
            vec![process.to_string()]
        }
    } else {
        Vec::new()
    }
}

fn template_fill(template: &str, value: &str) -> String {
    template
        .replace("{entity}", value)
        .replace("{topic}", value)
        .replace("{problem}", value)
        .replace("{process}", value)
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['?', '!', '.', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
