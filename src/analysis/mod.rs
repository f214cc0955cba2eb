//! Question classification and analysis.
//!
//! Every request starts here: the raw question is labeled with a
//! [`QuestionType`] (honoring an explicit `question_type` override in the
//! request context) and mined for entities and topics. The resulting
//! [`QuestionAnalysis`] feeds query generation, the capability factor of the
//! scorer, and the adapter confidence matrix.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod extraction;
pub mod query_generator;

pub use query_generator::QueryGenerator;

/// Coarse classification of what a question needs from a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    FactualSearch,
    AcademicPaper,
    Automation,
    Calculation,
    ComplexAnalysis,
    SimpleQa,
}

impl QuestionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "factual_search" | "factual" | "search" => Some(QuestionType::FactualSearch),
            "academic_paper" | "academic" | "paper" => Some(QuestionType::AcademicPaper),
            "automation" | "workflow" => Some(QuestionType::Automation),
            "calculation" | "math" | "compute" => Some(QuestionType::Calculation),
            "complex_analysis" | "analysis" => Some(QuestionType::ComplexAnalysis),
            "simple_qa" | "qa" | "general" => Some(QuestionType::SimpleQa),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::FactualSearch => "factual_search",
            QuestionType::AcademicPaper => "academic_paper",
            QuestionType::Automation => "automation",
            QuestionType::Calculation => "calculation",
            QuestionType::ComplexAnalysis => "complex_analysis",
            QuestionType::SimpleQa => "simple_qa",
        }
    }

    /// Capability keywords a tool must advertise to serve this type well.
    /// Consumed by the scorer's capability factor.
    pub fn required_capability_keywords(&self) -> &'static [&'static str] {
        match self {
            QuestionType::FactualSearch => &["search", "web", "lookup", "current", "retrieve"],
            QuestionType::AcademicPaper => &["academic", "research", "paper", "scholar", "citation"],
            QuestionType::Automation => &["automation", "workflow", "integration", "trigger", "action"],
            QuestionType::Calculation => &["math", "calculation", "compute", "numeric", "statistic"],
            QuestionType::ComplexAnalysis => &["analysis", "reasoning", "synthesis", "report", "plan"],
            QuestionType::SimpleQa => &["answer", "question", "knowledge", "general", "explain"],
        }
    }

    /// Single word prepended to the raw question for the typed fallback query.
    pub fn query_hint(&self) -> &'static str {
        match self {
            QuestionType::FactualSearch => "search",
            QuestionType::AcademicPaper => "research",
            QuestionType::Automation => "automation",
            QuestionType::Calculation => "calculate",
            QuestionType::ComplexAnalysis => "analysis",
            QuestionType::SimpleQa => "answer",
        }
    }

    pub fn all() -> [QuestionType; 6] {
        [
            QuestionType::FactualSearch,
            QuestionType::AcademicPaper,
            QuestionType::Automation,
            QuestionType::Calculation,
            QuestionType::ComplexAnalysis,
            QuestionType::SimpleQa,
        ]
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-request analysis handed to the downstream stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub question: String,
    pub question_type: QuestionType,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
}

/// Ordered rule table; the first matching pattern wins. Academic and
/// automation cues are checked before the broad factual cues so that
/// "latest research papers" stays academic.
static CLASSIFIER_RULES: Lazy<Vec<(Regex, QuestionType)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(papers?|study|studies|arxiv|journals?|publications?|research|citations?|peer.reviewed)\b").unwrap(),
            QuestionType::AcademicPaper,
        ),
        (
            Regex::new(r"(?i)\b(automate|automation|workflows?|schedule|triggers?|integrate|pipelines?)\b").unwrap(),
            QuestionType::Automation,
        ),
        (
            Regex::new(r"(?i)\b(calculate|compute|sum|average|median|percentage|convert|how many|how much|solve|equation)\b").unwrap(),
            QuestionType::Calculation,
        ),
        (
            Regex::new(r"(?i)\b(analyz?e|analysis|compare|comparison|evaluate|assess|trade.?offs?|implications|in.depth)\b").unwrap(),
            QuestionType::ComplexAnalysis,
        ),
        (
            Regex::new(r"(?i)\b(current|latest|today|now|recent|record|price|weather|news|score|happening)\b").unwrap(),
            QuestionType::FactualSearch,
        ),
    ]
});

pub struct QuestionAnalyzer;

impl QuestionAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Classifies and mines the question. A `question_type` key in the
    /// request context bypasses rule classification when it parses.
    pub fn analyze(&self, question: &str, context: &HashMap<String, String>) -> QuestionAnalysis {
        let question_type = context
            .get("question_type")
            .and_then(|v| QuestionType::from_str(v))
            .unwrap_or_else(|| self.classify(question));

        let entities = extraction::extract_entities(question);
        let topics = extraction::extract_topics(question, question_type, &entities);

        log::debug!(
            "[analysis] type={} entities={:?} topics={:?}",
            question_type,
            entities,
            topics
        );

        QuestionAnalysis {
            question: question.to_string(),
            question_type,
            entities,
            topics,
        }
    }

    pub fn classify(&self, question: &str) -> QuestionType {
        for (pattern, question_type) in CLASSIFIER_RULES.iter() {
            if pattern.is_match(question) {
                return *question_type;
            }
        }
        QuestionType::SimpleQa
    }
}

impl Default for QuestionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_cascade() {
        let analyzer = QuestionAnalyzer::new();
        assert_eq!(
            analyzer.classify("Find recent papers on transformer pruning"),
            QuestionType::AcademicPaper
        );
        assert_eq!(
            analyzer.classify("Automate my weekly report workflow"),
            QuestionType::Automation
        );
        assert_eq!(
            analyzer.classify("Calculate the average of these readings"),
            QuestionType::Calculation
        );
        assert_eq!(
            analyzer.classify("Compare the trade-offs between the two designs"),
            QuestionType::ComplexAnalysis
        );
        assert_eq!(
            analyzer.classify("What is the latest price of copper?"),
            QuestionType::FactualSearch
        );
        assert_eq!(
            analyzer.classify("Why is the sky blue?"),
            QuestionType::SimpleQa
        );
    }

    #[test]
    fn research_beats_factual_cues() {
        let analyzer = QuestionAnalyzer::new();
        assert_eq!(
            analyzer.classify("latest research papers on current climate models"),
            QuestionType::AcademicPaper
        );
    }

    #[test]
    fn context_override_wins() {
        let analyzer = QuestionAnalyzer::new();
        let mut context = HashMap::new();
        context.insert("question_type".to_string(), "factual_search".to_string());
        let analysis = analyzer.analyze("Why is the sky blue?", &context);
        assert_eq!(analysis.question_type, QuestionType::FactualSearch);
    }

    #[test]
    fn unknown_override_falls_back_to_rules() {
        let analyzer = QuestionAnalyzer::new();
        let mut context = HashMap::new();
        context.insert("question_type".to_string(), "nonsense".to_string());
        let analysis = analyzer.analyze("calculate 2 plus 2", &context);
        assert_eq!(analysis.question_type, QuestionType::Calculation);
    }

    #[test]
    fn type_labels_round_trip() {
        for qt in QuestionType::all() {
            assert_eq!(QuestionType::from_str(qt.as_str()), Some(qt));
            let json = serde_json::to_string(&qt).unwrap();
            assert_eq!(json, format!("\"{}\"", qt.as_str()));
        }
    }
}
