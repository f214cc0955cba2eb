//! Tool synthesis through the LLM collaborator.
//!
//! Tier 3 asks the provider for a new tool specification, validates the
//! payload, and wraps it in an adapter factory the orchestrator registers.
//! Anything unusable coming back from the model is a `SynthesisFailure`;
//! the orchestrator treats it as a tier miss.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::analysis::{QuestionAnalysis, QuestionType};
use crate::errors::EngineError;
use crate::llm::LlmProvider;
use crate::registry::{Adapter, AdapterFactory};

/// A freshly synthesized tool specification, ready for registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedSpec {
    pub spec_id: String,
    pub name: String,
    pub description: String,
    pub capability_tags: Vec<String>,
    pub intent_tags: Vec<QuestionType>,
    /// Instruction block the synthesized adapter answers with.
    pub implementation: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Wire shape expected from the model. Kept separate from
/// [`SynthesizedSpec`] so payload quirks stay at the parsing boundary.
#[derive(Debug, Deserialize)]
struct SpecPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    capability_tags: Vec<String>,
    #[serde(default)]
    intent_tags: Vec<String>,
    #[serde(default)]
    implementation: String,
}

pub struct SynthesisEngine {
    provider: Arc<dyn LlmProvider>,
}

impl SynthesisEngine {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn synthesize(
        &self,
        analysis: &QuestionAnalysis,
    ) -> Result<SynthesizedSpec, EngineError> {
        let prompt = build_prompt(analysis);
        let response = self
            .provider
            .complete(&prompt)
            .await
            .map_err(|e| EngineError::SynthesisFailure(format!("provider error: {}", e)))?;

        let spec = parse_spec(&response, analysis)?;
        log::debug!(
            "[synthesis] produced spec '{}' ({} capability tags)",
            spec.name,
            spec.capability_tags.len()
        );
        Ok(spec)
    }
}

fn build_prompt(analysis: &QuestionAnalysis) -> String {
    format!(
        r#"You design specifications for small single-purpose tools.

Question: {question}
Question type: {question_type}
Entities: {entities}
Topics: {topics}

Respond with exactly one JSON object:
{{"name": "...", "description": "...", "capability_tags": ["..."], "intent_tags": ["..."], "implementation": "..."}}

Rules:
- name is a short snake_case identifier for the tool
- description says what the tool does in one sentence
- capability_tags list the capabilities the tool provides
- intent_tags is a subset of [factual_search, academic_paper, automation, calculation, complex_analysis, simple_qa]
- implementation is the instruction block the tool follows when invoked"#,
        question = analysis.question,
        question_type = analysis.question_type,
        entities = analysis.entities.join(", "),
        topics = analysis.topics.join(", "),
    )
}

fn parse_spec(response: &str, analysis: &QuestionAnalysis) -> Result<SynthesizedSpec, EngineError> {
    let json = extract_json(response).ok_or_else(|| {
        EngineError::SynthesisFailure("response contains no JSON object".to_string())
    })?;
    let payload: SpecPayload = serde_json::from_str(&json)
        .map_err(|e| EngineError::SynthesisFailure(format!("invalid spec payload: {}", e)))?;

    let name = slugify(&payload.name);
    if name.is_empty() {
        return Err(EngineError::SynthesisFailure(
            "spec is missing a usable name".to_string(),
        ));
    }
    if payload.description.trim().is_empty() {
        return Err(EngineError::SynthesisFailure(
            "spec is missing a description".to_string(),
        ));
    }
    if payload.implementation.trim().is_empty() {
        return Err(EngineError::SynthesisFailure(
            "spec is missing an implementation".to_string(),
        ));
    }

    let mut capability_tags: Vec<String> = Vec::new();
    for tag in &payload.capability_tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !capability_tags.contains(&tag) {
            capability_tags.push(tag);
        }
    }
    if capability_tags.is_empty() {
        return Err(EngineError::SynthesisFailure(
            "spec declares no capability tags".to_string(),
        ));
    }

    // Unknown intent labels are dropped; an empty set inherits the
    // question's own type so the adapter stays reachable through Tier 2.
    let mut intent_tags: Vec<QuestionType> = Vec::new();
    for tag in &payload.intent_tags {
        if let Some(question_type) = QuestionType::from_str(tag) {
            if !intent_tags.contains(&question_type) {
                intent_tags.push(question_type);
            }
        }
    }
    if intent_tags.is_empty() {
        intent_tags.push(analysis.question_type);
    }

    let implementation = payload.implementation.trim().to_string();
    Ok(SynthesizedSpec {
        spec_id: Uuid::new_v4().to_string(),
        name,
        description: payload.description.trim().to_string(),
        capability_tags,
        intent_tags,
        content_hash: sha256_hex(implementation.as_bytes()),
        implementation,
        created_at: Utc::now(),
    })
}

/// Pulls the first JSON object out of the response, tolerating code fences
/// and surrounding prose. Depth scan only; braces inside string values of
/// well-formed payloads are balanced anyway.
fn extract_json(text: &str) -> Option<String> {
    let body = match text.find("```json") {
        Some(fence_start) => {
            let after = &text[fence_start + 7..];
            match after.find("```") {
                Some(fence_end) => &after[..fence_end],
                None => after,
            }
        }
        None => text,
    };

    let start = body.find('{')?;
    let mut depth = 0usize;
    for (idx, ch) in body[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(body[start..start + idx + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut last_was_sep = true;
    for ch in raw.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    slug.trim_end_matches('_').to_string()
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Adapter backed by a synthesized spec: it answers by prefixing the
/// spec's instruction block to the question and completing through the
/// same provider that produced it.
pub struct SynthesizedAdapter {
    spec: SynthesizedSpec,
    provider: Arc<dyn LlmProvider>,
}

#[async_trait]
impl Adapter for SynthesizedAdapter {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn handle(
        &self,
        question: &str,
        _context: &HashMap<String, String>,
    ) -> Result<String, EngineError> {
        let prompt = format!("{}\n\nQuestion: {}", self.spec.implementation, question);
        self.provider.complete(&prompt).await
    }
}

pub struct SynthesizedAdapterFactory {
    spec: SynthesizedSpec,
    provider: Arc<dyn LlmProvider>,
}

impl SynthesizedAdapterFactory {
    pub fn new(spec: SynthesizedSpec, provider: Arc<dyn LlmProvider>) -> Self {
        Self { spec, provider }
    }
}

#[async_trait]
impl AdapterFactory for SynthesizedAdapterFactory {
    async fn construct(&self) -> Result<Arc<dyn Adapter>, EngineError> {
        Ok(Arc::new(SynthesizedAdapter {
            spec: self.spec.clone(),
            provider: self.provider.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StubLlmProvider;

    fn analysis(question: &str, question_type: QuestionType) -> QuestionAnalysis {
        QuestionAnalysis {
            question: question.to_string(),
            question_type,
            entities: vec![],
            topics: vec![],
        }
    }

    #[test]
    fn extracts_json_from_fenced_response() {
        let response = "Here you go:\n```json\n{\"name\": \"x\"}\n```\nanything else";
        assert_eq!(extract_json(response).unwrap(), "{\"name\": \"x\"}");
    }

    #[test]
    fn extracts_first_balanced_object_from_prose() {
        let response = "I suggest {\"name\": \"x\", \"nested\": {\"a\": 1}} as the spec.";
        assert_eq!(
            extract_json(response).unwrap(),
            "{\"name\": \"x\", \"nested\": {\"a\": 1}}"
        );
    }

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("  Compound Interest Helper! "), "compound_interest_helper");
        assert_eq!(slugify("already_snake"), "already_snake");
        assert_eq!(slugify("***"), "");
    }

    #[tokio::test]
    async fn stub_round_trip_produces_valid_spec() {
        let engine = SynthesisEngine::new(Arc::new(StubLlmProvider::new()));
        let spec = engine
            .synthesize(&analysis(
                "calculate compound interest over 10 years",
                QuestionType::Calculation,
            ))
            .await
            .unwrap();

        assert_eq!(spec.name, "synthesized_calculator");
        assert!(!spec.spec_id.is_empty());
        assert_eq!(spec.content_hash.len(), 64);
        assert!(spec.intent_tags.contains(&QuestionType::Calculation));
        assert!(!spec.capability_tags.is_empty());
    }

    #[tokio::test]
    async fn unusable_payload_is_a_synthesis_failure() {
        let provider = StubLlmProvider::new().with_reply(
            "unanswerable",
            r#"{"name": "", "description": "", "implementation": ""}"#,
        );
        let engine = SynthesisEngine::new(Arc::new(provider));
        let err = engine
            .synthesize(&analysis("something unanswerable", QuestionType::SimpleQa))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SynthesisFailure(_)));
    }

    #[tokio::test]
    async fn unknown_intent_tags_fall_back_to_question_type() {
        let provider = StubLlmProvider::new().with_reply(
            "orbital",
            r#"{"name": "orbit_helper", "description": "computes orbits",
                "capability_tags": ["math"], "intent_tags": ["astrology_reading"],
                "implementation": "compute the orbit"}"#,
        );
        let engine = SynthesisEngine::new(Arc::new(provider));
        let spec = engine
            .synthesize(&analysis("orbital period question", QuestionType::Calculation))
            .await
            .unwrap();
        assert_eq!(spec.intent_tags, vec![QuestionType::Calculation]);
    }

    #[tokio::test]
    async fn synthesized_adapter_answers_with_its_instruction_block() {
        let engine = SynthesisEngine::new(Arc::new(StubLlmProvider::new()));
        let spec = engine
            .synthesize(&analysis("calculate the mean", QuestionType::Calculation))
            .await
            .unwrap();

        let echo_provider = Arc::new(StubLlmProvider::new().with_reply(
            "answer the user's request step by step",
            "42",
        ));
        let factory = SynthesizedAdapterFactory::new(spec, echo_provider);
        let adapter = factory.construct().await.unwrap();
        let answer = adapter.handle("what is the mean of 41 and 43", &HashMap::new()).await.unwrap();
        assert_eq!(answer, "42");
    }
}
