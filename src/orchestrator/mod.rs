//! Tiered resolution orchestration.
//!
//! Runs the three tiers in order under one overall deadline. A tier gets
//! the smaller of its own budget and whatever remains of the deadline;
//! a timed-out or failed tier is recorded in the trace and the next tier
//! runs. Only when every tier has missed does the caller see a
//! `ResolutionFailed` carrying the whole trace.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::analysis::{
    query_generator, QueryGenerator, QuestionAnalysis, QuestionAnalyzer, QuestionType,
};
use crate::catalog::{
    CatalogDirectory, HttpCatalogDirectory, ProviderInfo, ToolCatalog, ToolDescriptor,
};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::llm::{make_provider, LlmProvider};
use crate::matching::{CandidateRanker, MatchScorer, ToolMatch};
use crate::registry::{AdapterRegistration, AdapterRegistry};
use crate::synthesis::{SynthesisEngine, SynthesizedAdapterFactory, SynthesizedSpec};

/// Queries forwarded to the remote directory per request.
const DIRECTORY_QUERY_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    Searching,
    ExecuteTier1,
    AdapterMatching,
    ExecuteTier2,
    Synthesizing,
    ExecuteTier3,
    Failed,
}

/// What resolution handed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolved {
    Catalog(ToolMatch),
    Adapter(AdapterRegistration),
    Synthesized(SynthesizedSpec),
}

impl Resolved {
    /// Stable identity of the resolved tool, for logs and idempotence
    /// comparisons.
    pub fn identity(&self) -> &str {
        match self {
            Resolved::Catalog(tool_match) => &tool_match.tool_name,
            Resolved::Adapter(registration) => &registration.adapter_id,
            Resolved::Synthesized(spec) => &spec.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub question: String,
    pub question_type: QuestionType,
    pub tier_used: u8,
    pub phase: ResolutionPhase,
    pub resolved: Resolved,
    pub confidence: f64,
    pub tier_trace: Vec<String>,
    pub elapsed_ms: u64,
}

struct TierHit {
    resolved: Resolved,
    confidence: f64,
    note: String,
}

pub struct TierOrchestrator {
    config: EngineConfig,
    analyzer: QuestionAnalyzer,
    generator: QueryGenerator,
    scorer: MatchScorer,
    ranker: CandidateRanker,
    catalog: Arc<ToolCatalog>,
    registry: Arc<AdapterRegistry>,
    provider: Arc<dyn LlmProvider>,
    synthesis: SynthesisEngine,
    directory: Option<Arc<dyn CatalogDirectory>>,
}

impl TierOrchestrator {
    pub fn new(
        config: EngineConfig,
        catalog: Arc<ToolCatalog>,
        registry: Arc<AdapterRegistry>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            analyzer: QuestionAnalyzer::new(),
            generator: QueryGenerator::new(config.scoring.max_queries),
            scorer: MatchScorer::new(config.scoring.clone()),
            ranker: CandidateRanker::new(config.scoring.max_candidates),
            catalog,
            registry,
            synthesis: SynthesisEngine::new(provider.clone()),
            provider,
            directory: None,
            config,
        }
    }

    /// Builds the whole engine from configuration: catalog, registry,
    /// provider, and the remote directory when one is configured.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let catalog = Arc::new(ToolCatalog::from_config(&config.catalog));
        let registry = Arc::new(AdapterRegistry::new(&config.matrix));
        let provider = make_provider(&config.llm)?;
        let directory: Option<Arc<dyn CatalogDirectory>> = match &config.catalog.directory {
            Some(directory_config) => Some(Arc::new(HttpCatalogDirectory::new(
                directory_config.clone(),
            )?)),
            None => None,
        };

        let mut orchestrator = Self::new(config, catalog, registry, provider);
        orchestrator.directory = directory;
        Ok(orchestrator)
    }

    pub fn with_directory(mut self, directory: Arc<dyn CatalogDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Resolves a question to a tool through the tier cascade.
    pub async fn resolve(
        &self,
        question: &str,
        context: &HashMap<String, String>,
    ) -> Result<ResolutionOutcome, EngineError> {
        let started = Instant::now();
        let overall = Duration::from_millis(self.config.tiers.overall_timeout_ms);
        let mut trace: Vec<String> = Vec::new();

        let analysis = self.analyzer.analyze(question, context);
        log::info!(
            "[orchestrator] resolving {} question: {}",
            analysis.question_type,
            analysis.question
        );

        if self.config.tiers.enable_catalog_search {
            log::debug!("[orchestrator] phase={:?}", ResolutionPhase::Searching);
            let budget_ms = self.config.tiers.tier1_timeout_ms;
            if let Some(hit) = self
                .run_tier(1, budget_ms, started, overall, &mut trace, self.tier1(&analysis))
                .await
            {
                let phase = ResolutionPhase::ExecuteTier1;
                return Ok(self.outcome(&analysis, 1, phase, hit, trace, started));
            }
        } else {
            trace.push("tier 1: disabled".to_string());
        }

        if self.config.tiers.enable_adapter_matching {
            log::debug!("[orchestrator] phase={:?}", ResolutionPhase::AdapterMatching);
            let budget_ms = self.config.tiers.tier2_timeout_ms;
            if let Some(hit) = self
                .run_tier(2, budget_ms, started, overall, &mut trace, self.tier2(&analysis))
                .await
            {
                let phase = ResolutionPhase::ExecuteTier2;
                return Ok(self.outcome(&analysis, 2, phase, hit, trace, started));
            }
        } else {
            trace.push("tier 2: disabled".to_string());
        }

        if self.config.tiers.enable_synthesis {
            log::debug!("[orchestrator] phase={:?}", ResolutionPhase::Synthesizing);
            let budget_ms = self.config.tiers.tier3_timeout_ms;
            if let Some(hit) = self
                .run_tier(3, budget_ms, started, overall, &mut trace, self.tier3(&analysis))
                .await
            {
                let phase = ResolutionPhase::ExecuteTier3;
                return Ok(self.outcome(&analysis, 3, phase, hit, trace, started));
            }
        } else {
            trace.push("tier 3: disabled".to_string());
        }

        log::warn!("[orchestrator] resolution failed: {}", trace.join(" | "));
        Err(EngineError::ResolutionFailed { trace })
    }

    /// Wraps one tier in its budget. A hit returns; everything else
    /// (error, timeout, exhausted deadline) becomes a trace entry.
    async fn run_tier<F>(
        &self,
        tier: u8,
        tier_timeout_ms: u64,
        started: Instant,
        overall: Duration,
        trace: &mut Vec<String>,
        tier_future: F,
    ) -> Option<TierHit>
    where
        F: Future<Output = Result<TierHit, EngineError>>,
    {
        let remaining = overall
            .checked_sub(started.elapsed())
            .filter(|d| !d.is_zero());
        let budget = match remaining {
            Some(remaining) => remaining.min(Duration::from_millis(tier_timeout_ms)),
            None => {
                trace.push(format!("tier {}: skipped, overall deadline exhausted", tier));
                return None;
            }
        };

        match tokio::time::timeout(budget, tier_future).await {
            Ok(Ok(hit)) => {
                trace.push(hit.note.clone());
                Some(hit)
            }
            Ok(Err(e)) => {
                log::debug!("[orchestrator] tier {} missed: {}", tier, e);
                trace.push(format!("tier {}: {}", tier, e));
                None
            }
            Err(_) => {
                trace.push(format!("tier {}: timed out after {}ms", tier, budget.as_millis()));
                None
            }
        }
    }

    /// Tier 1: queries, catalog snapshot plus optional directory hits,
    /// scoring, ranking, execution threshold.
    async fn tier1(&self, analysis: &QuestionAnalysis) -> Result<TierHit, EngineError> {
        let mut degradations: Vec<String> = Vec::new();

        let queries = match self.generator.generate(analysis) {
            Ok(queries) => queries,
            Err(e) => {
                // Resolution proceeds on the generic type queries alone.
                degradations.push(format!("query generation degraded ({})", e));
                query_generator::generic_queries(analysis.question_type)
            }
        };

        let mut pool = self.catalog.snapshot();
        if let Some(directory) = &self.directory {
            let (hits, degradation) = self.directory_hits(directory, &queries).await;
            if let Some(problem) = degradation {
                degradations.push(problem);
            }
            pool.extend(hits);
        }
        if pool.is_empty() {
            return Err(EngineError::NoCandidateFound(with_degradations(
                "tool pool is empty".to_string(),
                &degradations,
            )));
        }

        let results = self.scorer.score_pool(&queries, analysis.question_type, &pool);
        let ranked = self.ranker.rank(&results);
        let top = match ranked.first() {
            Some(top) => top.clone(),
            None => {
                return Err(EngineError::NoCandidateFound(with_degradations(
                    format!(
                        "no tool cleared the keyword floor across {} queries and {} tools",
                        queries.len(),
                        pool.len()
                    ),
                    &degradations,
                )))
            }
        };

        if top.score > self.config.scoring.execution_threshold {
            Ok(TierHit {
                confidence: top.score,
                note: with_degradations(
                    format!(
                        "tier 1: matched '{}' from provider '{}' at {:.3}",
                        top.tool_name, top.provider, top.score
                    ),
                    &degradations,
                ),
                resolved: Resolved::Catalog(top),
            })
        } else {
            Err(EngineError::NoCandidateFound(with_degradations(
                format!(
                    "top candidate '{}' scored {:.3}, below execution threshold {:.2}",
                    top.tool_name, top.score, self.config.scoring.execution_threshold
                ),
                &degradations,
            )))
        }
    }

    /// Best-effort directory fan-out over the first few queries. Failures
    /// degrade to catalog-only scoring and are reported, never fatal.
    async fn directory_hits(
        &self,
        directory: &Arc<dyn CatalogDirectory>,
        queries: &[String],
    ) -> (Vec<(ProviderInfo, ToolDescriptor)>, Option<String>) {
        let priority = self
            .config
            .catalog
            .directory
            .as_ref()
            .map(|d| d.priority)
            .unwrap_or(0.9);

        let lookups = queries
            .iter()
            .take(DIRECTORY_QUERY_LIMIT)
            .map(|query| directory.search(query));
        let responses = join_all(lookups).await;

        let mut hits: Vec<(ProviderInfo, ToolDescriptor)> = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut failures = 0usize;
        let mut last_error = String::new();
        for response in responses {
            match response {
                Ok(tools) => {
                    for tool in tools {
                        if seen.insert(tool.tool_name.clone()) {
                            hits.push((ProviderInfo::new(&tool.provider, priority), tool));
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    last_error = e.to_string();
                }
            }
        }

        let degradation = if failures > 0 {
            Some(format!(
                "directory degraded, {} of {} lookups failed (last: {})",
                failures,
                queries.len().min(DIRECTORY_QUERY_LIMIT),
                last_error
            ))
        } else {
            None
        };
        (hits, degradation)
    }

    /// Tier 2: confidence-matrix lookup over ready adapters.
    async fn tier2(&self, analysis: &QuestionAnalysis) -> Result<TierHit, EngineError> {
        let candidates = self
            .registry
            .resolve_by_capability(analysis.question_type)
            .await;
        match candidates.into_iter().next() {
            Some(registration) => Ok(TierHit {
                confidence: registration.confidence,
                note: format!(
                    "tier 2: adapter '{}' at {:.2}",
                    registration.adapter_id, registration.confidence
                ),
                resolved: Resolved::Adapter(registration),
            }),
            None => Err(EngineError::CapabilityMismatch(format!(
                "no ready adapter for question type {}",
                analysis.question_type
            ))),
        }
    }

    /// Tier 3: synthesize a spec and register it so subsequent identical
    /// requests resolve at Tier 2. An unregistered spec is never returned.
    async fn tier3(&self, analysis: &QuestionAnalysis) -> Result<TierHit, EngineError> {
        let spec = self.synthesis.synthesize(analysis).await?;
        let factory = Arc::new(SynthesizedAdapterFactory::new(
            spec.clone(),
            self.provider.clone(),
        ));
        let registration = self
            .registry
            .register_adapter(
                &spec.name,
                spec.capability_tags.clone(),
                spec.intent_tags.clone(),
                factory,
            )
            .await?;

        Ok(TierHit {
            confidence: registration.confidence,
            note: format!(
                "tier 3: synthesized and registered '{}' ({})",
                spec.name, spec.spec_id
            ),
            resolved: Resolved::Synthesized(spec),
        })
    }

    fn outcome(
        &self,
        analysis: &QuestionAnalysis,
        tier_used: u8,
        phase: ResolutionPhase,
        hit: TierHit,
        trace: Vec<String>,
        started: Instant,
    ) -> ResolutionOutcome {
        log::info!(
            "[orchestrator] resolved '{}' via tier {} ({})",
            hit.resolved.identity(),
            tier_used,
            analysis.question_type
        );
        ResolutionOutcome {
            question: analysis.question.clone(),
            question_type: analysis.question_type,
            tier_used,
            phase,
            resolved: hit.resolved,
            confidence: hit.confidence,
            tier_trace: trace,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn with_degradations(base: String, degradations: &[String]) -> String {
    if degradations.is_empty() {
        base
    } else {
        format!("{} ({})", base, degradations.join("; "))
    }
}
