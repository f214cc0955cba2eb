//! Engine configuration.
//!
//! Loaded from a TOML file, from `TOOLSCOUT_*` environment variables, or
//! built in code. Every section has usable defaults so a bare
//! `EngineConfig::default()` resolves against an empty catalog without
//! panicking.

use serde::{Deserialize, Serialize};

use crate::catalog::ToolDescriptor;
use crate::errors::EngineError;
use crate::llm::{LlmConfig, LlmProviderType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub tiers: TierConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Thresholds applied around the fixed factor weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum final confidence for a Tier 1 candidate to be executed.
    #[serde(default = "default_execution_threshold")]
    pub execution_threshold: f64,
    /// Minimum raw keyword overlap for a (query, tool) pair to stay in the pool.
    #[serde(default = "default_candidacy_floor")]
    pub candidacy_floor: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
}

fn default_execution_threshold() -> f64 {
    0.6
}
fn default_candidacy_floor() -> f64 {
    0.3
}
fn default_max_candidates() -> usize {
    10
}
fn default_max_queries() -> usize {
    16
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            execution_threshold: default_execution_threshold(),
            candidacy_floor: default_candidacy_floor(),
            max_candidates: default_max_candidates(),
            max_queries: default_max_queries(),
        }
    }
}

/// Per-tier budgets carved out of one overall deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
    #[serde(default = "default_tier1_timeout_ms")]
    pub tier1_timeout_ms: u64,
    #[serde(default = "default_tier2_timeout_ms")]
    pub tier2_timeout_ms: u64,
    #[serde(default = "default_tier3_timeout_ms")]
    pub tier3_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub enable_catalog_search: bool,
    #[serde(default = "default_true")]
    pub enable_adapter_matching: bool,
    #[serde(default = "default_true")]
    pub enable_synthesis: bool,
}

fn default_overall_timeout_ms() -> u64 {
    30_000
}
fn default_tier1_timeout_ms() -> u64 {
    10_000
}
fn default_tier2_timeout_ms() -> u64 {
    2_000
}
fn default_tier3_timeout_ms() -> u64 {
    20_000
}
fn default_true() -> bool {
    true
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            overall_timeout_ms: default_overall_timeout_ms(),
            tier1_timeout_ms: default_tier1_timeout_ms(),
            tier2_timeout_ms: default_tier2_timeout_ms(),
            tier3_timeout_ms: default_tier3_timeout_ms(),
            enable_catalog_search: true,
            enable_adapter_matching: true,
            enable_synthesis: true,
        }
    }
}

/// Static catalog seed plus the optional remote directory endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub directory: Option<DirectoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Priority multiplier applied to every score from this provider.
    #[serde(default = "default_provider_priority")]
    pub priority: f64,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

fn default_provider_priority() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_directory_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_directory_max_results")]
    pub max_results: usize,
    /// Priority multiplier applied to tools the directory contributes.
    #[serde(default = "default_directory_priority")]
    pub priority: f64,
}

fn default_directory_timeout() -> u64 {
    30
}
fn default_directory_max_results() -> usize {
    25
}
fn default_directory_priority() -> f64 {
    0.9
}

/// Seed entries for the question-type -> adapter confidence matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Confidence assigned to intent tags merged at registration time.
    #[serde(default = "default_matrix_confidence")]
    pub default_confidence: f64,
    #[serde(default)]
    pub seeds: Vec<MatrixSeed>,
}

fn default_matrix_confidence() -> f64 {
    0.55
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            default_confidence: default_matrix_confidence(),
            seeds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixSeed {
    pub question_type: String,
    pub adapter_id: String,
    pub confidence: f64,
}

impl EngineConfig {
    pub fn from_file(path: &str) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("failed to parse {}: {}", path, e)))
    }

    /// Defaults overridden by `TOOLSCOUT_*` environment variables.
    /// Unparseable values are ignored rather than fatal.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("TOOLSCOUT_EXECUTION_THRESHOLD") {
            if let Ok(n) = v.parse::<f64>() {
                config.scoring.execution_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_OVERALL_TIMEOUT_MS") {
            if let Ok(n) = v.parse::<u64>() {
                config.tiers.overall_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_DIRECTORY_URL") {
            config.catalog.directory = Some(DirectoryConfig {
                base_url: v,
                auth_token: std::env::var("TOOLSCOUT_DIRECTORY_TOKEN").ok(),
                timeout_seconds: default_directory_timeout(),
                max_results: default_directory_max_results(),
                priority: default_directory_priority(),
            });
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_LLM_PROVIDER") {
            config.llm.provider_type = match v.to_lowercase().as_str() {
                "openai" => LlmProviderType::OpenAI,
                "local" => LlmProviderType::Local,
                _ => LlmProviderType::Stub,
            };
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_LLM_MODEL") {
            config.llm.model = v;
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_LLM_API_KEY") {
            config.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_LLM_BASE_URL") {
            config.llm.base_url = Some(v);
        }

        config
    }

    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(0.0..=1.0).contains(&self.scoring.execution_threshold) {
            errors.push(format!(
                "scoring.execution_threshold must be within [0, 1], got {}",
                self.scoring.execution_threshold
            ));
        }
        if !(0.0..1.0).contains(&self.scoring.candidacy_floor) {
            errors.push(format!(
                "scoring.candidacy_floor must be within [0, 1), got {}",
                self.scoring.candidacy_floor
            ));
        }
        if self.scoring.max_candidates == 0 {
            errors.push("scoring.max_candidates must be positive".to_string());
        }
        if self.scoring.max_queries == 0 {
            errors.push("scoring.max_queries must be positive".to_string());
        }
        if self.tiers.overall_timeout_ms == 0 {
            errors.push("tiers.overall_timeout_ms must be positive".to_string());
        }
        for provider in &self.catalog.providers {
            if provider.name.trim().is_empty() {
                errors.push("catalog provider with empty name".to_string());
            }
            if provider.priority <= 0.0 {
                errors.push(format!(
                    "catalog provider '{}' priority must be positive, got {}",
                    provider.name, provider.priority
                ));
            }
            for tool in &provider.tools {
                if tool.tool_name.trim().is_empty() {
                    errors.push(format!("provider '{}' carries a tool with empty name", provider.name));
                }
                if !(0.0..=1.0).contains(&tool.confidence_base) {
                    errors.push(format!(
                        "tool '{}' confidence_base must be within [0, 1], got {}",
                        tool.tool_name, tool.confidence_base
                    ));
                }
            }
        }
        if let Some(directory) = &self.catalog.directory {
            if directory.base_url.trim().is_empty() {
                errors.push("catalog.directory.base_url must not be empty".to_string());
            }
            if directory.priority <= 0.0 {
                errors.push(format!(
                    "catalog.directory.priority must be positive, got {}",
                    directory.priority
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.matrix.default_confidence) {
            errors.push(format!(
                "matrix.default_confidence must be within [0, 1], got {}",
                self.matrix.default_confidence
            ));
        }
        for seed in &self.matrix.seeds {
            if !(0.0..=1.0).contains(&seed.confidence) {
                errors.push(format!(
                    "matrix seed for '{}' confidence must be within [0, 1], got {}",
                    seed.adapter_id, seed.confidence
                ));
            }
        }
        if self.llm.provider_type != LlmProviderType::Stub && self.llm.model.trim().is_empty() {
            errors.push("llm.model must be set for non-stub providers".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
