//! Error taxonomy for the resolution engine.
//!
//! Tier-internal failures (`QueryGeneration`, `NoCandidateFound`,
//! `CapabilityMismatch`, `SynthesisFailure`) are caught by the orchestrator
//! and recorded in the tier trace. Registry failures
//! (`RegistrationConflict`, `AdapterConstruction`) go straight to whoever
//! called `register_adapter`. `ResolutionFailed` is the only error a caller
//! of `resolve` ever sees.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("query generation failed: {0}")]
    QueryGeneration(String),

    #[error("no candidate tool found: {0}")]
    NoCandidateFound(String),

    #[error("no adapter covers the required capability: {0}")]
    CapabilityMismatch(String),

    #[error("synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("registration conflict for adapter '{adapter_id}': already {status}")]
    RegistrationConflict { adapter_id: String, status: String },

    #[error("adapter '{adapter_id}' failed to construct: {reason}")]
    AdapterConstruction { adapter_id: String, reason: String },

    #[error("resolution failed after all tiers: {}", .trace.join(" | "))]
    ResolutionFailed { trace: Vec<String> },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("directory request failed: {0}")]
    Directory(String),

    #[error("llm provider error: {0}")]
    Llm(String),
}
