// Toolscout Library
// Tiered request-to-tool resolution: catalog search, adapter matching, LLM synthesis

// Request understanding
pub mod analysis;

// Tool sources and scoring
pub mod catalog;
pub mod matching;

// Adapter lifecycle and capability routing
pub mod registry;

// Tier 3 spec synthesis
pub mod synthesis;

// LLM providers
pub mod llm;

// Infrastructure
pub mod config;
pub mod errors;
pub mod observability;

// Tier cascade
pub mod orchestrator;

// Re-export the resolution entry points
pub use crate::config::EngineConfig;
pub use crate::errors::EngineError;
pub use crate::orchestrator::{ResolutionOutcome, ResolutionPhase, Resolved, TierOrchestrator};
