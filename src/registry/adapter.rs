//! Adapter and factory seams.
//!
//! Factories are the external collaborators of registration: arbitrarily
//! slow, allowed to fail, and never run under a registry lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::EngineError;

/// An executable tool surface held by the registry once `ready`.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    /// Answers one question. Execution is the caller's business; the
    /// resolution engine only hands the surface back.
    async fn handle(
        &self,
        question: &str,
        context: &HashMap<String, String>,
    ) -> Result<String, EngineError>;
}

/// Builds adapter instances on demand.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn construct(&self) -> Result<Arc<dyn Adapter>, EngineError>;
}
