//! Adapter registry.
//!
//! Tracks per-id registrations through `unregistered -> initializing ->
//! {ready | failed}`. The conflict guard and the state flip share one write
//! lock, so two same-id registrations can never both run their factory;
//! construction itself happens outside any lock so unrelated ids register
//! concurrently. `ready` and `failed` are terminal; a `failed` id becomes
//! registerable again only through `reset`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::analysis::QuestionType;
use crate::config::MatrixConfig;
use crate::errors::EngineError;

pub mod adapter;
pub mod matrix;

pub use adapter::{Adapter, AdapterFactory};
pub use matrix::ConfidenceMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterStatus {
    Initializing,
    Ready,
    Failed,
}

impl AdapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterStatus::Initializing => "initializing",
            AdapterStatus::Ready => "ready",
            AdapterStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AdapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serializable view of one registration. Returned by `register_adapter`,
/// `get_adapter`, `list_adapters`, and `resolve_by_capability`; live adapter
/// handles stay inside the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterRegistration {
    pub adapter_id: String,
    pub status: AdapterStatus,
    pub capability_tags: Vec<String>,
    pub intent_tags: Vec<QuestionType>,
    /// Matrix confidence under the question type this view was resolved
    /// for; the registry default elsewhere.
    pub confidence: f64,
    pub registered_at: DateTime<Utc>,
    pub error: Option<String>,
}

struct AdapterEntry {
    record: AdapterRegistration,
    instance: Option<Arc<dyn Adapter>>,
}

pub struct AdapterRegistry {
    entries: RwLock<HashMap<String, AdapterEntry>>,
    matrix: RwLock<ConfidenceMatrix>,
    default_confidence: f64,
}

impl AdapterRegistry {
    pub fn new(config: &MatrixConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            matrix: RwLock::new(ConfidenceMatrix::from_config(config)),
            default_confidence: config.default_confidence,
        }
    }

    /// Registers and constructs an adapter. Any existing entry for the id,
    /// `initializing` included, is a conflict; callers distinguish "busy"
    /// from "broken" through the status carried by the error.
    pub async fn register_adapter(
        &self,
        adapter_id: &str,
        capability_tags: Vec<String>,
        intent_tags: Vec<QuestionType>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Result<AdapterRegistration, EngineError> {
        {
            let mut entries = self.entries.write().await;
            if let Some(existing) = entries.get(adapter_id) {
                return Err(EngineError::RegistrationConflict {
                    adapter_id: adapter_id.to_string(),
                    status: existing.record.status.to_string(),
                });
            }
            entries.insert(
                adapter_id.to_string(),
                AdapterEntry {
                    record: AdapterRegistration {
                        adapter_id: adapter_id.to_string(),
                        status: AdapterStatus::Initializing,
                        capability_tags,
                        intent_tags: intent_tags.clone(),
                        confidence: self.default_confidence,
                        registered_at: Utc::now(),
                        error: None,
                    },
                    instance: None,
                },
            );
        }

        log::debug!("[registry] constructing adapter '{}'", adapter_id);
        match factory.construct().await {
            Ok(instance) => {
                let record = {
                    let mut entries = self.entries.write().await;
                    let entry = entries
                        .get_mut(adapter_id)
                        .expect("initializing entry cannot disappear");
                    entry.record.status = AdapterStatus::Ready;
                    entry.instance = Some(instance);
                    entry.record.clone()
                };
                {
                    let mut matrix = self.matrix.write().await;
                    matrix.merge(adapter_id, &intent_tags, self.default_confidence);
                }
                log::debug!("[registry] adapter '{}' ready", adapter_id);
                Ok(record)
            }
            Err(e) => {
                let reason = e.to_string();
                {
                    let mut entries = self.entries.write().await;
                    let entry = entries
                        .get_mut(adapter_id)
                        .expect("initializing entry cannot disappear");
                    entry.record.status = AdapterStatus::Failed;
                    entry.record.error = Some(reason.clone());
                }
                log::debug!("[registry] adapter '{}' failed: {}", adapter_id, reason);
                Err(EngineError::AdapterConstruction {
                    adapter_id: adapter_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Returns a `failed` id to `unregistered`. Any other state is refused.
    pub async fn reset(&self, adapter_id: &str) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        match entries.get(adapter_id) {
            Some(entry) if entry.record.status == AdapterStatus::Failed => {
                entries.remove(adapter_id);
                log::debug!("[registry] reset '{}' to unregistered", adapter_id);
                Ok(())
            }
            Some(entry) => Err(EngineError::RegistrationConflict {
                adapter_id: adapter_id.to_string(),
                status: entry.record.status.to_string(),
            }),
            None => Err(EngineError::RegistrationConflict {
                adapter_id: adapter_id.to_string(),
                status: "unregistered".to_string(),
            }),
        }
    }

    /// Matrix row for the question type, filtered to `ready` adapters,
    /// sorted by matrix confidence descending.
    pub async fn resolve_by_capability(
        &self,
        question_type: QuestionType,
    ) -> Vec<AdapterRegistration> {
        let row = {
            let matrix = self.matrix.read().await;
            matrix.row(question_type)
        };
        let entries = self.entries.read().await;
        row.into_iter()
            .filter_map(|(adapter_id, confidence)| {
                entries.get(&adapter_id).and_then(|entry| {
                    if entry.record.status == AdapterStatus::Ready {
                        let mut record = entry.record.clone();
                        record.confidence = confidence;
                        Some(record)
                    } else {
                        None
                    }
                })
            })
            .collect()
    }

    pub async fn get_adapter(&self, adapter_id: &str) -> Option<AdapterRegistration> {
        let entries = self.entries.read().await;
        entries.get(adapter_id).map(|entry| entry.record.clone())
    }

    /// Every registration, sorted by id.
    pub async fn list_adapters(&self) -> Vec<AdapterRegistration> {
        let entries = self.entries.read().await;
        let mut records: Vec<AdapterRegistration> =
            entries.values().map(|entry| entry.record.clone()).collect();
        records.sort_by(|a, b| a.adapter_id.cmp(&b.adapter_id));
        records
    }

    /// Live handle for a `ready` adapter.
    pub async fn instance(&self, adapter_id: &str) -> Option<Arc<dyn Adapter>> {
        let entries = self.entries.read().await;
        entries.get(adapter_id).and_then(|entry| {
            if entry.record.status == AdapterStatus::Ready {
                entry.instance.clone()
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoAdapter {
        name: String,
    }

    #[async_trait]
    impl Adapter for EchoAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn handle(
            &self,
            question: &str,
            _context: &HashMap<String, String>,
        ) -> Result<String, EngineError> {
            Ok(format!("echo: {}", question))
        }
    }

    struct EchoFactory {
        name: &'static str,
    }

    #[async_trait]
    impl AdapterFactory for EchoFactory {
        async fn construct(&self) -> Result<Arc<dyn Adapter>, EngineError> {
            Ok(Arc::new(EchoAdapter {
                name: self.name.to_string(),
            }))
        }
    }

    struct BrokenFactory;

    #[async_trait]
    impl AdapterFactory for BrokenFactory {
        async fn construct(&self) -> Result<Arc<dyn Adapter>, EngineError> {
            Err(EngineError::Llm("upstream unavailable".to_string()))
        }
    }

    fn registry() -> AdapterRegistry {
        AdapterRegistry::new(&MatrixConfig::default())
    }

    #[tokio::test]
    async fn successful_registration_is_ready_and_resolvable() {
        let registry = registry();
        let record = registry
            .register_adapter(
                "calc",
                vec!["math".to_string()],
                vec![QuestionType::Calculation],
                Arc::new(EchoFactory { name: "calc" }),
            )
            .await
            .unwrap();
        assert_eq!(record.status, AdapterStatus::Ready);

        let resolved = registry.resolve_by_capability(QuestionType::Calculation).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].adapter_id, "calc");
        assert!(registry.instance("calc").await.is_some());
    }

    #[tokio::test]
    async fn construction_failure_is_terminal_and_reported() {
        let registry = registry();
        let err = registry
            .register_adapter(
                "broken",
                vec![],
                vec![QuestionType::SimpleQa],
                Arc::new(BrokenFactory),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AdapterConstruction { .. }));

        let record = registry.get_adapter("broken").await.unwrap();
        assert_eq!(record.status, AdapterStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("upstream unavailable"));

        // Failed adapters never resolve and have no live handle.
        assert!(registry.resolve_by_capability(QuestionType::SimpleQa).await.is_empty());
        assert!(registry.instance("broken").await.is_none());
    }

    #[tokio::test]
    async fn terminal_states_reject_re_registration() {
        let registry = registry();
        registry
            .register_adapter("calc", vec![], vec![], Arc::new(EchoFactory { name: "calc" }))
            .await
            .unwrap();

        let err = registry
            .register_adapter("calc", vec![], vec![], Arc::new(EchoFactory { name: "calc" }))
            .await
            .unwrap_err();
        match err {
            EngineError::RegistrationConflict { status, .. } => assert_eq!(status, "ready"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reset_requires_failed_state() {
        let registry = registry();

        let err = registry.reset("ghost").await.unwrap_err();
        match err {
            EngineError::RegistrationConflict { status, .. } => assert_eq!(status, "unregistered"),
            other => panic!("expected conflict, got {:?}", other),
        }

        registry
            .register_adapter("flaky", vec![], vec![QuestionType::SimpleQa], Arc::new(BrokenFactory))
            .await
            .unwrap_err();
        assert!(registry.reset("flaky").await.is_ok());
        assert!(registry.get_adapter("flaky").await.is_none());

        // After reset the id registers cleanly.
        let record = registry
            .register_adapter(
                "flaky",
                vec![],
                vec![QuestionType::SimpleQa],
                Arc::new(EchoFactory { name: "flaky" }),
            )
            .await
            .unwrap();
        assert_eq!(record.status, AdapterStatus::Ready);
    }

    #[tokio::test]
    async fn list_is_sorted_by_id() {
        let registry = registry();
        for id in ["zeta", "alpha", "mid"] {
            registry
                .register_adapter(id, vec![], vec![], Arc::new(EchoFactory { name: "x" }))
                .await
                .unwrap();
        }
        let ids: Vec<String> = registry
            .list_adapters()
            .await
            .into_iter()
            .map(|r| r.adapter_id)
            .collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn registration_extends_matrix_without_overwriting_seeds() {
        let config = MatrixConfig {
            default_confidence: 0.55,
            seeds: vec![crate::config::MatrixSeed {
                question_type: "calculation".to_string(),
                adapter_id: "calc".to_string(),
                confidence: 0.9,
            }],
        };
        let registry = AdapterRegistry::new(&config);
        registry
            .register_adapter(
                "calc",
                vec!["math".to_string()],
                vec![QuestionType::Calculation],
                Arc::new(EchoFactory { name: "calc" }),
            )
            .await
            .unwrap();

        let resolved = registry.resolve_by_capability(QuestionType::Calculation).await;
        // Seed confidence survives the merge.
        assert_eq!(resolved[0].confidence, 0.9);
    }
}
