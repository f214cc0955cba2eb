//! Tool catalog: provider-grouped descriptors with atomic reload.
//!
//! Descriptors are read-only once published. Updates arrive as a whole new
//! provider map swapped in under one write lock, so readers either see the
//! old catalog or the new one, never a mix.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;

pub mod directory;

pub use directory::{CatalogDirectory, DirectoryToolRecord, HttpCatalogDirectory};

/// Static description of one invocable tool as advertised by its provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub tool_name: String,
    pub provider: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Provider-declared reliability in [0, 1], multiplied into every score.
    #[serde(default = "default_confidence_base")]
    pub confidence_base: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_confidence_base() -> f64 {
    0.8
}

impl ToolDescriptor {
    pub fn new(tool_name: &str, provider: &str, description: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            provider: provider.to_string(),
            description: description.to_string(),
            categories: Vec::new(),
            capabilities: Vec::new(),
            confidence_base: default_confidence_base(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.push(category.to_string());
        self
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.push(capability.to_string());
        self
    }

    pub fn with_confidence_base(mut self, confidence_base: f64) -> Self {
        self.confidence_base = confidence_base;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    /// Priority multiplier in (0, 1]; also the ranking tie-break.
    pub priority: f64,
}

impl ProviderInfo {
    pub fn new(name: &str, priority: f64) -> Self {
        Self {
            name: name.to_string(),
            priority,
        }
    }
}

struct ProviderShelf {
    info: ProviderInfo,
    tools: HashMap<String, ToolDescriptor>,
}

/// Read-mostly catalog keyed by provider name.
pub struct ToolCatalog {
    providers: RwLock<HashMap<String, ProviderShelf>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        let catalog = Self::new();
        let providers = config
            .providers
            .iter()
            .map(|p| {
                (
                    ProviderInfo::new(&p.name, p.priority),
                    p.tools.clone(),
                )
            })
            .collect();
        catalog.replace_all(providers);
        catalog
    }

    /// Swaps the entire provider map in one write. Tools keep the provider
    /// name they were filed under regardless of what their descriptor says.
    pub fn replace_all(&self, providers: Vec<(ProviderInfo, Vec<ToolDescriptor>)>) {
        let mut next: HashMap<String, ProviderShelf> = HashMap::new();
        for (info, tools) in providers {
            let shelf = next.entry(info.name.clone()).or_insert_with(|| ProviderShelf {
                info: info.clone(),
                tools: HashMap::new(),
            });
            for mut tool in tools {
                tool.provider = info.name.clone();
                shelf.tools.insert(tool.tool_name.clone(), tool);
            }
        }

        let mut guard = self.providers.write().expect("catalog providers poisoned");
        *guard = next;
        log::debug!("[catalog] reloaded: {} providers", guard.len());
    }

    /// Point-in-time copy of every descriptor with its provider info.
    /// Scoring works on the snapshot so a concurrent reload cannot tear it.
    pub fn snapshot(&self) -> Vec<(ProviderInfo, ToolDescriptor)> {
        let guard = self.providers.read().expect("catalog providers poisoned");
        let mut tools: Vec<(ProviderInfo, ToolDescriptor)> = guard
            .values()
            .flat_map(|shelf| {
                shelf
                    .tools
                    .values()
                    .map(|tool| (shelf.info.clone(), tool.clone()))
            })
            .collect();
        tools.sort_by(|a, b| {
            (a.1.provider.as_str(), a.1.tool_name.as_str())
                .cmp(&(b.1.provider.as_str(), b.1.tool_name.as_str()))
        });
        tools
    }

    pub fn provider_priority(&self, name: &str) -> f64 {
        let guard = self.providers.read().expect("catalog providers poisoned");
        guard.get(name).map(|shelf| shelf.info.priority).unwrap_or(1.0)
    }

    pub fn tool_count(&self) -> usize {
        let guard = self.providers.read().expect("catalog providers poisoned");
        guard.values().map(|shelf| shelf.tools.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_count() == 0
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("web_search", "builtin", "search the web for current information")
                .with_category("search")
                .with_capability("web search")
                .with_capability("current lookup")
                .with_confidence_base(0.9),
            ToolDescriptor::new("unit_convert", "builtin", "convert between measurement units")
                .with_category("math")
                .with_capability("calculation"),
        ]
    }

    #[test]
    fn snapshot_is_sorted_and_complete() {
        let catalog = ToolCatalog::new();
        catalog.replace_all(vec![(ProviderInfo::new("builtin", 1.0), sample_tools())]);

        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].1.tool_name, "unit_convert");
        assert_eq!(snapshot[1].1.tool_name, "web_search");
        assert_eq!(snapshot[0].0.priority, 1.0);
    }

    #[test]
    fn reload_replaces_everything() {
        let catalog = ToolCatalog::new();
        catalog.replace_all(vec![(ProviderInfo::new("builtin", 1.0), sample_tools())]);
        assert_eq!(catalog.tool_count(), 2);

        catalog.replace_all(vec![(
            ProviderInfo::new("community", 0.8),
            vec![ToolDescriptor::new("paper_find", "community", "find academic papers")],
        )]);

        assert_eq!(catalog.tool_count(), 1);
        assert_eq!(catalog.provider_priority("community"), 0.8);
        // Unknown providers fall back to neutral priority.
        assert_eq!(catalog.provider_priority("builtin"), 1.0);
    }

    #[test]
    fn descriptors_are_filed_under_their_shelf_provider() {
        let catalog = ToolCatalog::new();
        let stray = ToolDescriptor::new("probe", "somewhere_else", "probe things");
        catalog.replace_all(vec![(ProviderInfo::new("builtin", 1.0), vec![stray])]);

        let snapshot = catalog.snapshot();
        assert_eq!(snapshot[0].1.provider, "builtin");
    }
}
