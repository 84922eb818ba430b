// SPDX-License-Identifier: MIT

//! Resolves graph names to compiled graphs: built-in demos first, then YAML
//! definitions on disk

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adk::error::PauseGraphError;
use crate::adk::model::Model;
use crate::pausegraph::demos;
use crate::pausegraph::tools::TavilySearchTool;
use crate::pausegraph::workflow::factory::GraphFactory;
use crate::pausegraph::workflow::graph::CompiledGraph;
use crate::pausegraph::workflow::loader::GraphLoader;
use crate::pausegraph::workflow::registry::ToolRegistry;
use crate::pausegraph::workflow::types::GraphDefinition;

/// Results per search, as in the chatbot demo
pub const SEARCH_MAX_RESULTS: u32 = 2;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphSource {
    Demo,
    Yaml,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub name: String,
    pub description: String,
    pub source: GraphSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Tools every graph may use. The search tool needs `TAVILY_API_KEY`.
pub async fn default_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    match TavilySearchTool::from_env(SEARCH_MAX_RESULTS) {
        Ok(tool) => {
            log::info!("Registered tool: {}", crate::pausegraph::tools::search::TAVILY_TOOL_NAME);
            registry.register(Arc::new(tool)).await;
        }
        Err(e) => log::warn!("Search tool unavailable: {}", e),
    }
    registry
}

pub struct GraphCatalog {
    model: Option<Arc<dyn Model>>,
    registry: ToolRegistry,
    graphs_dir: PathBuf,
}

impl GraphCatalog {
    pub fn new(registry: ToolRegistry, graphs_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: None,
            registry,
            graphs_dir: graphs_dir.into(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn graphs_dir(&self) -> &Path {
        &self.graphs_dir
    }

    /// Demos plus every readable definition in the graphs directory
    pub fn list(&self) -> Vec<GraphSummary> {
        let mut graphs: Vec<GraphSummary> = demos::list()
            .into_iter()
            .map(|demo| GraphSummary {
                name: demo.name.to_string(),
                description: demo.description.to_string(),
                source: GraphSource::Demo,
                file: None,
            })
            .collect();

        for (path, def) in self.definitions() {
            graphs.push(GraphSummary {
                name: def.name,
                description: def.description,
                source: GraphSource::Yaml,
                file: Some(path),
            });
        }
        graphs
    }

    /// Build a graph from a demo name, a YAML path, a file stem in the graphs
    /// directory, or a definition's `name`
    pub async fn build(&self, name: &str) -> Result<CompiledGraph, PauseGraphError> {
        if demos::is_demo(name) {
            let model = self.require_model(name)?;
            return demos::build(name, model, &self.registry).await;
        }

        let def = self.find_definition(name)?;
        let mut factory = GraphFactory::new(self.registry.clone());
        if let Some(model) = &self.model {
            factory = factory.with_model(model.clone());
        }
        factory.build(&def).await
    }

    fn require_model(&self, graph: &str) -> Result<Arc<dyn Model>, PauseGraphError> {
        self.model.clone().ok_or_else(|| {
            PauseGraphError::config(format!(
                "graph '{}' needs a model; set MODEL_PROVIDER and its API key",
                graph
            ))
        })
    }

    fn find_definition(&self, name: &str) -> Result<GraphDefinition, PauseGraphError> {
        let as_path = Path::new(name);
        if is_yaml(as_path) && as_path.is_file() {
            return GraphLoader::load_file(as_path);
        }

        for ext in ["yaml", "yml"] {
            let candidate = self.graphs_dir.join(format!("{}.{}", name, ext));
            if candidate.is_file() {
                return GraphLoader::load_file(candidate);
            }
        }

        self.definitions()
            .into_iter()
            .map(|(_, def)| def)
            .find(|def| def.name == name)
            .ok_or_else(|| PauseGraphError::UnknownGraph(name.to_string()))
    }

    fn definitions(&self) -> Vec<(PathBuf, GraphDefinition)> {
        GraphLoader::load_dir(&self.graphs_dir).unwrap_or_else(|e| {
            log::debug!("No graph definitions in {}: {}", self.graphs_dir.display(), e);
            Vec::new()
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
name: counter
description: "Counts once"
entry: bump
nodes:
  - { name: bump, kind: set, values: { count: 1 } }
edges:
  - { from: bump, to: __end__ }
"#;

    #[tokio::test]
    async fn test_lists_demos_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("counting.yaml"), COUNTER).unwrap();
        let catalog = GraphCatalog::new(ToolRegistry::new(), dir.path());

        let names: Vec<String> = catalog.list().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["code_review", "joke", "chatbot", "counter"]);
    }

    #[tokio::test]
    async fn test_build_by_stem_name_or_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counting.yaml");
        std::fs::write(&path, COUNTER).unwrap();
        let catalog = GraphCatalog::new(ToolRegistry::new(), dir.path());

        assert_eq!(catalog.build("counting").await.unwrap().name(), "counter");
        assert_eq!(catalog.build("counter").await.unwrap().name(), "counter");
        let by_path = catalog.build(path.to_str().unwrap()).await.unwrap();
        assert_eq!(by_path.name(), "counter");
    }

    #[tokio::test]
    async fn test_demo_without_model_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = GraphCatalog::new(ToolRegistry::new(), dir.path());
        let err = catalog.build("joke").await.unwrap_err();
        assert!(matches!(err, PauseGraphError::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_graph() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = GraphCatalog::new(ToolRegistry::new(), dir.path());
        let err = catalog.build("nope").await.unwrap_err();
        assert!(matches!(err, PauseGraphError::UnknownGraph(ref name) if name == "nope"));
    }
}
