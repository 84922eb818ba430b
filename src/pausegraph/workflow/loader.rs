// SPDX-License-Identifier: MIT

//! Graph loader - YAML file loading and parsing

use std::fs;
use std::path::{Path, PathBuf};

use super::types::GraphDefinition;
use crate::adk::error::PauseGraphError;

/// Loads graph definitions from YAML files
pub struct GraphLoader;

impl GraphLoader {
    /// Load a graph definition from a YAML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<GraphDefinition, PauseGraphError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PauseGraphError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        log::debug!("Loading graph definition from {}", path.display());
        Self::parse_yaml(&content)
    }

    /// Parse a graph definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphDefinition, PauseGraphError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Every `*.yaml` / `*.yml` definition in `dir`, sorted by file name
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn load_dir<P: AsRef<Path>>(
        dir: P,
    ) -> Result<Vec<(PathBuf, GraphDefinition)>, PauseGraphError> {
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        let mut defs = Vec::new();
        for path in paths {
            match Self::load_file(&path) {
                Ok(def) => defs.push((path, def)),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(defs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOKE: &str = r#"
name: joke
description: "Write jokes until one lands"
entry: generator
nodes:
  - name: generator
    kind: llm
    prompt: "Write a joke about {topic}"
    output: joke
edges:
  - { from: generator, to: __end__ }
"#;

    #[test]
    fn test_parse_yaml() {
        let def = GraphLoader::parse_yaml(JOKE).unwrap();
        assert_eq!(def.name, "joke");
        assert_eq!(def.entry, "generator");
        assert_eq!(def.nodes.len(), 1);
        assert_eq!(def.edges.len(), 1);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = GraphLoader::parse_yaml("name: [unclosed").unwrap_err();
        assert!(matches!(err, PauseGraphError::Yaml(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = GraphLoader::load_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, PauseGraphError::Config(_)));
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_joke.yaml"), JOKE).unwrap();
        fs::write(dir.path().join("a_broken.yml"), "nodes: 3").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let defs = GraphLoader::load_dir(dir.path()).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].1.name, "joke");
        assert!(defs[0].0.ends_with("b_joke.yaml"));
    }
}
