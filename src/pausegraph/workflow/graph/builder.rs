// SPDX-License-Identifier: MIT

//! Graph construction and build-time validation

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::adk::error::BuildError;
use crate::pausegraph::workflow::state::{StateSchema, WorkflowState};

use super::edge::{ConditionalEdge, Edge, RouteLabel, Target, END, START};
use super::node::Node;

/// Collects nodes and edges, then validates them into a [`CompiledGraph`]
///
/// Errors from `add_*` calls are deferred until [`GraphBuilder::compile`] so
/// the builder can be chained.
pub struct GraphBuilder {
    name: String,
    description: String,
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    order: Vec<String>,
    edges: Vec<(String, Edge)>,
    entry: Option<String>,
    errors: Vec<BuildError>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            schema: StateSchema::default(),
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: Vec::new(),
            entry: None,
            errors: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare field reducers and defaults
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn add_node(mut self, name: impl Into<String>, node: impl Node + 'static) -> Self {
        self.insert_node(name.into(), Arc::new(node));
        self
    }

    /// Register an already shared node
    pub fn add_shared_node(mut self, name: impl Into<String>, node: Arc<dyn Node>) -> Self {
        self.insert_node(name.into(), node);
        self
    }

    fn insert_node(&mut self, name: String, node: Arc<dyn Node>) {
        if name == START || name == END {
            self.errors.push(BuildError::ReservedName(name));
            return;
        }
        if self.nodes.contains_key(&name) {
            self.errors.push(BuildError::DuplicateNode(name));
            return;
        }
        self.order.push(name.clone());
        self.nodes.insert(name, node);
    }

    /// Fixed edge. `add_edge(START, "a")` is the same as `set_entry("a")`.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            return self.set_entry(to);
        }
        self.edges.push((from, Edge::Fixed(Target::parse(&to))));
        self
    }

    /// Conditional edge with a typed router; every label variant must be mapped
    pub fn add_conditional_edges<L, F>(
        mut self,
        from: impl Into<String>,
        router: F,
        mapping: impl IntoIterator<Item = (L, Target)>,
    ) -> Self
    where
        L: RouteLabel,
        F: Fn(&WorkflowState) -> L + Send + Sync + 'static,
    {
        let from = from.into();
        match ConditionalEdge::typed(&from, router, mapping) {
            Ok(edge) => self.edges.push((from, Edge::Conditional(edge))),
            Err(err) => self.errors.push(err),
        }
        self
    }

    /// Conditional edge with a string router; unknown labels fail at run time
    pub fn add_label_edges<F>(
        mut self,
        from: impl Into<String>,
        router: F,
        mapping: impl IntoIterator<Item = (String, Target)>,
    ) -> Self
    where
        F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
    {
        self.edges.push((
            from.into(),
            Edge::Conditional(ConditionalEdge::dynamic(router, mapping)),
        ));
        self
    }

    /// Conditional edge built elsewhere (e.g. from YAML branch conditions)
    pub fn add_routed_edge(mut self, from: impl Into<String>, edge: ConditionalEdge) -> Self {
        self.edges.push((from.into(), Edge::Conditional(edge)));
        self
    }

    pub fn set_entry(mut self, node: impl Into<String>) -> Self {
        self.entry = Some(node.into());
        self
    }

    /// Validate the graph and freeze it
    pub fn compile(self) -> Result<CompiledGraph, BuildError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let entry = self.entry.ok_or(BuildError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(BuildError::UnknownNode {
                context: format!("{} -> {}", START, entry),
                node: entry,
            });
        }

        let mut edges: HashMap<String, Edge> = HashMap::new();
        for (from, edge) in self.edges {
            if !self.nodes.contains_key(&from) {
                return Err(BuildError::UnknownNode {
                    context: format!("from '{}'", from),
                    node: from,
                });
            }
            for target in edge.targets() {
                if let Target::Node(name) = target {
                    if !self.nodes.contains_key(name) {
                        return Err(BuildError::UnknownNode {
                            context: format!("{} -> {}", from, name),
                            node: name.clone(),
                        });
                    }
                }
            }
            if edges.contains_key(&from) {
                return Err(BuildError::DuplicateEdge(from));
            }
            edges.insert(from, edge);
        }

        if let Some(dead_end) = self.order.iter().find(|name| !edges.contains_key(*name)) {
            return Err(BuildError::DeadEnd(dead_end.clone()));
        }

        log::debug!(
            "Compiled graph '{}' with {} nodes, entry '{}'",
            self.name,
            self.order.len(),
            entry
        );

        Ok(CompiledGraph {
            name: self.name,
            description: self.description,
            schema: self.schema,
            nodes: self.nodes,
            order: self.order,
            edges,
            entry,
        })
    }
}

/// Immutable, validated graph ready for the engine
pub struct CompiledGraph {
    name: String,
    description: String,
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    order: Vec<String>,
    edges: HashMap<String, Edge>,
    entry: String,
}

impl CompiledGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn node(&self, name: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.get(name)
    }

    pub fn edge(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }

    /// Node names in registration order
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("nodes", &self.order)
            .field("edges", &self.edges)
            .finish()
    }
}
