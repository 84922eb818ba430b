// SPDX-License-Identifier: MIT

//! Graph factory - compiles YAML definitions into runnable graphs
//!
//! Node kinds are bound to the shared model and to tools looked up by name in
//! the [`ToolRegistry`]. Branch conditions are parsed here, so a bad condition
//! fails the build instead of the first run that reaches it.

use serde_json::Value;
use std::sync::Arc;

use crate::adk::error::{BuildError, PauseGraphError};
use crate::adk::model::{Model, ResponseSchema};
use crate::pausegraph::workflow::condition::{self, Expression};
use crate::pausegraph::workflow::graph::{
    CompiledGraph, ConditionalEdge, GraphBuilder, Node, StaticNode, Target,
};
use crate::pausegraph::workflow::nodes::{
    template::value_to_text, tools_condition, ChatModelNode, HumanNode, LlmNode,
    StructuredLlmNode, ToolNode, ToolsRoute,
};
use crate::pausegraph::workflow::registry::ToolRegistry;
use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};
use crate::pausegraph::workflow::types::{
    BranchDefinition, EdgeDefinition, GraphDefinition, NodeDefinition, NodeKind, RouteDefinition,
};

/// Builds [`CompiledGraph`]s from [`GraphDefinition`]s
pub struct GraphFactory {
    model: Option<Arc<dyn Model>>,
    registry: ToolRegistry,
}

impl GraphFactory {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            model: None,
            registry,
        }
    }

    /// Model shared by every `llm`, `structured` and `chat` node
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Build and validate the graph
    pub async fn build(&self, def: &GraphDefinition) -> Result<CompiledGraph, PauseGraphError> {
        log::info!(
            "Building graph '{}' ({} nodes, {} edges)",
            def.name,
            def.nodes.len(),
            def.edges.len()
        );

        let mut builder = GraphBuilder::new(def.name.clone())
            .description(def.description.clone())
            .with_schema(def.state.clone())
            .set_entry(def.entry.clone());

        for node_def in &def.nodes {
            let node = self.build_node(node_def).await?;
            builder = builder.add_shared_node(node_def.name.clone(), node);
        }

        for edge in &def.edges {
            builder = add_edge(builder, edge)?;
        }

        Ok(builder.compile()?)
    }

    fn model_for(&self, node: &str) -> Result<Arc<dyn Model>, PauseGraphError> {
        self.model.clone().ok_or_else(|| {
            PauseGraphError::config(format!("node '{}' needs a model but none is configured", node))
        })
    }

    async fn build_node(&self, def: &NodeDefinition) -> Result<Arc<dyn Node>, PauseGraphError> {
        log::debug!("Building node '{}'", def.name);
        let node: Arc<dyn Node> = match &def.kind {
            NodeKind::Llm {
                prompt,
                system,
                output,
            } => {
                let mut node = LlmNode::new(self.model_for(&def.name)?, prompt.clone(), output.clone());
                if let Some(system) = system {
                    node = node.with_system(system.clone());
                }
                Arc::new(node)
            }
            NodeKind::Structured {
                prompt,
                system,
                schema,
                outputs,
            } => {
                if !schema.is_object() {
                    return Err(BuildError::InvalidNode {
                        node: def.name.clone(),
                        message: "schema must be a JSON object".to_string(),
                    }
                    .into());
                }
                let response_schema = ResponseSchema::new(def.name.clone(), schema.clone());
                let mut node =
                    StructuredLlmNode::new(self.model_for(&def.name)?, prompt.clone(), response_schema);
                if let Some(system) = system {
                    node = node.with_system(system.clone());
                }
                for (key, path) in outputs {
                    node = node.output(key.clone(), path.clone());
                }
                Arc::new(node)
            }
            NodeKind::Human {
                prompt,
                text_into,
                approval_into,
            } => {
                if text_into.is_none() && approval_into.is_none() {
                    return Err(BuildError::InvalidNode {
                        node: def.name.clone(),
                        message: "human node needs text_into or approval_into".to_string(),
                    }
                    .into());
                }
                let mut node = HumanNode::new(prompt.clone());
                if let Some(key) = text_into {
                    node = node.text_into(key.clone());
                }
                if let Some(key) = approval_into {
                    node = node.approval_into(key.clone());
                }
                Arc::new(node)
            }
            NodeKind::Set { values } => {
                let update = StateUpdate::from_value(Value::Object(values.clone())).unwrap_or_default();
                Arc::new(StaticNode::new(update))
            }
            NodeKind::Chat {
                messages,
                system,
                tools,
            } => {
                let tools = self.registry.resolve(tools).await?;
                let mut node =
                    ChatModelNode::new(self.model_for(&def.name)?, messages.clone()).with_tools(tools);
                if let Some(system) = system {
                    node = node.with_system(system.clone());
                }
                Arc::new(node)
            }
            NodeKind::Tools { messages, tools } => {
                let tools = self.registry.resolve(tools).await?;
                Arc::new(ToolNode::new(tools, messages.clone()))
            }
        };
        Ok(node)
    }
}

fn add_edge(builder: GraphBuilder, edge: &EdgeDefinition) -> Result<GraphBuilder, BuildError> {
    Ok(match edge {
        EdgeDefinition::Fixed { from, to } => builder.add_edge(from.clone(), to.clone()),
        EdgeDefinition::Route { from, route } => {
            builder.add_label_edges(from.clone(), field_router(route), route_mapping(route))
        }
        EdgeDefinition::Branches {
            from,
            branches,
            otherwise,
        } => builder.add_routed_edge(from.clone(), branch_edge(branches, otherwise.as_deref())?),
        EdgeDefinition::ToolsCondition {
            from,
            tools_condition: def,
        } => builder.add_conditional_edges(
            from.clone(),
            tools_condition(def.messages.clone()),
            [
                (ToolsRoute::Tools, Target::parse(&def.tools)),
                (ToolsRoute::Done, Target::parse(&def.done)),
            ],
        ),
    })
}

/// Label is the field's value as text; a missing field gives the empty label
fn field_router(route: &RouteDefinition) -> impl Fn(&WorkflowState) -> String + Send + Sync + 'static {
    let field = route.field.clone();
    move |state| state.get_path(&field).map(value_to_text).unwrap_or_default()
}

fn route_mapping(route: &RouteDefinition) -> Vec<(String, Target)> {
    route
        .cases
        .iter()
        .map(|(label, to)| (label.clone(), Target::parse(to)))
        .collect()
}

/// First branch whose condition holds wins, then `otherwise`
fn branch_edge(
    branches: &[BranchDefinition],
    otherwise: Option<&str>,
) -> Result<ConditionalEdge, BuildError> {
    let compiled: Vec<(Expression, Target)> = branches
        .iter()
        .map(|branch| {
            condition::parse(&branch.when)
                .map(|expr| (expr, Target::parse(&branch.to)))
                .map_err(|e| BuildError::InvalidCondition {
                    condition: branch.when.clone(),
                    message: e.to_string(),
                })
        })
        .collect::<Result<_, _>>()?;
    let fallback = otherwise.map(Target::parse);

    let mut routes: Vec<(String, Target)> = branches
        .iter()
        .zip(&compiled)
        .map(|(branch, (_, target))| (branch.when.clone(), target.clone()))
        .collect();
    if let Some(target) = &fallback {
        routes.push(("otherwise".to_string(), target.clone()));
    }

    Ok(ConditionalEdge::from_fn(routes, move |state| {
        compiled
            .iter()
            .find(|(expr, _)| condition::evaluate(expr, state))
            .map(|(_, target)| target.clone())
            .or_else(|| fallback.clone())
            .ok_or_else(|| "no branch matched".to_string())
    }))
}
