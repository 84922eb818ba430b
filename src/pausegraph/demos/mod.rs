// SPDX-License-Identifier: MIT

//! Built-in demo graphs

pub mod chatbot;
pub mod code_review;
pub mod joke;

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::adk::error::PauseGraphError;
use crate::adk::model::Model;
use crate::pausegraph::tools::search::TAVILY_TOOL_NAME;
use crate::pausegraph::workflow::graph::CompiledGraph;
use crate::pausegraph::workflow::registry::ToolRegistry;

/// Name, summary and a sample input for one demo
#[derive(Debug, Clone, Serialize)]
pub struct DemoInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub example_input: Value,
}

pub fn list() -> Vec<DemoInfo> {
    vec![
        DemoInfo {
            name: code_review::NAME,
            description: "Peer review a code snippet, revising until the reviewer accepts",
            example_input: json!({"input": "fn add(a: i32, b: i32) -> i32 { a - b }"}),
        },
        DemoInfo {
            name: joke::NAME,
            description: "Generate jokes on a topic until a person finds one funny",
            example_input: json!({"topic": "rust compilers"}),
        },
        DemoInfo {
            name: chatbot::NAME,
            description: "Answer questions, searching the web when needed",
            example_input: json!({"messages": ["Who is the current president of India?"]}),
        },
    ]
}

pub fn is_demo(name: &str) -> bool {
    list().iter().any(|demo| demo.name == name)
}

/// Build a demo graph by name
///
/// The chatbot looks up the search tool in `registry`.
pub async fn build(
    name: &str,
    model: Arc<dyn Model>,
    registry: &ToolRegistry,
) -> Result<CompiledGraph, PauseGraphError> {
    let graph = match name {
        code_review::NAME => code_review::build(model)?,
        joke::NAME => joke::build(model)?,
        chatbot::NAME => {
            let tools = registry.resolve(&[TAVILY_TOOL_NAME.to_string()]).await?;
            chatbot::build(model, tools)?
        }
        other => return Err(PauseGraphError::UnknownGraph(other.to_string())),
    };
    Ok(graph)
}
