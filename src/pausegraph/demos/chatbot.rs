// SPDX-License-Identifier: MIT

//! Search-tool chatbot: `agent <-> tools` until the model answers

use std::sync::Arc;

use crate::adk::error::BuildError;
use crate::adk::model::{GenerationConfig, Model};
use crate::adk::tool::Tool;
use crate::pausegraph::workflow::graph::{CompiledGraph, GraphBuilder, Target, START};
use crate::pausegraph::workflow::nodes::{tools_condition, ChatModelNode, ToolNode, ToolsRoute};
use crate::pausegraph::workflow::state::{FieldType, ReducerType, StateFieldDef, StateSchema};

pub const NAME: &str = "chatbot";

pub const MESSAGES: &str = "messages";

pub fn build(model: Arc<dyn Model>, tools: Vec<Arc<dyn Tool>>) -> Result<CompiledGraph, BuildError> {
    let schema = StateSchema::new().with_field(
        MESSAGES,
        StateFieldDef::new(FieldType::Array).reducer(ReducerType::Append),
    );

    let agent = ChatModelNode::new(model, MESSAGES)
        .with_tools(tools.clone())
        .with_config(GenerationConfig::default().with_temperature(0.0));

    GraphBuilder::new(NAME)
        .description("Answer questions, searching the web when needed")
        .with_schema(schema)
        .add_node("agent", agent)
        .add_node("tools", ToolNode::new(tools, MESSAGES))
        .add_edge(START, "agent")
        .add_conditional_edges(
            "agent",
            tools_condition(MESSAGES),
            [
                (ToolsRoute::Tools, Target::node("tools")),
                (ToolsRoute::Done, Target::End),
            ],
        )
        .add_edge("tools", "agent")
        .compile()
}
