// SPDX-License-Identifier: MIT

//! Reusable node implementations
//!
//! - [`LlmNode`] / [`StructuredLlmNode`] - prompt templates over state
//! - [`HumanNode`] - pause for a human and store the answer
//! - [`ChatModelNode`] / [`ToolNode`] - tool-calling chat loop over a message list

mod chat;
mod human;
mod llm;
pub mod template;

pub use chat::{
    last_message_text, messages_from_state, tools_condition, ChatModelNode, ToolNode, ToolsRoute,
};
pub use human::HumanNode;
pub use llm::{LlmNode, StructuredLlmNode};
