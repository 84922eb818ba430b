// SPDX-License-Identifier: MIT

//! Message-list chat nodes: a model step that may request tools, and a tool
//! step that answers those requests

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::adk::error::NodeError;
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::adk::tool::{execute_calls, Tool};
use crate::pausegraph::workflow::graph::{Node, NodeContext, NodeOutcome, RouteLabel};
use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};

/// Decode the message list stored under `key`
///
/// Plain strings are treated as user messages so a run can start from
/// `{"messages": ["question"]}`.
pub fn messages_from_state(state: &WorkflowState, key: &str) -> Result<Vec<Content>, NodeError> {
    let Some(value) = state.get(key) else {
        return Ok(Vec::new());
    };
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => return Err(format!("state field '{}' is not a list: {}", key, other).into()),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(Content::user(text.clone())),
            other => serde_json::from_value(other.clone()).map_err(NodeError::from),
        })
        .collect()
}

fn to_values(messages: &[Content]) -> Result<Vec<Value>, NodeError> {
    messages
        .iter()
        .map(|m| serde_json::to_value(m).map_err(NodeError::from))
        .collect()
}

/// Calls the model on the conversation and appends its reply
///
/// Declare the messages field with the `append` reducer so replies accumulate.
pub struct ChatModelNode {
    model: Arc<dyn Model>,
    tools: Vec<Arc<dyn Tool>>,
    messages_key: String,
    system: Option<String>,
    config: GenerationConfig,
}

impl ChatModelNode {
    pub fn new(model: Arc<dyn Model>, messages_key: impl Into<String>) -> Self {
        Self {
            model,
            tools: Vec::new(),
            messages_key: messages_key.into(),
            system: None,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl Node for ChatModelNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let mut history = Vec::new();
        if let Some(system) = &self.system {
            history.push(Content::system(system.clone()));
        }
        history.extend(messages_from_state(state, &self.messages_key)?);

        let tools = (!self.tools.is_empty()).then_some(self.tools.as_slice());
        let reply = self
            .model
            .generate_content(&history, Some(&self.config), tools)
            .await?;
        log::debug!(
            "Chat node '{}' reply requests {} tool calls",
            ctx.node,
            reply.function_calls().count()
        );

        Ok(NodeOutcome::update(StateUpdate::new().set(
            self.messages_key.clone(),
            to_values(std::slice::from_ref(&reply))?,
        )))
    }
}

/// Executes the tool calls in the last message and appends the results
pub struct ToolNode {
    tools: Vec<Arc<dyn Tool>>,
    messages_key: String,
}

impl ToolNode {
    pub fn new(tools: Vec<Arc<dyn Tool>>, messages_key: impl Into<String>) -> Self {
        Self {
            tools,
            messages_key: messages_key.into(),
        }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let messages = messages_from_state(state, &self.messages_key)?;
        let Some(last) = messages.last() else {
            log::warn!("Tool node '{}' found no messages", ctx.node);
            return Ok(NodeOutcome::unchanged());
        };

        let results = execute_calls(last, &self.tools).await;
        Ok(NodeOutcome::update(
            StateUpdate::new().set(self.messages_key.clone(), to_values(&results)?),
        ))
    }
}

/// Where to go after a chat model step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolsRoute {
    /// The last message requests tool calls
    Tools,
    /// The model answered
    Done,
}

impl RouteLabel for ToolsRoute {
    const ALL: &'static [Self] = &[ToolsRoute::Tools, ToolsRoute::Done];

    fn name(&self) -> &'static str {
        match self {
            ToolsRoute::Tools => "tools",
            ToolsRoute::Done => "done",
        }
    }
}

/// Router: [`ToolsRoute::Tools`] when the last message carries tool calls
pub fn tools_condition(
    messages_key: impl Into<String>,
) -> impl Fn(&WorkflowState) -> ToolsRoute + Send + Sync + 'static {
    let key = messages_key.into();
    move |state| {
        let last_has_calls = state
            .get(&key)
            .and_then(Value::as_array)
            .and_then(|items| items.last())
            .and_then(|last| serde_json::from_value::<Content>(last.clone()).ok())
            .is_some_and(|content| content.has_function_calls());
        if last_has_calls {
            ToolsRoute::Tools
        } else {
            ToolsRoute::Done
        }
    }
}

/// Text of the last message in the list, if any
pub fn last_message_text(state: &WorkflowState, key: &str) -> Option<String> {
    messages_from_state(state, key)
        .ok()?
        .last()
        .map(Content::text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::Part;
    use serde_json::json;

    fn call_message() -> Value {
        serde_json::to_value(Content::new(
            "model",
            vec![Part::FunctionCall {
                id: Some("c1".to_string()),
                name: "tavily_search".to_string(),
                args: json!({"query": "q"}),
            }],
        ))
        .unwrap()
    }

    #[test]
    fn test_plain_strings_become_user_messages() {
        let state = WorkflowState::from_value(json!({"messages": ["hello"]})).unwrap();
        let messages = messages_from_state(&state, "messages").unwrap();
        assert_eq!(messages, vec![Content::user("hello")]);
        assert!(messages_from_state(&WorkflowState::empty(), "messages")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_non_list_messages_fail() {
        let state = WorkflowState::from_value(json!({"messages": "hello"})).unwrap();
        assert!(messages_from_state(&state, "messages").is_err());
    }

    #[test]
    fn test_tools_condition() {
        let route = tools_condition("messages");

        let state = WorkflowState::from_value(json!({"messages": ["q", call_message()]})).unwrap();
        assert_eq!(route(&state), ToolsRoute::Tools);

        let answer = serde_json::to_value(Content::model("done")).unwrap();
        let state = WorkflowState::from_value(json!({"messages": [call_message(), answer]})).unwrap();
        assert_eq!(route(&state), ToolsRoute::Done);
        assert_eq!(last_message_text(&state, "messages").as_deref(), Some("done"));

        assert_eq!(route(&WorkflowState::empty()), ToolsRoute::Done);
    }
}
