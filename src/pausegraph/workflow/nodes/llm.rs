// SPDX-License-Identifier: MIT

//! Prompt-template LLM nodes

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::template::{extract_json_path, render};
use crate::adk::error::{ModelError, NodeError};
use crate::adk::model::structured::parse_json_reply;
use crate::adk::model::{Content, GenerationConfig, Model, ResponseSchema};
use crate::pausegraph::workflow::graph::{Node, NodeContext, NodeOutcome};
use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};

fn history(system: Option<&str>, prompt: String) -> Vec<Content> {
    let mut history = Vec::with_capacity(2);
    if let Some(system) = system {
        history.push(Content::system(system));
    }
    history.push(Content::user(prompt));
    history
}

/// Renders a prompt from state, calls the model and stores the reply text
pub struct LlmNode {
    model: Arc<dyn Model>,
    system: Option<String>,
    prompt: String,
    output_key: String,
    config: GenerationConfig,
}

impl LlmNode {
    pub fn new(
        model: Arc<dyn Model>,
        prompt: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            model,
            system: None,
            prompt: prompt.into(),
            output_key: output_key.into(),
            config: GenerationConfig::default(),
        }
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
impl Node for LlmNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let prompt = render(&self.prompt, state);
        log::debug!("LLM node '{}' prompt: {}", ctx.node, prompt);

        let reply = self
            .model
            .generate_content(
                &history(self.system.as_deref(), prompt),
                Some(&self.config),
                None,
            )
            .await?;

        Ok(NodeOutcome::update(
            StateUpdate::new().set(self.output_key.clone(), reply.text()),
        ))
    }
}

/// Like [`LlmNode`] but constrains the reply to a JSON schema and maps
/// fields of the reply into state
///
/// `outputs` pairs a state key with a dot path into the reply. With no
/// outputs every top-level field of the reply is copied.
pub struct StructuredLlmNode {
    model: Arc<dyn Model>,
    system: Option<String>,
    prompt: String,
    schema: ResponseSchema,
    outputs: Vec<(String, String)>,
    config: GenerationConfig,
}

impl StructuredLlmNode {
    pub fn new(model: Arc<dyn Model>, prompt: impl Into<String>, schema: ResponseSchema) -> Self {
        Self {
            model,
            system: None,
            prompt: prompt.into(),
            schema,
            outputs: Vec::new(),
            config: GenerationConfig::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Copy `path` of the reply into `state_key`
    pub fn output(mut self, state_key: impl Into<String>, path: impl Into<String>) -> Self {
        self.outputs.push((state_key.into(), path.into()));
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl Node for StructuredLlmNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let prompt = render(&self.prompt, state);
        let mut config = self.config.clone();
        config.response_schema = Some(self.schema.clone());

        let reply = self
            .model
            .generate_content(
                &history(self.system.as_deref(), prompt),
                Some(&config),
                None,
            )
            .await?;
        let parsed: Value = parse_json_reply(&reply.text())?;
        log::debug!("Structured node '{}' reply: {}", ctx.node, parsed);

        let mut update = StateUpdate::new();
        if self.outputs.is_empty() {
            let Value::Object(fields) = parsed else {
                return Err(ModelError::InvalidResponse(format!(
                    "node '{}' expected a JSON object, got {}",
                    ctx.node, parsed
                ))
                .into());
            };
            for (key, value) in fields {
                update.insert(key, value);
            }
        } else {
            for (state_key, path) in &self.outputs {
                match extract_json_path(&parsed, path) {
                    Some(value) => update.insert(state_key.clone(), value),
                    None => log::warn!(
                        "Structured node '{}' reply has no field '{}'",
                        ctx.node,
                        path
                    ),
                }
            }
        }
        Ok(NodeOutcome::update(update))
    }
}
