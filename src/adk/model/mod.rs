// SPDX-License-Identifier: MIT

//! Model module - LLM trait, conversation types and provider clients
//!
//! - [config] - explicit provider/model/key configuration
//! - [openai] - OpenAI-compatible chat completions (OpenAI, Groq)
//! - [structured] - typed structured output on top of any [`Model`]

pub mod config;
pub mod openai;
pub mod structured;

pub use config::{ModelConfig, Provider};
pub use openai::OpenAICompatModel;
pub use structured::{generate_structured, ResponseSchema};

use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Constrain the reply to this JSON schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<ResponseSchema>,
}

impl GenerationConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message - text, function calls and their results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    /// Tool call requested by the model
    FunctionCall {
        /// Provider call id, echoed back with the response
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        args: serde_json::Value,
    },
    /// Result of executing a tool call
    FunctionResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        response: serde_json::Value,
    },
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new("system", vec![Part::Text(text.into())])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", vec![Part::Text(text.into())])
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new("model", vec![Part::Text(text.into())])
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls requested in this message
    pub fn function_calls(&self) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .filter(|part| matches!(part, Part::FunctionCall { .. }))
    }

    pub fn has_function_calls(&self) -> bool {
        self.function_calls().next().is_some()
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_text_joins_text_parts() {
        let content = Content::new(
            "model",
            vec![
                Part::Text("Hello ".to_string()),
                Part::FunctionCall {
                    id: None,
                    name: "search".to_string(),
                    args: json!({}),
                },
                Part::Text("world".to_string()),
            ],
        );
        assert_eq!(content.text(), "Hello world");
        assert!(content.has_function_calls());
        assert!(!Content::user("hi").has_function_calls());
    }

    #[test]
    fn test_content_serde_roundtrip() {
        let content = Content::new(
            "tool",
            vec![Part::FunctionResponse {
                id: Some("call_1".to_string()),
                name: "tavily_search".to_string(),
                response: json!({"results": []}),
            }],
        );
        let value = serde_json::to_value(&content).unwrap();
        let back: Content = serde_json::from_value(value).unwrap();
        assert_eq!(back, content);
    }
}
