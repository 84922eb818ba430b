// SPDX-License-Identifier: MIT

//! OpenAI-compatible chat completions client (OpenAI, Groq)

use super::{Content, GenerationConfig, Model, ModelConfig, Part};
use crate::adk::error::ModelError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;

/// Chat completions client for any endpoint speaking the OpenAI wire format
pub struct OpenAICompatModel {
    client: Client,
    config: ModelConfig,
}

impl OpenAICompatModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Convert internal Content to an OpenAI message
    fn content_to_message(content: &Content) -> Value {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        if let Some(Part::FunctionResponse { id, name, response }) = content
            .parts
            .iter()
            .find(|part| matches!(part, Part::FunctionResponse { .. }))
        {
            let content = match response {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return json!({
                "role": "tool",
                "tool_call_id": id.as_deref().unwrap_or(name),
                "content": content
            });
        }

        let text = content.text();
        let tool_calls: Vec<Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall { id, name, args } => Some(json!({
                    "id": id.as_deref().unwrap_or(name),
                    "type": "function",
                    "function": {
                        "name": name,
                        "arguments": args.to_string()
                    }
                })),
                _ => None,
            })
            .collect();

        if tool_calls.is_empty() {
            json!({ "role": role, "content": text })
        } else {
            json!({
                "role": role,
                "content": if text.is_empty() { Value::Null } else { json!(text) },
                "tool_calls": tool_calls
            })
        }
    }

    fn tools_to_functions(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema()
                    }
                })
            })
            .collect()
    }

    fn build_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Value {
        let messages: Vec<Value> = history.iter().map(Self::content_to_message).collect();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages
        });

        let temperature = config
            .and_then(|cfg| cfg.temperature)
            .or(self.config.temperature);
        if let Some(temperature) = temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(cfg) = config {
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if let Some(schema) = &cfg.response_schema {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": schema.name,
                        "schema": schema.schema
                    }
                });
            }
        }

        if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
            body["tools"] = json!(Self::tools_to_functions(tools));
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Parse the first choice into Content
    fn parse_response(response: &Value) -> Result<Content, ModelError> {
        let message = response["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .map(|choice| &choice["message"])
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let mut parts = Vec::new();
        if let Some(text) = message["content"].as_str().filter(|t| !t.is_empty()) {
            parts.push(Part::Text(text.to_string()));
        }

        for call in message["tool_calls"].as_array().into_iter().flatten() {
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| ModelError::InvalidResponse("tool call without name".to_string()))?;
            let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
            let args = serde_json::from_str(raw_args).unwrap_or_else(|e| {
                log::warn!("Tool call '{}' has unparseable arguments: {}", name, e);
                json!({})
            });
            parts.push(Part::FunctionCall {
                id: call["id"].as_str().map(str::to_string),
                name: name.to_string(),
                args,
            });
        }

        Ok(Content::new("model", parts))
    }
}

#[async_trait]
impl Model for OpenAICompatModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_body(history, config, tools);

        log::debug!(
            "{} request body: {}",
            self.config.provider,
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs }.into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                provider: self.config.provider.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("{} response: {}", self.config.provider, resp_json);

        Ok(Self::parse_response(&resp_json)?)
    }
}
