// SPDX-License-Identifier: MIT

//! Structured output: ask a model for JSON matching a schema and parse it

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;

use super::{Content, GenerationConfig, Model};
use crate::adk::error::ModelError;

/// Named JSON schema sent as the response format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Schema generated from a Rust type
    pub fn of<T: JsonSchema>() -> Self {
        let schema = schemars::schema_for!(T);
        Self {
            name: T::schema_name(),
            schema: serde_json::to_value(schema).unwrap_or(Value::Null),
        }
    }
}

/// Generate a reply constrained to `T`'s schema and deserialize it
pub async fn generate_structured<T>(
    model: &dyn Model,
    history: &[Content],
    config: Option<&GenerationConfig>,
) -> Result<T, Box<dyn Error + Send + Sync>>
where
    T: DeserializeOwned + JsonSchema,
{
    let mut config = config.cloned().unwrap_or_default();
    config.response_schema = Some(ResponseSchema::of::<T>());

    let reply = model.generate_content(history, Some(&config), None).await?;
    Ok(parse_json_reply(&reply.text())?)
}

/// Parse JSON from a model reply, tolerating code fences and surrounding prose
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, ModelError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| ModelError::InvalidResponse(format!("{}: {}", e, trimmed))),
        _ => Err(ModelError::InvalidResponse(format!(
            "expected a JSON object, got: {}",
            trimmed
        ))),
    }
}
