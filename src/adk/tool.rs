// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

use crate::adk::model::{Content, Part};

/// A function the model may call during a chat step
///
/// `name`, `description` and `schema` are sent to the model with every
/// request, so implementations keep them in fields and hand out references.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique within one tool set
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the call arguments
    fn schema(&self) -> &Value;

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// Run every tool call in `message` and return one tool-role message per call
///
/// Unknown tools and failing calls produce an `{"error": ...}` response so the
/// model can recover on its next turn.
pub async fn execute_calls(message: &Content, tools: &[Arc<dyn Tool>]) -> Vec<Content> {
    let mut results = Vec::new();
    for part in message.function_calls() {
        let Part::FunctionCall { id, name, args } = part else {
            continue;
        };

        let response = match tools.iter().find(|tool| tool.name() == name) {
            Some(tool) => {
                log::info!("Calling tool '{}'", name);
                match tool.execute(args.clone()).await {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("Tool '{}' failed: {}", name, e);
                        serde_json::json!({ "error": e.to_string() })
                    }
                }
            }
            None => {
                log::warn!("Model requested unknown tool '{}'", name);
                serde_json::json!({ "error": format!("unknown tool '{}'", name) })
            }
        };

        results.push(Content::new(
            "tool",
            vec![Part::FunctionResponse {
                id: id.clone(),
                name: name.clone(),
                response,
            }],
        ));
    }
    results
}
