// SPDX-License-Identifier: MIT

//! YAML schema types for declarative graph definitions
//!
//! ```yaml
//! name: joke_review
//! entry: generator
//! state:
//!   topic: { type: string }
//! nodes:
//!   - name: generator
//!     kind: llm
//!     prompt: "Write a joke about {topic}"
//!     output: joke
//!   - name: human
//!     kind: human
//!     prompt: "Is this funny? {joke}"
//!     approval_into: approved
//! edges:
//!   - { from: generator, to: human }
//!   - from: human
//!     branches:
//!       - { when: "approved", to: __end__ }
//!     otherwise: generator
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::pausegraph::workflow::state::StateSchema;

/// Top-level graph definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Field types, reducers and defaults
    #[serde(default)]
    pub state: StateSchema,
    /// First node to run
    pub entry: String,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

/// A named node and its kind-specific settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    /// Prompt template -> reply text in `output`
    Llm {
        prompt: String,
        #[serde(default)]
        system: Option<String>,
        output: String,
    },
    /// Prompt template -> JSON reply constrained by `schema`
    Structured {
        prompt: String,
        #[serde(default)]
        system: Option<String>,
        schema: Value,
        /// state key -> dot path into the reply
        #[serde(default)]
        outputs: BTreeMap<String, String>,
    },
    /// Pause for a person
    Human {
        prompt: String,
        #[serde(default)]
        text_into: Option<String>,
        #[serde(default)]
        approval_into: Option<String>,
    },
    /// Write fixed values
    Set { values: Map<String, Value> },
    /// Chat model step over a message list
    Chat {
        #[serde(default = "default_messages_key")]
        messages: String,
        #[serde(default)]
        system: Option<String>,
        #[serde(default)]
        tools: Vec<String>,
    },
    /// Execute the tool calls of the last message
    Tools {
        #[serde(default = "default_messages_key")]
        messages: String,
        tools: Vec<String>,
    },
}

fn default_messages_key() -> String {
    "messages".to_string()
}

/// Outgoing edge of one node
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EdgeDefinition {
    /// Ordered `when` conditions with an optional fallback
    Branches {
        from: String,
        branches: Vec<BranchDefinition>,
        #[serde(default)]
        otherwise: Option<String>,
    },
    /// Route on the value of a state field
    Route { from: String, route: RouteDefinition },
    /// Chat loop routing: to `tools` while the model requests calls
    ToolsCondition {
        from: String,
        tools_condition: ToolsConditionDefinition,
    },
    Fixed { from: String, to: String },
}

impl EdgeDefinition {
    pub fn from(&self) -> &str {
        match self {
            EdgeDefinition::Branches { from, .. }
            | EdgeDefinition::Route { from, .. }
            | EdgeDefinition::ToolsCondition { from, .. }
            | EdgeDefinition::Fixed { from, .. } => from,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BranchDefinition {
    pub when: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// State field whose value is the label
    pub field: String,
    /// label -> target
    pub cases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConditionDefinition {
    #[serde(default = "default_messages_key")]
    pub messages: String,
    pub tools: String,
    pub done: String,
}
