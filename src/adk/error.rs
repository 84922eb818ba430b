// SPDX-License-Identifier: MIT

//! Typed error handling for pausegraph-rs
//!
//! Engine failures surface as [`GraphError`], graph construction as
//! [`BuildError`] and checkpoint storage as [`CheckpointError`].
//! [`PauseGraphError`] wraps all of them for the loader, factory, server and CLI.

use thiserror::Error;

use crate::pausegraph::workflow::checkpoint::RunStatus;
use crate::pausegraph::workflow::graph::ResumeKind;
use crate::pausegraph::workflow::state::ReducerType;

/// Error type returned by node transition functions
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for pausegraph-rs
#[derive(Debug, Error)]
pub enum PauseGraphError {
    /// Engine errors raised by run / resume
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Graph construction errors
    #[error("Graph build error: {0}")]
    Build(#[from] BuildError),

    /// Checkpoint storage errors outside of a run
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Model adapter errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph name not found among demos or YAML definitions
    #[error("Unknown graph: {0}")]
    UnknownGraph(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the graph engine while running or resuming a thread
#[derive(Debug, Error)]
pub enum GraphError {
    /// Resume or retry requested for a thread with no checkpoint
    #[error("No checkpoint found for thread '{thread_id}'")]
    UnknownThread { thread_id: String },

    /// A router returned a label that is not in its edge's mapping
    #[error("Router on node '{node}' returned unmapped label '{label}'")]
    Routing { node: String, label: String },

    /// A node transition function failed
    #[error("Node '{node}' failed: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: NodeError,
    },

    /// The resume value does not have the shape the paused node asked for
    #[error("Node '{node}' expects {expected} resume input, got {got}")]
    ResumeShape {
        node: String,
        expected: ResumeKind,
        got: ResumeKind,
    },

    /// Resume requested for a thread that is not waiting on a pause
    #[error("Thread '{thread_id}' is not paused (status: {status})")]
    NotPaused { thread_id: String, status: RunStatus },

    /// Retry requested for a thread that has nothing left to run
    #[error("Thread '{thread_id}' has no pending node (status: {status})")]
    NothingToContinue { thread_id: String, status: RunStatus },

    /// Checkpoint was written by another graph
    #[error("Thread '{thread_id}' belongs to graph '{found}', not '{expected}'")]
    GraphMismatch {
        thread_id: String,
        expected: String,
        found: String,
    },

    /// Checkpoint points at a node the compiled graph does not have
    #[error("Checkpoint for thread '{thread_id}' points at unknown node '{node}'")]
    UnknownNode { thread_id: String, node: String },

    /// Optional step bound configured on the engine was exceeded
    #[error("Thread '{thread_id}' exceeded the step limit of {limit}")]
    StepLimit { thread_id: String, limit: u64 },

    /// Checkpoint store failure
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Errors detected while compiling a graph
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Node '{0}' is registered more than once")]
    DuplicateNode(String),

    #[error("Node name '{0}' is reserved")]
    ReservedName(String),

    #[error("Edge {context} references unknown node '{node}'")]
    UnknownNode { context: String, node: String },

    #[error("Node '{0}' already has an outgoing edge")]
    DuplicateEdge(String),

    #[error("Node '{0}' has no outgoing edge")]
    DeadEnd(String),

    #[error("Graph has no entry node")]
    MissingEntry,

    #[error("Router on node '{node}' leaves labels unmapped: {labels:?}")]
    UnmappedLabels { node: String, labels: Vec<String> },

    #[error("Invalid condition '{condition}': {message}")]
    InvalidCondition { condition: String, message: String },

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Invalid node definition '{node}': {message}")]
    InvalidNode { node: String, message: String },
}

/// An update value its field's reducer cannot merge into the current value
#[derive(Debug, Error, PartialEq)]
#[error("{reducer:?} reducer cannot merge into state field '{field}': {message}")]
pub struct ReduceError {
    pub field: String,
    pub reducer: ReducerType,
    pub message: String,
}

/// Checkpoint storage errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider not supported
    #[error("Unknown model provider: {0}")]
    UnknownProvider(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Non-success HTTP status from the provider
    #[error("API error from {provider} ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl PauseGraphError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for PauseGraphError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for PauseGraphError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for PauseGraphError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err.to_string())
    }
}
