// SPDX-License-Identifier: MIT

//! Node transition functions and the pause/resume vocabulary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;

use crate::adk::error::NodeError;
use crate::pausegraph::workflow::state::{StateUpdate, ThreadId, WorkflowState};

/// What a node asks the engine to do after it ran
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// Merge the update and follow the node's outgoing edge
    Continue(StateUpdate),
    /// Halt the run until a matching [`ResumeInput`] is supplied
    Pause(PauseRequest),
}

impl NodeOutcome {
    /// Continue with an update
    pub fn update(update: StateUpdate) -> Self {
        Self::Continue(update)
    }

    /// Continue without changing state
    pub fn unchanged() -> Self {
        Self::Continue(StateUpdate::new())
    }

    /// Pause with a payload, accepting any resume value
    pub fn pause(payload: impl Into<Value>) -> Self {
        Self::Pause(PauseRequest::new(payload))
    }
}

/// Payload carried by a pause, plus the resume shape the node will accept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseRequest {
    /// Free-form payload for display (usually a prompt for a human)
    pub payload: Value,
    /// Shape of resume value the node expects
    #[serde(default)]
    pub expects: ResumeKind,
}

impl PauseRequest {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            expects: ResumeKind::Any,
        }
    }

    pub fn expecting(mut self, expects: ResumeKind) -> Self {
        self.expects = expects;
        self
    }
}

/// Value supplied by the caller to satisfy a pause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeInput {
    /// Free-form text, e.g. reviewer feedback
    Text(String),
    /// Explicit approve (`true`) / reject (`false`)
    Approval(bool),
}

impl ResumeInput {
    /// Interpret raw user input: `true`/`false` (any case) become approvals,
    /// everything else is text
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Self::Approval(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Self::Approval(false)
        } else {
            Self::Text(raw.to_string())
        }
    }

    pub fn kind(&self) -> ResumeKind {
        match self {
            Self::Text(_) => ResumeKind::Text,
            Self::Approval(_) => ResumeKind::Approval,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Approval(_) => None,
        }
    }

    pub fn as_approval(&self) -> Option<bool> {
        match self {
            Self::Approval(approved) => Some(*approved),
            Self::Text(_) => None,
        }
    }

    /// Strings become text, booleans approvals; other JSON is rejected
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Bool(approved) => Some(Self::Approval(*approved)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Approval(approved) => Value::Bool(*approved),
        }
    }
}

/// Resume shapes a paused node can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeKind {
    Text,
    Approval,
    #[default]
    Any,
}

impl ResumeKind {
    pub fn accepts(&self, input: &ResumeInput) -> bool {
        match self {
            ResumeKind::Any => true,
            kind => *kind == input.kind(),
        }
    }
}

impl fmt::Display for ResumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeKind::Text => write!(f, "text"),
            ResumeKind::Approval => write!(f, "approval"),
            ResumeKind::Any => write!(f, "any"),
        }
    }
}

/// Per-invocation context handed to a node
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// Name of the node being invoked
    pub node: String,
    /// Thread the run belongs to
    pub thread_id: ThreadId,
    /// Number of steps committed on this thread before this invocation
    pub step: u64,
    resume: Option<ResumeInput>,
}

impl NodeContext {
    pub fn new(node: impl Into<String>, thread_id: ThreadId, step: u64) -> Self {
        Self {
            node: node.into(),
            thread_id,
            step,
            resume: None,
        }
    }

    pub fn with_resume(mut self, resume: ResumeInput) -> Self {
        self.resume = Some(resume);
        self
    }

    /// Resume value when the node is re-invoked after a pause
    pub fn resume(&self) -> Option<&ResumeInput> {
        self.resume.as_ref()
    }

    pub fn is_resumed(&self) -> bool {
        self.resume.is_some()
    }
}

/// A named unit of work in the graph
///
/// Implementations must not mutate shared state outside their returned
/// update: a paused node is re-invoked with the same state it first saw.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &WorkflowState, ctx: &NodeContext)
        -> Result<NodeOutcome, NodeError>;
}

/// Node backed by an async closure over owned state and context
pub struct FnNode<F> {
    func: F,
}

impl<F, Fut> FnNode<F>
where
    F: Fn(WorkflowState, NodeContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<NodeOutcome, NodeError>> + Send,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(WorkflowState, NodeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NodeOutcome, NodeError>> + Send + 'static,
{
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        (self.func)(state.clone(), ctx.clone()).await
    }
}

/// Node that always returns the same update
pub struct StaticNode {
    update: StateUpdate,
}

impl StaticNode {
    pub fn new(update: StateUpdate) -> Self {
        Self { update }
    }
}

#[async_trait]
impl Node for StaticNode {
    async fn run(
        &self,
        _state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        log::debug!("Static node '{}' applying fixed update", ctx.node);
        Ok(NodeOutcome::Continue(self.update.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resume_input_parse() {
        assert_eq!(ResumeInput::parse("True"), ResumeInput::Approval(true));
        assert_eq!(ResumeInput::parse(" false "), ResumeInput::Approval(false));
        assert_eq!(
            ResumeInput::parse("Bad code, rewrite it"),
            ResumeInput::Text("Bad code, rewrite it".to_string())
        );
    }

    #[test]
    fn test_resume_kind_accepts() {
        let text = ResumeInput::Text("ok".to_string());
        let yes = ResumeInput::Approval(true);

        assert!(ResumeKind::Any.accepts(&text));
        assert!(ResumeKind::Any.accepts(&yes));
        assert!(ResumeKind::Text.accepts(&text));
        assert!(!ResumeKind::Text.accepts(&yes));
        assert!(!ResumeKind::Approval.accepts(&text));
    }

    #[test]
    fn test_resume_input_serde_is_tagged() {
        let text: ResumeInput = serde_json::from_value(json!({"text": "great job"})).unwrap();
        assert_eq!(text, ResumeInput::Text("great job".to_string()));

        let approval: ResumeInput = serde_json::from_value(json!({"approval": true})).unwrap();
        assert_eq!(approval, ResumeInput::Approval(true));

        assert!(serde_json::from_value::<ResumeInput>(json!("bare")).is_err());
    }

    #[test]
    fn test_resume_input_from_plain_json() {
        assert_eq!(
            ResumeInput::from_json(&json!("great job")),
            Some(ResumeInput::Text("great job".to_string()))
        );
        assert_eq!(
            ResumeInput::from_json(&json!(false)),
            Some(ResumeInput::Approval(false))
        );
        assert_eq!(ResumeInput::from_json(&json!(3)), None);
    }

    #[tokio::test]
    async fn test_fn_node_sees_resume_value() {
        let node = FnNode::new(|_state, ctx: NodeContext| async move {
            match ctx.resume() {
                Some(input) => Ok(NodeOutcome::update(
                    StateUpdate::new().set("feedback", input.to_json()),
                )),
                None => Ok(NodeOutcome::pause("feedback?")),
            }
        });

        let state = WorkflowState::empty();
        let ctx = NodeContext::new("human", ThreadId::new("t"), 0);
        let first = node.run(&state, &ctx).await.unwrap();
        assert_eq!(first, NodeOutcome::pause("feedback?"));

        let ctx = ctx.with_resume(ResumeInput::Text("great job".to_string()));
        let second = node.run(&state, &ctx).await.unwrap();
        assert_eq!(
            second,
            NodeOutcome::update(StateUpdate::new().set("feedback", "great job"))
        );
    }
}
