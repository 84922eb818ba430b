// SPDX-License-Identifier: MIT

//! Human-in-the-loop node

use async_trait::async_trait;

use super::template::render;
use crate::adk::error::NodeError;
use crate::pausegraph::workflow::graph::{
    Node, NodeContext, NodeOutcome, PauseRequest, ResumeInput, ResumeKind,
};
use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};

/// Pauses with a prompt, then stores the resume value
///
/// Text resumes go to `text_key`, approvals to `approval_key`. When both keys
/// are set the node accepts either shape and clears the other key, so a
/// router can tell which one arrived.
pub struct HumanNode {
    prompt: String,
    text_key: Option<String>,
    approval_key: Option<String>,
}

impl HumanNode {
    /// Prompt may reference state fields (`{joke}`)
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            text_key: None,
            approval_key: None,
        }
    }

    pub fn text_into(mut self, key: impl Into<String>) -> Self {
        self.text_key = Some(key.into());
        self
    }

    pub fn approval_into(mut self, key: impl Into<String>) -> Self {
        self.approval_key = Some(key.into());
        self
    }

    pub fn expects(&self) -> ResumeKind {
        match (&self.text_key, &self.approval_key) {
            (Some(_), None) => ResumeKind::Text,
            (None, Some(_)) => ResumeKind::Approval,
            _ => ResumeKind::Any,
        }
    }
}

#[async_trait]
impl Node for HumanNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let Some(input) = ctx.resume() else {
            let prompt = render(&self.prompt, state);
            return Ok(NodeOutcome::Pause(
                PauseRequest::new(prompt).expecting(self.expects()),
            ));
        };

        let mut update = StateUpdate::new();
        match input {
            ResumeInput::Text(text) => {
                if let Some(key) = &self.text_key {
                    update.insert(key.clone(), text.clone());
                }
                if let Some(key) = &self.approval_key {
                    update.insert(key.clone(), serde_json::Value::Null);
                }
            }
            ResumeInput::Approval(approved) => {
                if let Some(key) = &self.approval_key {
                    update.insert(key.clone(), *approved);
                }
                if let Some(key) = &self.text_key {
                    update.insert(key.clone(), serde_json::Value::Null);
                }
            }
        }
        log::info!("Human node '{}' received {} input", ctx.node, input.kind());
        Ok(NodeOutcome::update(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pausegraph::workflow::state::ThreadId;
    use serde_json::json;

    fn ctx() -> NodeContext {
        NodeContext::new("human", ThreadId::new("t"), 3)
    }

    #[tokio::test]
    async fn test_pauses_with_rendered_prompt() {
        let node = HumanNode::new("Is this funny?\n{joke}").text_into("human_feedback");
        let state = WorkflowState::from_value(json!({"joke": "knock knock"})).unwrap();

        match node.run(&state, &ctx()).await.unwrap() {
            NodeOutcome::Pause(request) => {
                assert_eq!(request.payload, json!("Is this funny?\nknock knock"));
                assert_eq!(request.expects, ResumeKind::Text);
            }
            other => panic!("expected pause, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stores_resume_value() {
        let node = HumanNode::new("feedback?")
            .text_into("user_feedback")
            .approval_into("approved");
        assert_eq!(node.expects(), ResumeKind::Any);

        let state = WorkflowState::empty();
        let ctx = ctx().with_resume(ResumeInput::Approval(true));
        let outcome = node.run(&state, &ctx).await.unwrap();
        assert_eq!(
            outcome,
            NodeOutcome::update(
                StateUpdate::new()
                    .set("approved", true)
                    .set("user_feedback", serde_json::Value::Null)
            )
        );
    }
}
