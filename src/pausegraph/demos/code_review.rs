// SPDX-License-Identifier: MIT

//! Code peer review with human feedback
//!
//! `review -> human_feedback -> {finalize | review}`. The human either
//! approves (`true`) or writes feedback; written feedback is graded for
//! sentiment in the same step, so the router always sees a fresh
//! `binary_score`.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::adk::error::{BuildError, NodeError};
use crate::adk::model::{generate_structured, Content, GenerationConfig, Model};
use crate::pausegraph::workflow::graph::{
    CompiledGraph, FnNode, GraphBuilder, Node, NodeContext, NodeOutcome, PauseRequest,
    ResumeInput, ResumeKind, RouteLabel, Target, END, START,
};
use crate::pausegraph::workflow::nodes::template::render;
use crate::pausegraph::workflow::nodes::LlmNode;
use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};

pub const NAME: &str = "code_review";

const REVIEW_PROMPT: &str = "You are a senior engineer doing a peer review. \
Review the following code and list concrete problems and improvements.\n\n{input}";

const REVISE_PROMPT: &str = "You are a senior engineer doing a peer review. \
Rewrite your review of the code below, taking the reviewer's feedback into account.\n\n\
Code:\n{input}\n\nPrevious review:\n{review}\n\nFeedback:\n{user_feedback}";

const FEEDBACK_PROMPT: &str =
    "Please provide the feedback (Use True to continue the workflow):\n\n{review}";

/// Sentiment of a piece of reviewer feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BinaryScore {
    Yes,
    No,
}

impl BinaryScore {
    fn as_str(&self) -> &'static str {
        match self {
            BinaryScore::Yes => "yes",
            BinaryScore::No => "no",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScoreModel {
    /// 'yes' for positive response and 'no' for negative response.
    pub binary_score: BinaryScore,
}

/// Writes the first review, or a revision once feedback exists
struct ReviewNode {
    first: LlmNode,
    revise: LlmNode,
}

#[async_trait]
impl Node for ReviewNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let has_feedback = state
            .get_str("user_feedback")
            .is_some_and(|feedback| !feedback.is_empty());
        if has_feedback {
            self.revise.run(state, ctx).await
        } else {
            self.first.run(state, ctx).await
        }
    }
}

/// Pauses for approval or feedback and grades written feedback
///
/// Sets `approved`, `binary_score` and `user_feedback` in one update.
/// `Approval(false)` rejects without new text: the review is revised
/// against the `user_feedback` already in state, if any.
struct FeedbackNode {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

#[async_trait]
impl Node for FeedbackNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let Some(input) = ctx.resume() else {
            return Ok(NodeOutcome::Pause(
                PauseRequest::new(render(FEEDBACK_PROMPT, state)).expecting(ResumeKind::Any),
            ));
        };

        let update = match input {
            ResumeInput::Approval(approved) => StateUpdate::new()
                .set("approved", *approved)
                .set(
                    "binary_score",
                    (if *approved { BinaryScore::Yes } else { BinaryScore::No }).as_str(),
                ),
            ResumeInput::Text(feedback) => {
                let history = [Content::user(format!(
                    "Classify the sentiment of this code review feedback: {}",
                    feedback
                ))];
                let score: ScoreModel =
                    generate_structured(self.model.as_ref(), &history, Some(&self.config)).await?;
                log::info!(
                    "Feedback on '{}' graded {}",
                    ctx.thread_id,
                    score.binary_score.as_str()
                );
                StateUpdate::new()
                    .set("approved", false)
                    .set("binary_score", score.binary_score.as_str())
                    .set("user_feedback", feedback.clone())
            }
        };
        Ok(NodeOutcome::update(update))
    }
}

/// Where the review goes after feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewRoute {
    Accept,
    Revise,
}

impl RouteLabel for ReviewRoute {
    const ALL: &'static [Self] = &[ReviewRoute::Accept, ReviewRoute::Revise];

    fn name(&self) -> &'static str {
        match self {
            ReviewRoute::Accept => "accept",
            ReviewRoute::Revise => "revise",
        }
    }
}

/// Accept on approval or positive feedback
pub fn route_review(state: &WorkflowState) -> ReviewRoute {
    let approved = state.get_bool("approved").unwrap_or(false);
    let positive = state.get_str("binary_score") == Some(BinaryScore::Yes.as_str());
    if approved || positive {
        ReviewRoute::Accept
    } else {
        ReviewRoute::Revise
    }
}

pub fn build(model: Arc<dyn Model>) -> Result<CompiledGraph, BuildError> {
    let config = GenerationConfig::default().with_temperature(0.3);

    let review = ReviewNode {
        first: LlmNode::new(model.clone(), REVIEW_PROMPT, "review").with_config(config.clone()),
        revise: LlmNode::new(model.clone(), REVISE_PROMPT, "review").with_config(config.clone()),
    };
    let feedback = FeedbackNode { model, config };
    let finalize = FnNode::new(|state: WorkflowState, _ctx: NodeContext| async move {
        let review = state.get("review").cloned().unwrap_or(Value::Null);
        log::info!(
            "Review accepted with feedback: {}",
            state.get_str("user_feedback").unwrap_or("<none>")
        );
        Ok::<_, NodeError>(NodeOutcome::update(
            StateUpdate::new().set("final_review", review),
        ))
    });

    GraphBuilder::new(NAME)
        .description("Peer review a code snippet, revising until the reviewer accepts")
        .add_node("review", review)
        .add_node("human_feedback", feedback)
        .add_node("finalize", finalize)
        .add_edge(START, "review")
        .add_edge("review", "human_feedback")
        .add_conditional_edges(
            "human_feedback",
            route_review,
            [
                (ReviewRoute::Accept, Target::node("finalize")),
                (ReviewRoute::Revise, Target::node("review")),
            ],
        )
        .add_edge("finalize", END)
        .compile()
}
