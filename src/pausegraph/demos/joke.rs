// SPDX-License-Identifier: MIT

//! Joke evaluator-optimizer with a human grader
//!
//! The generator writes a joke, a structured evaluator grades it, then the
//! run pauses for a person. Their free-text reaction is graded by the model
//! and decides whether the joke is accepted or regenerated with both pieces
//! of feedback.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::adk::error::{BuildError, NodeError};
use crate::adk::model::{generate_structured, Content, GenerationConfig, Model, ResponseSchema};
use crate::pausegraph::workflow::graph::{
    CompiledGraph, GraphBuilder, Node, NodeContext, NodeOutcome, PauseRequest, ResumeKind,
    RouteLabel, Target, START,
};
use crate::pausegraph::workflow::nodes::template::render;
use crate::pausegraph::workflow::nodes::StructuredLlmNode;
use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};

pub const NAME: &str = "joke";

const HUMAN_PROMPT: &str = "Hey! Do you feel it funny or not ?\n\n{joke}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
pub enum Grade {
    #[serde(rename = "funny")]
    Funny,
    #[serde(rename = "not funny")]
    NotFunny,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Funny => "funny",
            Grade::NotFunny => "not funny",
        }
    }
}

/// Evaluator reply
#[derive(Debug, Deserialize, JsonSchema)]
pub struct Feedback {
    /// Decide if the joke is funny or not.
    pub grade: Grade,
    /// If the joke is not funny, provide feedback on how to improve it.
    pub feedback: String,
}

/// Grade of a person's reaction
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HumanFeedback {
    /// Based on provided feedback, decide joke is funny or not funny
    pub grade: Grade,
}

fn generator_prompt(state: &WorkflowState) -> String {
    let has = |key: &str| state.get_str(key).is_some_and(|v| !v.is_empty());
    if has("llm_feedback") || has("human_feedback") {
        render(
            "Write a joke about {topic} but take into account the LLM feedback \
             {llm_feedback} and human feedback {human_feedback}",
            state,
        )
    } else {
        render("Write a joke about {topic}", state)
    }
}

/// Writes a joke, folding in earlier feedback when there is any
struct GeneratorNode {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

#[async_trait]
impl Node for GeneratorNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let prompt = generator_prompt(state);
        log::debug!("Generator '{}' prompt: {}", ctx.node, prompt);
        let reply = self
            .model
            .generate_content(&[Content::user(prompt)], Some(&self.config), None)
            .await?;
        Ok(NodeOutcome::update(StateUpdate::new().set("joke", reply.text())))
    }
}

/// Pauses for a reaction, then grades it
struct HumanGradeNode {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

#[async_trait]
impl Node for HumanGradeNode {
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let Some(feedback) = ctx.resume().and_then(|input| input.as_text()) else {
            return Ok(NodeOutcome::Pause(
                PauseRequest::new(render(HUMAN_PROMPT, state)).expecting(ResumeKind::Text),
            ));
        };

        let history = [Content::user(format!("Grade the human feedback {}", feedback))];
        let grade: HumanFeedback =
            generate_structured(self.model.as_ref(), &history, Some(&self.config)).await?;
        log::info!("Human reaction graded '{}'", grade.grade.as_str());

        Ok(NodeOutcome::update(
            StateUpdate::new()
                .set("human_feedback", feedback)
                .set("human_grade", grade.grade.as_str()),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JokeRoute {
    Accepted,
    Rejected,
}

impl RouteLabel for JokeRoute {
    const ALL: &'static [Self] = &[JokeRoute::Accepted, JokeRoute::Rejected];

    fn name(&self) -> &'static str {
        match self {
            JokeRoute::Accepted => "Accepted",
            JokeRoute::Rejected => "Rejected + Feedback",
        }
    }
}

/// The human grade decides; the evaluator's grade only informs the next attempt
pub fn route_joke(state: &WorkflowState) -> JokeRoute {
    if state.get_str("human_grade") == Some(Grade::Funny.as_str()) {
        JokeRoute::Accepted
    } else {
        JokeRoute::Rejected
    }
}

pub fn build(model: Arc<dyn Model>) -> Result<CompiledGraph, BuildError> {
    let config = GenerationConfig::default().with_temperature(0.0);

    let evaluator = StructuredLlmNode::new(
        model.clone(),
        "Grade the joke {joke}",
        ResponseSchema::of::<Feedback>(),
    )
    .output("funny_or_not", "grade")
    .output("llm_feedback", "feedback")
    .with_config(config.clone());

    GraphBuilder::new(NAME)
        .description("Generate jokes on a topic until a person finds one funny")
        .add_node(
            "llm_call_generator",
            GeneratorNode {
                model: model.clone(),
                config: config.clone(),
            },
        )
        .add_node("llm_call_evaluator", evaluator)
        .add_node("human_feedback_evaluator", HumanGradeNode { model, config })
        .add_edge(START, "llm_call_generator")
        .add_edge("llm_call_generator", "llm_call_evaluator")
        .add_edge("llm_call_evaluator", "human_feedback_evaluator")
        .add_conditional_edges(
            "human_feedback_evaluator",
            route_joke,
            [
                (JokeRoute::Accepted, Target::End),
                (JokeRoute::Rejected, Target::node("llm_call_generator")),
            ],
        )
        .compile()
}
