// SPDX-License-Identifier: MIT

//! Interruptible graph execution
//!
//! A graph is a set of named [`Node`]s joined by fixed or conditional
//! [`Edge`]s. [`GraphBuilder`] validates the wiring into a [`CompiledGraph`];
//! [`GraphEngine`] steps through it one node at a time, saving a checkpoint
//! after every step so a paused run can be resumed later, possibly from
//! another process.

mod builder;
mod edge;
mod engine;
mod node;
mod types;

pub use builder::{CompiledGraph, GraphBuilder};
pub use edge::{ConditionalEdge, Edge, RouteLabel, Target, END, START};
pub use engine::{EngineConfig, GraphEngine, ThreadLocks};
pub use node::{
    FnNode, Node, NodeContext, NodeOutcome, PauseRequest, ResumeInput, ResumeKind, StaticNode,
};
pub use types::{PauseInfo, RunEvent, RunResult};
