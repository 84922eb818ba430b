// SPDX-License-Identifier: MIT

//! Resumable graph workflows
//!
//! Graphs are built in code with [`graph::GraphBuilder`] or declared in YAML
//! and compiled by [`factory::GraphFactory`]. The [`graph::GraphEngine`] runs
//! them step by step, saving a [`checkpoint::Checkpoint`] after every step.

pub mod checkpoint;
pub mod condition;
pub mod factory;
pub mod graph;
pub mod loader;
pub mod nodes;
pub mod registry;
pub mod state;
pub mod types;
