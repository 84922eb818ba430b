// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `StateSchema` - declares field types, reducers and defaults
//! - `WorkflowState` - runtime state storage
//! - `StateUpdate` - the partial update a node returns
//! - `ThreadId` - identity of one logical run

mod schema;
mod store;
mod thread;

pub use schema::{FieldType, ReducerType, StateFieldDef, StateSchema};
pub use store::{StateUpdate, WorkflowState};
pub use thread::ThreadId;
