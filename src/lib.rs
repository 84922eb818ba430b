// SPDX-License-Identifier: MIT

//! pausegraph-rs: an interruptible graph engine with resumable checkpoints
//! and human-in-the-loop pauses

pub mod adk;
pub mod pausegraph;
