// SPDX-License-Identifier: MIT

//! Checkpoint snapshots and the stores that persist them
//!
//! A checkpoint is written after every committed step and whenever a run
//! pauses. Stores keep one checkpoint per thread; saving replaces it.

mod file;
mod memory;

pub use file::FileCheckpointer;
pub use memory::InMemoryCheckpointer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adk::error::CheckpointError;
use crate::pausegraph::workflow::graph::PauseRequest;
use crate::pausegraph::workflow::state::{ThreadId, WorkflowState};

/// Lifecycle of a thread's run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Stepping, or stopped by a node failure with `next` still pending
    Running,
    /// Waiting on a resume value for `next`
    Paused,
    /// `End` reached
    Completed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Paused => write!(f, "paused"),
            RunStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Persisted snapshot of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Name of the graph that wrote the checkpoint
    pub graph: String,
    pub thread_id: ThreadId,
    pub state: WorkflowState,
    /// Node to invoke next; `None` once completed
    pub next: Option<String>,
    pub status: RunStatus,
    /// Pause the run is waiting on, when `status` is `Paused`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<PauseRequest>,
    /// Number of committed steps
    pub step: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_node: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Fresh checkpoint for a run about to start at `entry`
    pub fn start(
        graph: impl Into<String>,
        thread_id: ThreadId,
        state: WorkflowState,
        entry: impl Into<String>,
    ) -> Self {
        Self {
            graph: graph.into(),
            thread_id,
            state,
            next: Some(entry.into()),
            status: RunStatus::Running,
            pause: None,
            step: 0,
            last_node: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Storage for checkpoints, keyed by thread
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Store `checkpoint`, replacing any previous one for the thread
    async fn save(&self, thread_id: &ThreadId, checkpoint: &Checkpoint)
        -> Result<(), CheckpointError>;

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Remove the thread's checkpoint. Clearing an unknown thread is not an error.
    async fn clear(&self, thread_id: &ThreadId) -> Result<(), CheckpointError>;

    /// Threads that currently have a checkpoint, sorted
    async fn list(&self) -> Result<Vec<ThreadId>, CheckpointError>;
}
