// SPDX-License-Identifier: MIT

//! Graph engine: steps through a compiled graph, checkpointing as it goes

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::adk::error::GraphError;
use crate::pausegraph::workflow::checkpoint::{Checkpoint, Checkpointer, RunStatus};
use crate::pausegraph::workflow::state::{ThreadId, WorkflowState};

use super::builder::CompiledGraph;
use super::edge::Target;
use super::node::{NodeContext, NodeOutcome, ResumeInput};
use super::types::{PauseInfo, RunEvent, RunResult};

/// Engine tuning
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Maximum node invocations per `run`/`resume`/`continue_run` call.
    /// `None` means unbounded: cycles run until a router selects `End`.
    pub max_steps: Option<u64>,
}

impl EngineConfig {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Per-thread async locks, shareable between engines over the same store
#[derive(Clone, Default)]
pub struct ThreadLocks {
    locks: Arc<Mutex<HashMap<ThreadId, Arc<Mutex<()>>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` while holding the thread's lock
    ///
    /// The thread's entry is dropped once no other caller holds or waits on it.
    pub async fn with<F: Future>(&self, thread_id: &ThreadId, fut: F) -> F::Output {
        let lock = self.get(thread_id).await;
        let output = {
            let _guard = lock.lock().await;
            fut.await
        };
        self.release(thread_id, lock).await;
        output
    }

    /// Number of threads with a live lock entry
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn get(&self, thread_id: &ThreadId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(thread_id.clone()).or_default().clone()
    }

    async fn release(&self, thread_id: &ThreadId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(thread_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(thread_id);
        }
    }
}

/// Runs a [`CompiledGraph`] against a [`Checkpointer`]
///
/// Calls on the same thread id are serialized; different threads run
/// independently.
pub struct GraphEngine {
    graph: Arc<CompiledGraph>,
    checkpointer: Arc<dyn Checkpointer>,
    config: EngineConfig,
    locks: ThreadLocks,
}

impl GraphEngine {
    pub fn new(graph: CompiledGraph, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            graph: Arc::new(graph),
            checkpointer,
            config: EngineConfig::default(),
            locks: ThreadLocks::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_thread_locks(mut self, locks: ThreadLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Start a run at the entry node. An existing checkpoint for the thread
    /// is overwritten.
    pub async fn run(
        &self,
        initial_state: WorkflowState,
        thread_id: &ThreadId,
    ) -> Result<RunResult, GraphError> {
        self.run_inner(initial_state, thread_id, None).await
    }

    /// [`GraphEngine::run`], emitting a [`RunEvent`] per step
    pub async fn run_stream(
        &self,
        initial_state: WorkflowState,
        thread_id: &ThreadId,
        events: mpsc::Sender<RunEvent>,
    ) -> Result<RunResult, GraphError> {
        self.run_inner(initial_state, thread_id, Some(&events)).await
    }

    /// Satisfy the pause the thread is waiting on and keep stepping
    pub async fn resume(
        &self,
        thread_id: &ThreadId,
        input: ResumeInput,
    ) -> Result<RunResult, GraphError> {
        self.resume_inner(thread_id, input, None).await
    }

    /// [`GraphEngine::resume`], emitting a [`RunEvent`] per step
    pub async fn resume_stream(
        &self,
        thread_id: &ThreadId,
        input: ResumeInput,
        events: mpsc::Sender<RunEvent>,
    ) -> Result<RunResult, GraphError> {
        self.resume_inner(thread_id, input, Some(&events)).await
    }

    /// Retry the pending node of a run stopped by a node failure
    pub async fn continue_run(&self, thread_id: &ThreadId) -> Result<RunResult, GraphError> {
        self.locks
            .with(thread_id, self.continue_locked(thread_id))
            .await
    }

    /// Latest checkpoint for the thread, if any
    pub async fn get_state(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, GraphError> {
        Ok(self.checkpointer.load(thread_id).await?)
    }

    pub async fn clear(&self, thread_id: &ThreadId) -> Result<(), GraphError> {
        self.locks
            .with(thread_id, async {
                self.checkpointer.clear(thread_id).await?;
                log::info!("Thread {}: checkpoint cleared", thread_id);
                Ok::<_, GraphError>(())
            })
            .await
    }

    pub fn thread_locks(&self) -> &ThreadLocks {
        &self.locks
    }

    async fn continue_locked(&self, thread_id: &ThreadId) -> Result<RunResult, GraphError> {
        let checkpoint = self.load_own(thread_id).await?;
        if checkpoint.status != RunStatus::Running || checkpoint.next.is_none() {
            return Err(GraphError::NothingToContinue {
                thread_id: thread_id.to_string(),
                status: checkpoint.status,
            });
        }

        log::info!(
            "Thread {}: retrying node '{}'",
            thread_id,
            checkpoint.next.as_deref().unwrap_or_default()
        );
        self.drive(checkpoint, None, None).await
    }

    async fn run_inner(
        &self,
        initial_state: WorkflowState,
        thread_id: &ThreadId,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunResult, GraphError> {
        self.locks
            .with(thread_id, self.start_locked(initial_state, thread_id, events))
            .await
    }

    async fn start_locked(
        &self,
        initial_state: WorkflowState,
        thread_id: &ThreadId,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunResult, GraphError> {
        let state = initial_state.with_defaults(self.graph.schema());
        let checkpoint = Checkpoint::start(
            self.graph.name(),
            thread_id.clone(),
            state,
            self.graph.entry(),
        );
        self.checkpointer.save(thread_id, &checkpoint).await?;
        log::info!(
            "Thread {}: starting graph '{}' at '{}'",
            thread_id,
            self.graph.name(),
            self.graph.entry()
        );

        self.drive(checkpoint, None, events).await
    }

    async fn resume_inner(
        &self,
        thread_id: &ThreadId,
        input: ResumeInput,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunResult, GraphError> {
        self.locks
            .with(thread_id, self.resume_locked(thread_id, input, events))
            .await
    }

    async fn resume_locked(
        &self,
        thread_id: &ThreadId,
        input: ResumeInput,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunResult, GraphError> {
        let checkpoint = self.load_own(thread_id).await?;
        if checkpoint.status != RunStatus::Paused {
            return Err(GraphError::NotPaused {
                thread_id: thread_id.to_string(),
                status: checkpoint.status,
            });
        }

        let node = checkpoint.next.clone().unwrap_or_default();
        let expected = checkpoint
            .pause
            .as_ref()
            .map(|pause| pause.expects)
            .unwrap_or_default();
        if !expected.accepts(&input) {
            return Err(GraphError::ResumeShape {
                node,
                expected,
                got: input.kind(),
            });
        }

        log::info!("Thread {}: resuming node '{}' with {} input", thread_id, node, input.kind());
        self.drive(checkpoint, Some(input), events).await
    }

    /// Load a checkpoint and check it was written by this graph
    async fn load_own(&self, thread_id: &ThreadId) -> Result<Checkpoint, GraphError> {
        let checkpoint =
            self.checkpointer
                .load(thread_id)
                .await?
                .ok_or_else(|| GraphError::UnknownThread {
                    thread_id: thread_id.to_string(),
                })?;

        if checkpoint.graph != self.graph.name() {
            return Err(GraphError::GraphMismatch {
                thread_id: thread_id.to_string(),
                expected: self.graph.name().to_string(),
                found: checkpoint.graph,
            });
        }
        Ok(checkpoint)
    }

    /// Step from `checkpoint.next` until the graph ends, pauses or fails
    ///
    /// Each step merges the node's update, routes on the merged state, then
    /// saves one checkpoint. A failing node or router leaves the last saved
    /// checkpoint in place.
    async fn drive(
        &self,
        mut checkpoint: Checkpoint,
        mut resume: Option<ResumeInput>,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunResult, GraphError> {
        let thread_id = checkpoint.thread_id.clone();
        let mut steps_taken: u64 = 0;

        while let Some(node_name) = checkpoint.next.clone() {
            if let Some(limit) = self.config.max_steps {
                if steps_taken >= limit {
                    log::error!("Thread {}: step limit {} reached", thread_id, limit);
                    return Err(GraphError::StepLimit {
                        thread_id: thread_id.to_string(),
                        limit,
                    });
                }
            }
            steps_taken += 1;

            let node = self
                .graph
                .node(&node_name)
                .ok_or_else(|| GraphError::UnknownNode {
                    thread_id: thread_id.to_string(),
                    node: node_name.clone(),
                })?;

            log::info!("Thread {}: step {} running '{}'", thread_id, checkpoint.step, node_name);
            emit(
                events,
                RunEvent::NodeStarted {
                    node: node_name.clone(),
                    step: checkpoint.step,
                },
            )
            .await;

            let mut ctx = NodeContext::new(node_name.clone(), thread_id.clone(), checkpoint.step);
            if let Some(input) = resume.take() {
                ctx = ctx.with_resume(input);
            }

            let outcome = node.run(&checkpoint.state, &ctx).await.map_err(|source| {
                log::error!("Thread {}: node '{}' failed: {}", thread_id, node_name, source);
                GraphError::NodeExecution {
                    node: node_name.clone(),
                    source,
                }
            })?;

            let update = match outcome {
                NodeOutcome::Pause(request) => {
                    log::info!("Thread {}: paused at '{}'", thread_id, node_name);
                    checkpoint.status = RunStatus::Paused;
                    checkpoint.pause = Some(request.clone());
                    checkpoint.touch();
                    self.checkpointer.save(&thread_id, &checkpoint).await?;

                    emit(
                        events,
                        RunEvent::Interrupted {
                            node: node_name.clone(),
                            payload: request.payload.clone(),
                        },
                    )
                    .await;
                    return Ok(RunResult::Paused(PauseInfo {
                        node: node_name,
                        payload: request.payload,
                        expects: request.expects,
                    }));
                }
                NodeOutcome::Continue(update) => update,
            };

            // A rejected update leaves the last saved checkpoint in place
            checkpoint
                .state
                .apply(&update, self.graph.schema())
                .map_err(|e| {
                    log::error!("Thread {}: node '{}' update rejected: {}", thread_id, node_name, e);
                    GraphError::NodeExecution {
                        node: node_name.clone(),
                        source: Box::new(e),
                    }
                })?;

            let edge = self.graph.edge(&node_name).ok_or_else(|| GraphError::Routing {
                node: node_name.clone(),
                label: String::new(),
            })?;
            let target = edge.resolve(&checkpoint.state).map_err(|label| {
                log::error!(
                    "Thread {}: router on '{}' returned unmapped label '{}'",
                    thread_id,
                    node_name,
                    label
                );
                GraphError::Routing {
                    node: node_name.clone(),
                    label,
                }
            })?;
            log::debug!("Thread {}: '{}' -> '{}'", thread_id, node_name, target);

            checkpoint.step += 1;
            checkpoint.last_node = Some(node_name.clone());
            checkpoint.pause = None;
            match target {
                Target::End => {
                    checkpoint.next = None;
                    checkpoint.status = RunStatus::Completed;
                }
                Target::Node(next) => {
                    checkpoint.next = Some(next);
                    checkpoint.status = RunStatus::Running;
                }
            }
            checkpoint.touch();
            self.checkpointer.save(&thread_id, &checkpoint).await?;

            emit(
                events,
                RunEvent::NodeUpdated {
                    node: node_name,
                    update,
                },
            )
            .await;
        }

        log::info!(
            "Thread {}: completed after {} steps",
            thread_id,
            checkpoint.step
        );
        emit(
            events,
            RunEvent::Completed {
                state: checkpoint.state.clone(),
            },
        )
        .await;
        Ok(RunResult::Completed {
            state: checkpoint.state,
        })
    }
}

async fn emit(events: Option<&mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            log::debug!("Run event receiver dropped");
        }
    }
}
