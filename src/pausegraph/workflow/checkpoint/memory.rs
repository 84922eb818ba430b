// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Checkpoint, Checkpointer};
use crate::adk::error::CheckpointError;
use crate::pausegraph::workflow::state::ThreadId;

/// Process-local checkpoint store. Cloning shares the same map.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointer {
    checkpoints: Arc<RwLock<HashMap<ThreadId, Checkpoint>>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(
        &self,
        thread_id: &ThreadId,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(thread_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(thread_id).cloned())
    }

    async fn clear(&self, thread_id: &ThreadId) -> Result<(), CheckpointError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.remove(thread_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ThreadId>, CheckpointError> {
        let checkpoints = self.checkpoints.read().await;
        let mut ids: Vec<ThreadId> = checkpoints.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pausegraph::workflow::state::WorkflowState;

    fn checkpoint(thread: &str) -> Checkpoint {
        Checkpoint::start("g", ThreadId::new(thread), WorkflowState::empty(), "a")
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = InMemoryCheckpointer::new();
        let id = ThreadId::new("t1");

        assert!(store.load(&id).await.unwrap().is_none());

        store.save(&id, &checkpoint("t1")).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.next.as_deref(), Some("a"));

        store.clear(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
        store.clear(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let store = InMemoryCheckpointer::new();
        let other = store.clone();
        store
            .save(&ThreadId::new("b"), &checkpoint("b"))
            .await
            .unwrap();
        store
            .save(&ThreadId::new("a"), &checkpoint("a"))
            .await
            .unwrap();

        assert_eq!(
            other.list().await.unwrap(),
            vec![ThreadId::new("a"), ThreadId::new("b")]
        );
    }
}
