// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{Checkpoint, Checkpointer};
use crate::adk::error::CheckpointError;
use crate::pausegraph::workflow::state::ThreadId;

const EXTENSION: &str = "json";

/// Checkpoint store with one JSON file per thread
///
/// Survives process restarts, so a run paused by one CLI invocation can be
/// resumed by the next. Writes go through a temp file and a rename. There is
/// no locking across processes.
#[derive(Debug, Clone)]
pub struct FileCheckpointer {
    dir: PathBuf,
}

impl FileCheckpointer {
    /// Use `dir` as the store, creating it if needed
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Thread ids are percent-encoded, so `/` and `..` segments cannot
    /// escape the store directory
    fn path_for(&self, thread_id: &ThreadId) -> PathBuf {
        let stem = urlencoding::encode(thread_id.as_str());
        self.dir.join(format!("{}.{}", stem, EXTENSION))
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn save(
        &self,
        thread_id: &ThreadId,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError> {
        let path = self.path_for(thread_id);
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        let data = serde_json::to_vec_pretty(checkpoint)?;

        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        log::trace!("Saved checkpoint for thread {} to {}", thread_id, path.display());
        Ok(())
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(thread_id);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self, thread_id: &ThreadId) -> Result<(), CheckpointError> {
        match tokio::fs::remove_file(self.path_for(thread_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<ThreadId>, CheckpointError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match urlencoding::decode(stem) {
                Ok(id) => ids.push(ThreadId::new(id.into_owned())),
                Err(e) => log::warn!("Skipping checkpoint file {}: {}", path.display(), e),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
