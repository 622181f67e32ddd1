use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use log::*;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::store::StateDocument;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error accessing the state document. {0}")]
    Io(#[from] std::io::Error),
    #[error("The state document could not be parsed. {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Handle to the persisted state document.
///
/// The document is loaded once and held in memory behind a single async mutex. Mutations are
/// expressed as *synchronous* closures applied under the lock, immediately followed by a
/// whole-document write to disk while the lock is still held. Keeping the closure synchronous is
/// what upholds the store's one concurrency rule: no `await` between reading shared state and
/// committing a mutation to it.
///
/// A failed disk write leaves the in-memory mutation in place; memory and disk stay divergent
/// until the next successful save.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    doc: Arc<Mutex<StateDocument>>,
}

impl JsonStore {
    /// Open the store at `path`. A missing file is not an error: a default document is
    /// synthesized and persisted immediately.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let doc: StateDocument = serde_json::from_slice(&bytes)?;
                debug!(
                    "🗄️ Loaded state document from {} ({} orders, {} chats, {} users)",
                    path.display(),
                    doc.orders.len(),
                    doc.chats.len(),
                    doc.users.len()
                );
                doc
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("🗄️ No state document at {}. Creating the default document.", path.display());
                let doc = StateDocument::default_document(Utc::now());
                persist(&path, &doc).await?;
                doc
            },
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, doc: Arc::new(Mutex::new(doc)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only closure against the current document.
    pub async fn read<F, R>(&self, f: F) -> R
    where F: FnOnce(&StateDocument) -> R {
        let guard = self.doc.lock().await;
        f(&guard)
    }

    /// Apply a mutation and persist the whole document.
    ///
    /// The closure's return value is handed back only once the save succeeded.
    pub async fn write<F, R>(&self, f: F) -> Result<R, StoreError>
    where F: FnOnce(&mut StateDocument) -> R {
        let mut guard = self.doc.lock().await;
        let result = f(&mut guard);
        persist(&self.path, &guard).await?;
        Ok(result)
    }

    /// Like [`Self::write`], but the closure decides whether anything changed. The document is
    /// only rewritten when the closure returns `true` in the first tuple slot, so pure lookups
    /// that occasionally mutate (e.g. lazy session eviction) do not rewrite the file on every
    /// call.
    pub async fn write_if<F, R>(&self, f: F) -> Result<R, StoreError>
    where F: FnOnce(&mut StateDocument) -> (bool, R) {
        let mut guard = self.doc.lock().await;
        let (dirty, result) = f(&mut guard);
        if dirty {
            persist(&self.path, &guard).await?;
        }
        Ok(result)
    }
}

async fn persist(path: &Path, doc: &StateDocument) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }
    let body = serde_json::to_string_pretty(doc)?;
    tokio::fs::write(path, body).await?;
    trace!("🗄️ State document persisted to {}", path.display());
    Ok(())
}
