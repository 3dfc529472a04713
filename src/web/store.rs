//! Generated files waiting for download.
//!
//! Artifacts live in one temporary directory owned by the process. An entry
//! is removed when it is downloaded, replaced by a rebuild, or older than
//! [`ARTIFACT_TTL`]; whatever is left goes with the directory on shutdown.

use crate::types::{Deck, DeckArtifact, DeckFormat};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// How long an undownloaded artifact is kept.
pub const ARTIFACT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub file_name: String,
    pub format: DeckFormat,
    path: PathBuf,
    /// Every card offered on the result page.
    candidates: Deck,
    /// Indices of `candidates` that are in the file.
    selected: Vec<usize>,
    created: Instant,
}

impl StoredArtifact {
    pub fn candidates(&self) -> &Deck {
        &self.candidates
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }
}

pub struct ArtifactStore {
    dir: TempDir,
    index: RwLock<HashMap<Uuid, StoredArtifact>>,
}

impl ArtifactStore {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("studydeck-").tempdir()?;
        debug!("Artifacts stored under {}", dir.path().display());
        Ok(Self {
            dir,
            index: RwLock::new(HashMap::new()),
        })
    }

    /// Write the artifact to disk and return its download id. `candidates`
    /// and `selected` are kept so the deck can be rebuilt later.
    pub async fn save(
        &self,
        artifact: &DeckArtifact,
        candidates: Deck,
        selected: Vec<usize>,
    ) -> io::Result<Uuid> {
        self.sweep().await;

        let id = Uuid::new_v4();
        let path = self
            .dir
            .path()
            .join(format!("{id}.{}", artifact.format.extension()));
        tokio::fs::write(&path, &artifact.bytes).await?;

        self.index.write().await.insert(
            id,
            StoredArtifact {
                file_name: artifact.file_name.clone(),
                format: artifact.format,
                path,
                candidates,
                selected,
                created: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Remove `id` and hand back its metadata and bytes. A second call for
    /// the same id returns `None`.
    pub async fn take(&self, id: &Uuid) -> io::Result<Option<(StoredArtifact, Vec<u8>)>> {
        let Some(entry) = self.index.write().await.remove(id) else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(&entry.path).await;
        remove_file(&entry.path).await;
        Ok(Some((entry, bytes?)))
    }

    /// Metadata for `id` without consuming it.
    pub async fn get(&self, id: &Uuid) -> Option<StoredArtifact> {
        self.index.read().await.get(id).cloned()
    }

    /// Drop `id` and its file, if still present.
    pub async fn discard(&self, id: &Uuid) {
        let removed = self.index.write().await.remove(id);
        if let Some(entry) = removed {
            remove_file(&entry.path).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Forget every entry older than [`ARTIFACT_TTL`].
    async fn sweep(&self) {
        let expired: Vec<StoredArtifact> = {
            let mut index = self.index.write().await;
            let ids: Vec<Uuid> = index
                .iter()
                .filter(|(_, e)| e.created.elapsed() >= ARTIFACT_TTL)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| index.remove(id)).collect()
        };
        if !expired.is_empty() {
            debug!("Expiring {} artifact(s)", expired.len());
        }
        for entry in expired {
            remove_file(&entry.path).await;
        }
    }
}

async fn remove_file(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}
