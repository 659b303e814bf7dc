//! Durable snapshots of the registry.

use crate::error::StoreError;
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// JSON snapshot file, replaced atomically on every save.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the registry snapshot.
    ///
    /// Writes to a sibling temp file and renames it over the snapshot, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub async fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let data = serde_json::to_vec(registry)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved registry ({} bytes) to {:?}", data.len(), self.path);
        Ok(())
    }

    /// Read the registry snapshot.
    ///
    /// Returns an empty registry if the file doesn't exist or is empty.
    pub async fn load(&self) -> Result<Registry, StoreError> {
        if !self.path.exists() {
            info!(
                "Registry file not found at {:?}, starting with empty registry",
                self.path
            );
            return Ok(Registry::new());
        }

        let data = fs::read(&self.path).await?;
        if data.iter().all(u8::is_ascii_whitespace) {
            warn!("Registry file {:?} is empty, starting with empty registry", self.path);
            return Ok(Registry::new());
        }

        let registry: Registry = serde_json::from_slice(&data)?;
        info!(
            "Loaded registry with {} registrations from {:?}",
            registry.registration_count(),
            self.path
        );
        Ok(registry)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// No-op backend for tests and ephemeral deployments.
pub struct MemoryStore;

impl MemoryStore {
    pub async fn save(&self, _registry: &Registry) -> Result<(), StoreError> {
        Ok(())
    }

    pub async fn load(&self) -> Result<Registry, StoreError> {
        debug!("Memory store: returning empty registry");
        Ok(Registry::new())
    }
}

/// Where registry snapshots go.
pub enum Persistence {
    /// JSON file on disk
    File(FileStore),
    /// Nothing is persisted
    Memory(MemoryStore),
}

impl Persistence {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Persistence::File(FileStore::new(path))
    }

    pub fn memory() -> Self {
        Persistence::Memory(MemoryStore)
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, Persistence::File(_))
    }

    pub async fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        match self {
            Persistence::File(s) => s.save(registry).await,
            Persistence::Memory(s) => s.save(registry).await,
        }
    }

    pub async fn load(&self) -> Result<Registry, StoreError> {
        match self {
            Persistence::File(s) => s.load().await,
            Persistence::Memory(s) => s.load().await,
        }
    }
}
