//! Content-addressed storage for built artifacts.
//!
//! An artifact is identified by the SHA-256 of everything that determines
//! it: the region and model configuration plus fingerprints of the loaded
//! datasets. A build with an unchanged key can reuse the stored artifact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::Artifact;

/// Errors from encoding, decoding, or persisting artifacts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the store failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serializing an artifact or key input failed.
    #[error("Failed to encode artifact: {0}")]
    Encode(String),

    /// A stored artifact could not be read back.
    #[error("Failed to decode artifact: {0}")]
    Decode(String),
}

/// Hex-encoded SHA-256 identifying one artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Hashes the given parts in order.
    #[must_use]
    pub fn derive(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical JSON text of a value, used as a key part.
///
/// # Errors
///
/// * If the value cannot be serialized
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Encode(e.to_string()))
}

/// SHA-256 over the `MessagePack` encoding of a value.
///
/// # Errors
///
/// * If the value cannot be serialized
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    let bytes = rmp_serde::to_vec(value).map_err(|e| StoreError::Encode(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Persistence for built artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Returns the artifact stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// * If the store cannot be read or the artifact cannot be decoded
    fn load(&self, key: &ArtifactKey) -> Result<Option<Artifact>, StoreError>;

    /// Stores `artifact` under `key`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// * If the artifact cannot be encoded or written
    fn save(&self, key: &ArtifactKey, artifact: &Artifact) -> Result<(), StoreError>;

    /// The most recently saved artifact, if any.
    ///
    /// # Errors
    ///
    /// * If the store cannot be read or the artifact cannot be decoded
    fn latest(&self) -> Result<Option<Artifact>, StoreError>;
}

/// One `MessagePack` file per key in a directory.
///
/// Writes go to a temporary file that is renamed into place, so readers
/// never observe a partially written artifact. A `LATEST` file names the
/// key of the last successful save.
pub struct FsArtifactStore {
    dir: PathBuf,
}

const LATEST_FILE: &str = "LATEST";

impl FsArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.join(format!("{key}.msgpack"))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| io_error(&self.dir, source))?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|source| io_error(&tmp, source))?;
        std::fs::rename(&tmp, path).map_err(|source| io_error(path, source))?;
        Ok(())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, key: &ArtifactKey) -> Result<Option<Artifact>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&path).map_err(|source| io_error(&path, source))?;
        let artifact =
            rmp_serde::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
        log::info!("Loaded artifact {key} from {}", path.display());
        Ok(Some(artifact))
    }

    fn save(&self, key: &ArtifactKey, artifact: &Artifact) -> Result<(), StoreError> {
        let bytes =
            rmp_serde::to_vec_named(artifact).map_err(|e| StoreError::Encode(e.to_string()))?;
        let path = self.path_for(key);
        self.write_atomic(&path, &bytes)?;
        self.write_atomic(&self.dir.join(LATEST_FILE), key.as_str().as_bytes())?;

        log::info!(
            "Saved artifact {key} ({} bytes) to {}",
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    fn latest(&self) -> Result<Option<Artifact>, StoreError> {
        let marker = self.dir.join(LATEST_FILE);
        if !marker.exists() {
            return Ok(None);
        }
        let key = std::fs::read_to_string(&marker).map_err(|source| io_error(&marker, source))?;
        self.load(&ArtifactKey(key.trim().to_string()))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// In-process store, mainly for tests.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<BTreeMap<ArtifactKey, Vec<u8>>>,
    latest: Mutex<Option<ArtifactKey>>,
}

impl MemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.lock().map_or(0, |map| map.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, key: &ArtifactKey) -> Result<Option<Artifact>, StoreError> {
        let map = self
            .artifacts
            .lock()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        map.get(key)
            .map(|bytes| rmp_serde::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string())))
            .transpose()
    }

    fn save(&self, key: &ArtifactKey, artifact: &Artifact) -> Result<(), StoreError> {
        let bytes =
            rmp_serde::to_vec_named(artifact).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.artifacts
            .lock()
            .map_err(|e| StoreError::Encode(e.to_string()))?
            .insert(key.clone(), bytes);
        *self
            .latest
            .lock()
            .map_err(|e| StoreError::Encode(e.to_string()))? = Some(key.clone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<Artifact>, StoreError> {
        let key = self
            .latest
            .lock()
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .clone();
        key.map_or(Ok(None), |key| self.load(&key))
    }
}
