//! Backing storage for artifact documents
//!
//! A [`BlobStorage`] decides where new documents go; each stored document
//! is then reachable only through the [`BlobHandle`] the store keeps in its
//! entry. Destroying a handle whose bytes are already gone is a no-op.

use crate::config::{StorageBackendKind, StorageConfig};
use crate::error::{Error, Result};
use super::types::DOCUMENT_EXTENSION;
use bytes::Bytes;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Where new artifact documents are written
#[derive(Debug, Clone)]
pub enum BlobStorage {
    /// Keep documents in process memory
    Memory,
    /// Write one file per document under `dir`
    Disk { dir: PathBuf },
}

/// Physical location of one stored document
#[derive(Debug, Clone)]
pub enum BlobHandle {
    Memory(Bytes),
    Disk(PathBuf),
}

impl BlobStorage {
    /// Select the backend named in the storage configuration
    pub fn from_config(config: &StorageConfig) -> Self {
        match config.backend {
            StorageBackendKind::Memory => Self::Memory,
            StorageBackendKind::Disk => Self::Disk {
                dir: config.base_dir.clone(),
            },
        }
    }

    /// Create the storage directory and remove documents orphaned by a
    /// previous process. Returns the number of files removed.
    pub async fn prepare(&self) -> Result<usize> {
        let Self::Disk { dir } = self else {
            return Ok(0);
        };

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| storage_error("create storage directory", dir, e))?;

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| storage_error("list storage directory", dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("list storage directory", dir, e))?
        {
            let path = entry.path();
            let owned = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_artifact_file_name);
            if !owned {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove orphaned artifact {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            tracing::info!(count = removed, dir = %dir.display(), "Removed orphaned artifact files");
        }
        Ok(removed)
    }

    /// Store `bytes` under `file_name`, returning the handle to read it back
    pub async fn write(&self, file_name: &str, bytes: Bytes) -> Result<BlobHandle> {
        match self {
            Self::Memory => Ok(BlobHandle::Memory(bytes)),
            Self::Disk { dir } => {
                let path = dir.join(file_name);
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| storage_error("write artifact", &path, e))?;
                Ok(BlobHandle::Disk(path))
            }
        }
    }
}

impl BlobHandle {
    /// Copy of the stored document
    pub async fn read(&self) -> Result<Bytes> {
        match self {
            Self::Memory(bytes) => Ok(bytes.clone()),
            Self::Disk(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| storage_error("read artifact", path, e)),
        }
    }

    /// Free the stored document. Already-freed storage is not an error.
    pub async fn destroy(&self) -> Result<()> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Disk(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(storage_error("delete artifact", path, e)),
            },
        }
    }
}

/// Whether `file_name` has the `{stem}_{id}.rbxm` shape of a stored artifact
fn is_artifact_file_name(file_name: &str) -> bool {
    static OWNED: OnceLock<Option<Regex>> = OnceLock::new();
    match OWNED.get_or_init(|| {
        Regex::new(&format!(r"^[A-Za-z0-9_]*_[0-9]+\.{}$", DOCUMENT_EXTENSION)).ok()
    }) {
        Some(re) => re.is_match(file_name),
        None => false,
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::StorageFailure(format!("Failed to {} {}: {}", action, path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let storage = BlobStorage::Memory;
        let handle = storage.write("a.rbxm", Bytes::from_static(b"<roblox/>")).await.unwrap();
        assert_eq!(handle.read().await.unwrap(), Bytes::from_static(b"<roblox/>"));
        handle.destroy().await.unwrap();
        handle.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn test_disk_round_trip_and_idempotent_destroy() {
        let dir = TempDir::new().unwrap();
        let storage = BlobStorage::Disk {
            dir: dir.path().to_path_buf(),
        };
        storage.prepare().await.unwrap();

        let handle = storage.write("wave_1.rbxm", Bytes::from_static(b"doc")).await.unwrap();
        assert!(dir.path().join("wave_1.rbxm").exists());
        assert_eq!(handle.read().await.unwrap(), Bytes::from_static(b"doc"));

        handle.destroy().await.unwrap();
        assert!(!dir.path().join("wave_1.rbxm").exists());
        tokio_test::assert_ok!(handle.destroy().await);

        let err = handle.read().await.unwrap_err();
        assert!(matches!(err, Error::StorageFailure(_)));
    }

    #[tokio::test]
    async fn test_prepare_removes_orphans_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("old_1.rbxm"), "x").unwrap();
        std::fs::write(dir.path().join("Wave_Hello_1718000000123.rbxm"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        std::fs::write(dir.path().join("character.rbxm"), "keep").unwrap();
        std::fs::write(dir.path().join("My Model_12.rbxm"), "keep").unwrap();
        std::fs::write(dir.path().join("rig_v2b.rbxm"), "keep").unwrap();

        let storage = BlobStorage::Disk {
            dir: dir.path().join("."),
        };
        assert_eq!(storage.prepare().await.unwrap(), 2);
        assert!(!dir.path().join("old_1.rbxm").exists());
        assert!(!dir.path().join("Wave_Hello_1718000000123.rbxm").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("character.rbxm").exists());
        assert!(dir.path().join("My Model_12.rbxm").exists());
        assert!(dir.path().join("rig_v2b.rbxm").exists());
    }

    #[test]
    fn test_artifact_file_name_shape() {
        assert!(is_artifact_file_name("Wave_17.rbxm"));
        assert!(is_artifact_file_name("_17.rbxm"));
        assert!(!is_artifact_file_name("Wave.rbxm"));
        assert!(!is_artifact_file_name("Wave_17.rbxmx"));
        assert!(!is_artifact_file_name("Wave_17a.rbxm"));
    }

    #[tokio::test]
    async fn test_prepare_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = BlobStorage::Disk { dir: nested.clone() };
        assert_eq!(storage.prepare().await.unwrap(), 0);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_from_config() {
        let mut config = StorageConfig::default();
        assert!(matches!(BlobStorage::from_config(&config), BlobStorage::Memory));
        config.backend = StorageBackendKind::Disk;
        assert!(matches!(
            BlobStorage::from_config(&config),
            BlobStorage::Disk { .. }
        ));
    }
}
