//! File-backed [`IndexRepository`].
//!
//! Layout under the index directory:
//!
//! ```text
//! {index_dir}/
//!   vectors.bin
//!   manifest.json
//! ```
//!
//! Each file is written to a `.tmp` sibling and renamed into place. The
//! manifest is renamed last and carries the checksum of `vectors.bin`, so a
//! save interrupted between the two renames is detected as corruption on
//! the next load rather than served as a mismatched index.

use std::path::{Path, PathBuf};

use athena_core::index::{EmbeddingIndex, IndexRepository};
use athena_types::error::IndexError;

use super::codec::{self, MANIFEST_FILE, Manifest, VECTORS_FILE};

#[derive(Debug, Clone)]
pub struct FileIndexRepository {
    dir: PathBuf,
}

impl FileIndexRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Read just the manifest, without the vectors. `Ok(None)` if absent.
    pub async fn read_manifest(&self) -> Result<Option<Manifest>, IndexError> {
        let path = self.manifest_path();
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| IndexError::Corrupt(format!("unreadable {}: {e}", path.display())))
    }
}

impl IndexRepository for FileIndexRepository {
    async fn save(&self, index: &EmbeddingIndex) -> Result<(), IndexError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let (vectors, manifest) = codec::encode(index);
        let manifest = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| IndexError::Io(format!("failed to serialize manifest: {e}")))?;

        write_atomic(&self.vectors_path(), &vectors).await?;
        write_atomic(&self.manifest_path(), &manifest).await?;

        tracing::debug!(
            dir = %self.dir.display(),
            chunks = index.len(),
            bytes = vectors.len(),
            "Index saved"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<EmbeddingIndex>, IndexError> {
        let Some(manifest) = self.read_manifest().await? else {
            return Ok(None);
        };

        let path = self.vectors_path();
        let vectors = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::Corrupt(format!(
                    "manifest present but {} is missing",
                    path.display()
                )));
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        let index = codec::decode(&vectors, manifest)?;
        tracing::debug!(
            dir = %self.dir.display(),
            chunks = index.len(),
            generation = %index.generation(),
            "Index loaded"
        );
        Ok(Some(index))
    }

    async fn exists(&self) -> bool {
        tokio::fs::try_exists(self.manifest_path())
            .await
            .unwrap_or(false)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, e: std::io::Error) -> IndexError {
    IndexError::Io(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_types::corpus::EmbedderIdentity;
    use tempfile::TempDir;

    fn sample_index() -> EmbeddingIndex {
        let mut index = EmbeddingIndex::new(EmbedderIdentity {
            model: "test-embedder".into(),
            dimension: 2,
        });
        index.insert("a.txt", "alpha", vec![1.0, 0.0]).unwrap();
        index.insert("b.txt", "beta", vec![0.0, 1.0]).unwrap();
        index
    }

    #[tokio::test]
    async fn load_from_empty_dir_returns_none() {
        let tmp = TempDir::new().unwrap();
        let repo = FileIndexRepository::new(tmp.path().join("index"));
        assert!(!repo.exists().await);
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_restores_index() {
        let tmp = TempDir::new().unwrap();
        let repo = FileIndexRepository::new(tmp.path().join("index"));
        let index = sample_index();

        repo.save(&index).await.unwrap();
        assert!(repo.exists().await);
        assert!(!tmp.path().join("index/vectors.bin.tmp").exists());

        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(loaded.generation(), index.generation());
        assert_eq!(loaded.chunks(), index.chunks());
    }

    #[tokio::test]
    async fn save_replaces_previous_generation() {
        let tmp = TempDir::new().unwrap();
        let repo = FileIndexRepository::new(tmp.path());
        repo.save(&sample_index()).await.unwrap();

        let newer = sample_index();
        repo.save(&newer).await.unwrap();

        let manifest = repo.read_manifest().await.unwrap().unwrap();
        assert_eq!(manifest.generation, newer.generation());
    }

    #[tokio::test]
    async fn tampered_vectors_are_reported_corrupt() {
        let tmp = TempDir::new().unwrap();
        let repo = FileIndexRepository::new(tmp.path());
        repo.save(&sample_index()).await.unwrap();

        let path = tmp.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(repo.load().await, Err(IndexError::Corrupt(_))));
    }

    #[tokio::test]
    async fn missing_vector_file_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let repo = FileIndexRepository::new(tmp.path());
        repo.save(&sample_index()).await.unwrap();
        std::fs::remove_file(tmp.path().join(VECTORS_FILE)).unwrap();

        assert!(matches!(repo.load().await, Err(IndexError::Corrupt(_))));
    }

    #[tokio::test]
    async fn garbage_manifest_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_FILE), b"{not json").unwrap();
        let repo = FileIndexRepository::new(tmp.path());
        assert!(matches!(repo.load().await, Err(IndexError::Corrupt(_))));
    }
}
