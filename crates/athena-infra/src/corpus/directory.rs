//! Plain-text corpus directory.
//!
//! Every `*.txt` file directly inside the directory is one document, named
//! by its file name. Files are read in name order so repeated ingestion of
//! an unchanged directory yields the same chunk ids.

use std::path::{Path, PathBuf};

use athena_core::ingest::CorpusSource;
use athena_types::corpus::DocumentSource;
use athena_types::error::IngestionError;

#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    dir: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths of the `.txt` files, sorted by file name.
    async fn text_files(&self) -> Result<Vec<PathBuf>, IngestionError> {
        let unreadable = |e: std::io::Error| IngestionError::Unreadable {
            source_name: self.dir.display().to_string(),
            message: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(unreadable)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let path = entry.path();
            let is_txt = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
            if is_txt && entry.file_type().await.map_err(unreadable)?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl CorpusSource for DirectoryCorpus {
    async fn load(&self) -> Result<Vec<DocumentSource>, IngestionError> {
        let mut documents = Vec::new();
        for path in self.text_files().await? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| IngestionError::Unreadable {
                    source_name: name.clone(),
                    message: e.to_string(),
                })?;
            let text = String::from_utf8(bytes).map_err(|e| IngestionError::Unreadable {
                source_name: name.clone(),
                message: format!("not valid UTF-8: {e}"),
            })?;

            tracing::debug!(source = %name, bytes = text.len(), "Read corpus document");
            documents.push(DocumentSource::new(name, text));
        }
        Ok(documents)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
