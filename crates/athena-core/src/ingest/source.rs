//! Corpus source port.

use athena_types::corpus::DocumentSource;
use athena_types::error::IngestionError;

/// Where raw documents come from. The directory-backed implementation
/// lives in athena-infra.
pub trait CorpusSource: Send + Sync {
    /// Read every document. An unreadable document fails the whole load
    /// with [`IngestionError::Unreadable`].
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<DocumentSource>, IngestionError>> + Send;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// An in-memory corpus.
impl CorpusSource for Vec<DocumentSource> {
    async fn load(&self) -> Result<Vec<DocumentSource>, IngestionError> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory documents", self.len())
    }
}
