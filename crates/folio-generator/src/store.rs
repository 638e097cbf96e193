//! Source document lookup.

use std::{
    fs,
    path::{Path, PathBuf},
};

use folio_core::{
    Document,
    document::{identifier_from_path, identifier_to_relative_path},
};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists for the identifier.
    #[error("document not found: {identifier}")]
    NotFound { identifier: String },

    /// The identifier would escape the content directory.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// Filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Resolves identifiers to source documents.
pub trait DocumentStore: Send + Sync {
    /// Load the document for `identifier`.
    fn resolve(&self, identifier: &str) -> Result<Document>;

    /// Whether a document exists for `identifier`.
    fn exists(&self, identifier: &str) -> bool;

    /// Every identifier in the store, sorted.
    fn identifiers(&self) -> Result<Vec<String>>;
}

/// Documents stored as files under a content directory.
///
/// `blog/post` resolves to `blog/post.<ext>`, or to `blog/post/index.<ext>`
/// when the former does not exist.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
    extension: String,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, identifier: &str) -> Result<Option<PathBuf>> {
        let relative = identifier_to_relative_path(identifier, &self.extension)
            .map_err(|_| StoreError::InvalidIdentifier(identifier.to_string()))?;
        let direct = self.root.join(relative);
        if direct.is_file() {
            return Ok(Some(direct));
        }
        let index = self
            .root
            .join(identifier)
            .join(format!("index.{}", self.extension));
        Ok(index.is_file().then_some(index))
    }
}

impl DocumentStore for FsDocumentStore {
    fn resolve(&self, identifier: &str) -> Result<Document> {
        let path = self.locate(identifier)?.ok_or_else(|| StoreError::NotFound {
            identifier: identifier.to_string(),
        })?;
        let source = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(identifier, path = %path.display(), "resolved document");
        Ok(Document::new(identifier, source))
    }

    fn exists(&self, identifier: &str) -> bool {
        matches!(self.locate(identifier), Ok(Some(_)))
    }

    fn identifiers(&self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| StoreError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
                source: e.into(),
            })?;
            let path = entry.path();
            let matches_extension = path.extension().is_some_and(|ext| ext == self.extension.as_str());
            if !entry.file_type().is_file() || !matches_extension {
                continue;
            }
            if let Some(identifier) = identifier_from_path(&self.root, path) {
                identifiers.push(identifier);
            }
        }
        identifiers.sort();
        identifiers.dedup();
        Ok(identifiers)
    }
}
