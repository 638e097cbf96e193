//! Compiled artifact cache.
//!
//! Each artifact is stored at `<root>/<backend>/<identifier>.json` as one JSON
//! object: every metadata field, followed by `code`. Writes go to a temporary
//! file in the target directory and are renamed into place, so a reader only
//! ever sees complete entries.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use folio_core::{CompileStrategy, Metadata, MetadataSchema, document::identifier_to_relative_path};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::compiler::CompiledArtifact;

/// Key holding the artifact code in a cache record.
const CODE_KEY: &str = "code";

const EXTENSION: &str = "json";

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry exists for the identifier.
    #[error("no cache entry for `{identifier}`")]
    NotFound { identifier: String },

    /// The entry exists but does not have the expected shape.
    #[error("corrupt cache entry for `{identifier}`: {message}")]
    CorruptEntry { identifier: String, message: String },

    /// The identifier would escape the cache directory.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// Metadata uses the key reserved for the artifact code.
    #[error("metadata field `{CODE_KEY}` is reserved for the artifact code")]
    ReservedField,

    /// Filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record could not be serialized.
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Storage handle for one backend's artifacts.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    backend: String,
    strategy: CompileStrategy,
    schema: MetadataSchema,
}

impl CacheStore {
    /// Create a store for `backend` under `root`.
    ///
    /// `strategy` and `schema` describe what the backend writes, so entries
    /// can be read back into typed artifacts.
    pub fn new(
        root: impl AsRef<Path>,
        backend: impl Into<String>,
        strategy: CompileStrategy,
        schema: MetadataSchema,
    ) -> Self {
        let backend = backend.into();
        Self {
            dir: root.as_ref().join(&backend),
            backend,
            strategy,
            schema,
        }
    }

    /// Directory holding this backend's entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Location of the entry for `identifier`.
    pub fn entry_path(&self, identifier: &str) -> Result<PathBuf> {
        let relative = identifier_to_relative_path(identifier, EXTENSION)
            .map_err(|_| CacheError::InvalidIdentifier(identifier.to_string()))?;
        Ok(self.dir.join(relative))
    }

    /// Write an artifact, replacing any previous entry.
    pub fn write(&self, artifact: &CompiledArtifact) -> Result<PathBuf> {
        if artifact.metadata.contains(CODE_KEY) {
            return Err(CacheError::ReservedField);
        }

        let path = self.entry_path(&artifact.identifier)?;
        let parent = path.parent().unwrap_or(&self.dir);
        fs::create_dir_all(parent).map_err(io_error(parent))?;

        let mut record = match serde_json::to_value(&artifact.metadata)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        record.insert(CODE_KEY.to_string(), serde_json::Value::String(artifact.code.clone()));
        let bytes = serde_json::to_vec(&record)?;

        // The temp file is removed on drop unless it is persisted.
        let mut file = NamedTempFile::new_in(parent).map_err(io_error(parent))?;
        file.write_all(&bytes).map_err(io_error(file.path()))?;
        file.persist(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        debug!(
            backend = %self.backend,
            identifier = %artifact.identifier,
            path = %path.display(),
            bytes = bytes.len(),
            "wrote cache entry"
        );
        Ok(path)
    }

    /// Read the entry for `identifier` back into an artifact.
    pub fn read(&self, identifier: &str) -> Result<CompiledArtifact> {
        let path = self.entry_path(identifier)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound {
                    identifier: identifier.to_string(),
                });
            }
            Err(e) => return Err(io_error(&path)(e)),
        };

        let corrupt = |message: String| CacheError::CorruptEntry {
            identifier: identifier.to_string(),
            message,
        };

        let record: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        let serde_json::Value::Object(record) = record else {
            return Err(corrupt("record is not an object".to_string()));
        };
        let code = record
            .get(CODE_KEY)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| corrupt(format!("missing string field `{CODE_KEY}`")))?
            .to_string();
        let metadata = Metadata::from_json_object(&record, &self.schema, &[CODE_KEY]).map_err(corrupt)?;

        Ok(CompiledArtifact {
            identifier: identifier.to_string(),
            metadata,
            strategy: self.strategy,
            code,
        })
    }

    /// Whether an entry exists for `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entry_path(identifier).is_ok_and(|path| path.is_file())
    }

    /// Remove the entry for `identifier`. Returns whether one existed.
    pub fn remove(&self, identifier: &str) -> Result<bool> {
        let path = self.entry_path(identifier)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    /// Identifiers of every stored entry, sorted.
    pub fn identifiers(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut identifiers = Vec::new();
        for entry in WalkDir::new(&self.dir) {
            let entry = entry.map_err(|e| CacheError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| self.dir.clone()),
                source: e.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.dir) else {
                continue;
            };
            let identifier = relative.with_extension("").to_string_lossy().replace('\\', "/");
            identifiers.push(identifier);
        }
        identifiers.sort();
        Ok(identifiers)
    }
}
