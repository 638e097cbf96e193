//! Build orchestration.
//!
//! Runs the pipeline over many documents in parallel. Documents are
//! independent, so one failure never stops the others.

use std::time::Instant;

use folio_core::Document;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cache::CacheStore,
    pipeline::{Pipeline, PipelineError, RunOutput},
    store::{DocumentStore, StoreError},
    transform::Diagnostic,
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The document store could not be listed.
    #[error("document store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of documents attempted.
    pub documents: usize,

    /// Number of cache entries written.
    pub written: usize,

    /// Number of documents that failed.
    pub failed: usize,

    /// Number of warnings raised.
    pub warnings: usize,

    /// Every warning and error, ordered by identifier.
    pub diagnostics: Vec<Diagnostic>,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildStats {
    /// Whether every document compiled.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs one backend's pipeline over a document store.
pub struct Builder<'a> {
    pipeline: &'a Pipeline,
    store: &'a dyn DocumentStore,
    cache: Option<&'a CacheStore>,
}

impl<'a> Builder<'a> {
    /// Create a builder that compiles without writing anything.
    #[must_use]
    pub fn new(pipeline: &'a Pipeline, store: &'a dyn DocumentStore) -> Self {
        Self {
            pipeline,
            store,
            cache: None,
        }
    }

    /// Write every compiled artifact to `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: &'a CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build every document in the store.
    pub fn build_all(&self) -> Result<BuildStats> {
        let identifiers = self.store.identifiers()?;
        Ok(self.build(&identifiers))
    }

    /// Build the given documents.
    pub fn build(&self, identifiers: &[String]) -> BuildStats {
        let start = Instant::now();

        info!(
            backend = self.pipeline.backend(),
            count = identifiers.len(),
            cache = self.cache.is_some(),
            "starting build"
        );

        let results: Vec<(&String, std::result::Result<RunOutput, Diagnostic>)> = identifiers
            .par_iter()
            .map(|identifier| (identifier, self.build_one(identifier)))
            .collect();

        let mut stats = BuildStats {
            documents: identifiers.len(),
            ..BuildStats::default()
        };
        for (identifier, result) in results {
            match result {
                Ok(output) => {
                    if self.cache.is_some() {
                        stats.written += 1;
                    }
                    stats.warnings += output.diagnostics.len();
                    stats.diagnostics.extend(output.diagnostics);
                }
                Err(diagnostic) => {
                    warn!(identifier = %identifier, error = %diagnostic, "failed to compile document");
                    stats.failed += 1;
                    stats.diagnostics.push(diagnostic);
                }
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = stats.documents,
            written = stats.written,
            failed = stats.failed,
            warnings = stats.warnings,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        stats
    }

    fn build_one(&self, identifier: &str) -> std::result::Result<RunOutput, Diagnostic> {
        let document: Document = self
            .store
            .resolve(identifier)
            .map_err(|e| Diagnostic::error("store", e.to_string()).for_document(identifier))?;

        let result = match self.cache {
            Some(cache) => self.pipeline.run_and_store(&document, cache),
            None => self.pipeline.run(&document),
        };
        result
            .inspect(|output| debug!(identifier, warnings = output.diagnostics.len(), "built document"))
            .map_err(|e: PipelineError| e.to_diagnostic(identifier))
    }
}
