//! The per-document compilation pipeline.
//!
//! extract → validate → build tree → Phase A → render → Phase B → compile,
//! then optionally write to the cache. A run is independent of every other
//! run, so one pipeline may serve many threads.

use std::time::Instant;

use folio_core::{
    BackendConfig, Config, CoreError, Document, MetaValue, MetadataSchema, Phase,
    document::derive_slug,
    metadata::extract,
};
use folio_parser::{ParserError, TreeBuilder};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    cache::{CacheError, CacheStore},
    compiler::{CompileError, CompiledArtifact, Compiler},
    render::{GenericRenderer, RenderError, StructuralRenderer},
    transform::{Diagnostic, StageContext, TransformChain, TransformFailed},
};

/// Why a document failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The metadata header could not be read or failed its schema.
    #[error(transparent)]
    Metadata(CoreError),

    /// The body could not be built into a tree.
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// A transform stage failed.
    #[error(transparent)]
    Transform(#[from] TransformFailed),

    /// The generic renderer failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The final tree could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The artifact could not be cached.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PipelineError {
    /// The step that failed, as reported in diagnostics.
    pub fn stage(&self) -> &str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::Parse(_) => "tree-builder",
            Self::Transform(failed) => &failed.stage,
            Self::Render(_) => "render",
            Self::Compile(_) => "compile",
            Self::Cache(_) => "cache",
        }
    }

    /// Structured diagnostic for a failed document.
    pub fn to_diagnostic(&self, identifier: &str) -> Diagnostic {
        let message = match self {
            Self::Transform(failed) => failed.cause.to_string(),
            other => other.to_string(),
        };
        Diagnostic::error(self.stage(), message).for_document(identifier)
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// A successful run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub artifact: CompiledArtifact,
    /// Warnings raised along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// One backend's pipeline.
#[derive(Debug)]
pub struct Pipeline {
    backend: String,
    schema: MetadataSchema,
    tree_builder: TreeBuilder,
    pre: TransformChain,
    renderer: Box<dyn GenericRenderer>,
    post: TransformChain,
    compiler: Compiler,
}

impl Pipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(
        backend: impl Into<String>,
        schema: MetadataSchema,
        pre: TransformChain,
        post: TransformChain,
        compiler: Compiler,
    ) -> folio_core::Result<Self> {
        if pre.phase() != Phase::Pre || post.phase() != Phase::Post {
            return Err(CoreError::config("transform chains passed in the wrong order"));
        }
        Ok(Self {
            backend: backend.into(),
            schema,
            tree_builder: TreeBuilder::new(),
            pre,
            renderer: Box::new(StructuralRenderer::new()),
            post,
            compiler,
        })
    }

    /// Build the pipeline for a configured backend.
    pub fn from_config(config: &Config, backend: &str) -> folio_core::Result<Self> {
        let backend_config = config.backend(backend)?;
        Self::from_backend(config, backend, backend_config)
    }

    fn from_backend(config: &Config, name: &str, backend: &BackendConfig) -> folio_core::Result<Self> {
        let pipeline = Self::new(
            name,
            config.schema_for(backend),
            TransformChain::from_configs(Phase::Pre, &backend.pre)?,
            TransformChain::from_configs(Phase::Post, &backend.post)?,
            Compiler::new(backend.strategy),
        )?;
        debug!(
            backend = name,
            pre = ?pipeline.pre.stage_names(),
            post = ?pipeline.post.stage_names(),
            "assembled pipeline"
        );
        Ok(pipeline)
    }

    /// Replace the tree builder, e.g. to register extra recognizers.
    #[must_use]
    pub fn with_tree_builder(mut self, tree_builder: TreeBuilder) -> Self {
        self.tree_builder = tree_builder;
        self
    }

    /// Replace the generic renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl GenericRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn schema(&self) -> &MetadataSchema {
        &self.schema
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Cache handle matching this pipeline's backend, strategy and schema.
    pub fn cache_store(&self, root: impl AsRef<std::path::Path>) -> CacheStore {
        CacheStore::new(root, &self.backend, self.compiler.strategy(), self.schema.clone())
    }

    /// Compile one document without writing it anywhere.
    pub fn run(&self, document: &Document) -> Result<RunOutput> {
        let start = Instant::now();
        let identifier = document.identifier();

        let extracted = extract(document.raw_source(), &self.schema).map_err(PipelineError::Metadata)?;
        let mut metadata = extracted.metadata;
        self.schema
            .validate(&metadata, extracted.header_end_line)
            .map_err(PipelineError::Metadata)?;

        let mut diagnostics: Vec<Diagnostic> = self
            .schema
            .missing_optional(&metadata)
            .into_iter()
            .map(|field| Diagnostic::warning(format!("missing optional field `{field}`")))
            .collect();
        metadata.append("slug", MetaValue::String(derive_slug(identifier)));

        let mut tree = self.tree_builder.build(&extracted.body)?;

        let mut ctx = StageContext::new();
        self.pre.execute(&mut tree, &mut ctx)?;
        let mut tree = self.renderer.render(tree)?;
        self.post.execute(&mut tree, &mut ctx)?;

        let artifact = self.compiler.compile(identifier, metadata, &tree)?;

        diagnostics.extend(ctx.into_diagnostics());
        let diagnostics: Vec<Diagnostic> = diagnostics
            .into_iter()
            .map(|d| d.for_document(identifier))
            .collect();

        debug!(
            backend = %self.backend,
            identifier,
            warnings = diagnostics.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "compiled document"
        );
        Ok(RunOutput {
            artifact,
            diagnostics,
        })
    }

    /// Compile one document and write it to `cache`.
    ///
    /// Nothing is written when any step fails.
    pub fn run_and_store(&self, document: &Document, cache: &CacheStore) -> Result<RunOutput> {
        let output = self.run(document)?;
        let path = cache.write(&output.artifact)?;
        info!(
            backend = %self.backend,
            identifier = document.identifier(),
            path = %path.display(),
            "cached document"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use folio_core::{CompileStrategy, StageConfig};
    use tempfile::TempDir;

    use super::*;
    use crate::transform::StageError;

    const SAMPLE: &str = "---\ntitle: \"Sample\"\ndate: 2023-01-01\n---\n\n# Intro\n\nHello[^n].\n\n[^n]: A note.\n";

    fn pipeline(backend: &str) -> Pipeline {
        Pipeline::from_config(&Config::default(), backend).unwrap()
    }

    #[test]
    fn test_run_adds_slug_and_warnings() {
        let output = pipeline("mdx-bundler").run(&Document::new("Sample Post", SAMPLE)).unwrap();

        assert_eq!(output.artifact.metadata.get_str("slug"), Some("sample-post"));
        assert_eq!(output.artifact.metadata.keys().last(), Some("slug"));
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.message == "missing optional field `tags`" && d.identifier.as_deref() == Some("Sample Post")));
    }

    #[test]
    fn test_header_slug_is_replaced_and_moved_last() {
        let doc = Document::new(
            "notes/Hello World",
            "---\nslug: mine\ntitle: T\ndate: 2023-01-01\n---\nbody\n",
        );
        let output = pipeline("mdx-bundler").run(&doc).unwrap();

        assert_eq!(
            output.artifact.metadata.keys().collect::<Vec<_>>(),
            vec!["title", "date", "slug"]
        );
        assert_eq!(output.artifact.metadata.get_str("slug"), Some("notes/hello-world"));
    }

    #[test]
    fn test_missing_required_field() {
        let doc = Document::new("x", "---\ntitle: Only title\n---\nbody\n");
        let err = pipeline("mdx-bundler").run(&doc).unwrap_err();

        assert!(matches!(err, PipelineError::Metadata(CoreError::MalformedMetadata { line: 3, .. })));
        assert_eq!(err.stage(), "metadata");
    }

    #[test]
    fn test_strict_backend_rejects_unknown_fields() {
        let doc = Document::new("x", "---\ntitle: T\ndate: 2023-01-01\nmood: happy\n---\nbody\n");
        assert!(pipeline("mdx-bundler").run(&doc).is_ok());
        assert!(matches!(
            pipeline("contentlayer").run(&doc),
            Err(PipelineError::Metadata(CoreError::MalformedMetadata { line: 4, .. }))
        ));
    }

    #[test]
    fn test_stage_failure_writes_nothing() {
        let mut config = Config::default();
        let backend = config.backends.get_mut("mdx-bundler").unwrap();
        backend.post = vec![StageConfig::Highlight { strict: true }];

        let pipeline = Pipeline::from_config(&config, "mdx-bundler").unwrap();
        let dir = TempDir::new().unwrap();
        let cache = pipeline.cache_store(dir.path());
        let doc = Document::new(
            "broken",
            "---\ntitle: T\ndate: 2023-01-01\n---\n```klingon\nqapla'\n```\n",
        );

        let err = pipeline.run_and_store(&doc, &cache).unwrap_err();
        let PipelineError::Transform(failed) = &err else {
            panic!("expected a transform failure, got {err:?}");
        };
        assert_eq!(failed.stage, "highlight");
        assert!(matches!(failed.cause, StageError::UnsupportedLanguage { .. }));
        assert!(!cache.contains("broken"));

        let diagnostic = err.to_diagnostic("broken");
        assert_eq!(diagnostic.stage.as_deref(), Some("highlight"));
        assert_eq!(diagnostic.identifier.as_deref(), Some("broken"));
    }

    #[test]
    fn test_unknown_backend() {
        assert!(Pipeline::from_config(&Config::default(), "gatsby").is_err());
    }

    #[test]
    fn test_strategy_follows_backend() {
        assert_eq!(pipeline("next-mdx-remote").compiler().strategy(), CompileStrategy::OnDemand);
        assert_eq!(pipeline("contentlayer").compiler().strategy(), CompileStrategy::Precompiled);
    }
}
