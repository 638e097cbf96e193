//! Pipeline configuration management.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    metadata::{FieldSpec, MetadataSchema},
};

/// Main configuration structure for Folio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where source documents live.
    #[serde(default)]
    pub content: ContentConfig,

    /// Where compiled artifacts are cached.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Metadata schema settings.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Compilation backends by name.
    #[serde(default = "default_backends")]
    pub backends: BTreeMap<String, BackendConfig>,
}

/// Content location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory holding the documents; identifiers are relative to it.
    #[serde(default = "default_content_dir")]
    pub dir: String,

    /// File extension of source documents.
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Cache location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory; each backend writes to its own subdirectory.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

/// Metadata schema settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Reject header fields the schema does not declare.
    #[serde(default)]
    pub strict: bool,

    /// Extra fields declared on top of the blog schema.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// How a backend turns the final tree into artifact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileStrategy {
    /// Ready-to-invoke template produced at build time.
    Precompiled,
    /// Serialized tree hydrated by the presentation layer before first use.
    OnDemand,
}

/// The two transform phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Runs on the source tree, before the generic renderer.
    Pre,
    /// Runs on the rendered tree.
    Post,
}

/// Intrinsic size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A configured transform stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum StageConfig {
    /// Turn captioned code fences into titled code blocks.
    CodeTitle,

    /// Number, cross-link and collect footnotes.
    Footnotes {
        /// Accept `^[...]` inline notes, numbered like any other footnote.
        #[serde(default = "default_true")]
        inline_notes: bool,

        /// Render short definitions at the point of reference.
        #[serde(default)]
        inline_short: bool,

        /// Longest definition text (in characters) rendered inline.
        #[serde(default = "default_inline_max_len")]
        inline_max_len: usize,
    },

    /// Turn images into sized, embeddable components.
    ImageComponent {
        /// Known sizes by image url.
        #[serde(default)]
        dimensions: BTreeMap<String, ImageSize>,
    },

    /// Give headings unique ids.
    HeadingSlug,

    /// Tokenize code blocks into highlighted spans.
    Highlight {
        /// Fail on unknown languages instead of leaving them plain.
        #[serde(default)]
        strict: bool,
    },

    /// Structural clean-up of the rendered tree.
    Minify,
}

impl StageConfig {
    /// Stage name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CodeTitle => "code-title",
            Self::Footnotes { .. } => "footnotes",
            Self::ImageComponent { .. } => "image-component",
            Self::HeadingSlug => "heading-slug",
            Self::Highlight { .. } => "highlight",
            Self::Minify => "minify",
        }
    }

    /// The phase this stage belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            Self::CodeTitle | Self::Footnotes { .. } | Self::ImageComponent { .. } => Phase::Pre,
            Self::HeadingSlug | Self::Highlight { .. } | Self::Minify => Phase::Post,
        }
    }

    /// Footnotes with default options.
    pub fn footnotes() -> Self {
        Self::Footnotes {
            inline_notes: true,
            inline_short: false,
            inline_max_len: default_inline_max_len(),
        }
    }

    /// Image components with no known sizes.
    pub fn image_component() -> Self {
        Self::ImageComponent {
            dimensions: BTreeMap::new(),
        }
    }
}

/// A compilation backend: strategy plus stage chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Compilation strategy.
    pub strategy: CompileStrategy,

    /// Override of `metadata.strict` for this backend.
    #[serde(default)]
    pub strict_metadata: Option<bool>,

    /// Phase A stages, in order.
    #[serde(default)]
    pub pre: Vec<StageConfig>,

    /// Phase B stages, in order.
    #[serde(default)]
    pub post: Vec<StageConfig>,
}

impl BackendConfig {
    /// Backend with the standard stage chain.
    pub fn standard(strategy: CompileStrategy) -> Self {
        Self {
            strategy,
            strict_metadata: None,
            pre: vec![
                StageConfig::CodeTitle,
                StageConfig::footnotes(),
                StageConfig::image_component(),
            ],
            post: vec![
                StageConfig::HeadingSlug,
                StageConfig::Highlight { strict: false },
                StageConfig::Minify,
            ],
        }
    }
}

// Default value functions
fn default_content_dir() -> String {
    "data/blog".to_string()
}

fn default_extension() -> String {
    "mdx".to_string()
}

fn default_cache_dir() -> String {
    "public/posts".to_string()
}

fn default_inline_max_len() -> usize {
    80
}

fn default_true() -> bool {
    true
}

fn default_backends() -> BTreeMap<String, BackendConfig> {
    let mut backends = BTreeMap::new();

    let mut bundler = BackendConfig::standard(CompileStrategy::Precompiled);
    bundler.pre = vec![
        StageConfig::footnotes(),
        StageConfig::CodeTitle,
        StageConfig::image_component(),
    ];
    bundler.post = vec![
        StageConfig::Highlight { strict: false },
        StageConfig::HeadingSlug,
        StageConfig::Minify,
    ];
    backends.insert("mdx-bundler".to_string(), bundler);

    backends.insert(
        "next-mdx-remote".to_string(),
        BackendConfig::standard(CompileStrategy::OnDemand),
    );

    let mut contentlayer = BackendConfig::standard(CompileStrategy::Precompiled);
    contentlayer.strict_metadata = Some(true);
    backends.insert("contentlayer".to_string(), contentlayer);

    backends
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
            extension: default_extension(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content: ContentConfig::default(),
            cache: CacheConfig::default(),
            metadata: MetadataConfig::default(),
            backends: default_backends(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the config crate, with `FOLIO__` env overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.content.extension.trim_start_matches('.').is_empty() {
            return Err(CoreError::config("content.extension cannot be empty"));
        }

        if self.backends.is_empty() {
            return Err(CoreError::config("at least one backend must be configured"));
        }

        for (name, backend) in &self.backends {
            for (phase, stages) in [(Phase::Pre, &backend.pre), (Phase::Post, &backend.post)] {
                if let Some(stage) = stages.iter().find(|s| s.phase() != phase) {
                    return Err(CoreError::config(format!(
                        "backend `{name}`: stage `{}` cannot run in the {phase:?} phase",
                        stage.name()
                    )));
                }
            }

            if backend.post.is_empty() {
                tracing::warn!(backend = %name, "backend has no post-render stages");
            }
        }

        Ok(())
    }

    /// Look up a backend by name.
    pub fn backend(&self, name: &str) -> Result<&BackendConfig> {
        self.backends.get(name).ok_or_else(|| {
            CoreError::config(format!(
                "unknown backend `{name}` (available: {})",
                self.backends.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// The metadata schema a backend validates against.
    pub fn schema_for(&self, backend: &BackendConfig) -> MetadataSchema {
        let strict = backend.strict_metadata.unwrap_or(self.metadata.strict);
        self.metadata
            .fields
            .iter()
            .cloned()
            .fold(MetadataSchema::blog(), MetadataSchema::with_field)
            .with_strict(strict)
    }
}
