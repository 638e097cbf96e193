//! Artifact compilation.

use folio_core::{CompileStrategy, Metadata, Node};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    html,
    template::{Template, TemplateError},
};

/// Compilation errors.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The tree could not be serialized.
    #[error("failed to serialize tree: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The emitted template is not well formed.
    #[error("emitted template is invalid: {0}")]
    Template(#[from] TemplateError),
}

/// Result type for compile operations.
pub type Result<T> = std::result::Result<T, CompileError>;

/// The compiled form of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledArtifact {
    pub identifier: String,
    pub metadata: Metadata,
    pub strategy: CompileStrategy,
    /// Opaque code handed to the presentation layer.
    pub code: String,
}

/// Turns a final tree into artifact code.
#[derive(Debug, Clone, Copy)]
pub struct Compiler {
    strategy: CompileStrategy,
}

impl Compiler {
    pub fn new(strategy: CompileStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> CompileStrategy {
        self.strategy
    }

    /// Compile the tree and pair it with its metadata.
    pub fn compile(&self, identifier: &str, metadata: Metadata, tree: &Node) -> Result<CompiledArtifact> {
        let code = match self.strategy {
            CompileStrategy::Precompiled => {
                let code = html::emit(tree);
                Template::parse(&code)?;
                code
            }
            CompileStrategy::OnDemand => serde_json::to_string(tree)?,
        };
        debug!(identifier, strategy = ?self.strategy, bytes = code.len(), "compiled artifact");

        Ok(CompiledArtifact {
            identifier: identifier.to_string(),
            metadata,
            strategy: self.strategy,
            code,
        })
    }
}
