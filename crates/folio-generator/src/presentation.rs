//! The presentation layer interface.
//!
//! A presentation layer invokes artifact code with props. Artifacts compiled
//! on demand must be hydrated once before they can be invoked.

use folio_core::{CompileStrategy, Node};
use thiserror::Error;

use crate::{
    compiler::CompiledArtifact,
    html,
    template::{Template, TemplateContext, TemplateError},
};

/// Presentation errors.
#[derive(Debug, Error)]
pub enum PresentationError {
    /// Serialized code is not a tree.
    #[error("cannot hydrate artifact: {0}")]
    Hydrate(#[from] serde_json::Error),

    /// The code failed to render.
    #[error("cannot invoke artifact: {0}")]
    Invoke(#[from] TemplateError),
}

/// Result type for presentation operations.
pub type Result<T> = std::result::Result<T, PresentationError>;

/// Turns artifact code into output.
pub trait Presentation {
    /// Turn serialized (on-demand) code into invokable code.
    fn hydrate(&self, serialized: &str) -> Result<String>;

    /// Invoke code with props.
    fn invoke(&self, code: &str, props: &TemplateContext) -> Result<String>;

    /// Present an artifact, hydrating it first when needed.
    ///
    /// Props start from the artifact's metadata; `props` override them.
    fn present(&self, artifact: &CompiledArtifact, props: &TemplateContext) -> Result<String> {
        let props = TemplateContext::from_metadata(&artifact.metadata).merged(props);
        match artifact.strategy {
            CompileStrategy::Precompiled => self.invoke(&artifact.code, &props),
            CompileStrategy::OnDemand => {
                let code = self.hydrate(&artifact.code)?;
                self.invoke(&code, &props)
            }
        }
    }
}

/// Reference presentation layer producing HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPresenter;

impl Presentation for HtmlPresenter {
    fn hydrate(&self, serialized: &str) -> Result<String> {
        let tree: Node = serde_json::from_str(serialized)?;
        Ok(html::emit(&tree))
    }

    /// Prop values are HTML-escaped before they are interpolated.
    fn invoke(&self, code: &str, props: &TemplateContext) -> Result<String> {
        let props = props.clone().map_values(html::escape);
        Ok(Template::parse(code)?.render(&props)?)
    }
}
