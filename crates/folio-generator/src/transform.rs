//! Transform chain infrastructure.
//!
//! - [`TransformStage`] - a named tree rewrite
//! - [`TransformChain`] - the ordered stages of one phase
//! - [`StageContext`] - the warning sink handed to every stage
//!
//! Stages see the tree, their own options and the context. They never see
//! the document identifier; the pipeline attaches it to the diagnostics.

use std::fmt;

use folio_core::{CoreError, Node, Phase, StageConfig};
use folio_parser::SyntaxError;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::stages;

/// Errors raised by a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// A code block names a language no grammar is registered for.
    #[error("unsupported language `{language}`")]
    UnsupportedLanguage { language: String },

    /// Tokenizing failed inside a known grammar.
    #[error("highlighting failed: {0}")]
    Syntax(#[from] SyntaxError),

    /// The tree does not have the shape the stage expects.
    #[error("invalid tree: {0}")]
    InvalidTree(String),
}

/// A stage failure, tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {cause}")]
pub struct TransformFailed {
    pub stage: String,
    #[source]
    pub cause: StageError,
}

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A structured message about one document run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// A warning raised outside any stage.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage: None,
            identifier: None,
            message: message.into(),
        }
    }

    /// An error raised by `stage`.
    pub fn error(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            stage: Some(stage.into()),
            identifier: None,
            message: message.into(),
        }
    }

    /// Attach the document identifier.
    #[must_use]
    pub fn for_document(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(identifier) = &self.identifier {
            write!(f, " [{identifier}]")?;
        }
        if let Some(stage) = &self.stage {
            write!(f, " ({stage})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Per-run state shared with stages.
#[derive(Debug, Default)]
pub struct StageContext {
    current_stage: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl StageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-fatal warning against the running stage.
    pub fn warn(&mut self, message: impl Into<String>) {
        let mut diagnostic = Diagnostic::warning(message);
        diagnostic.stage = self.current_stage.clone();
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// A named tree rewrite.
///
/// Stages hold only their options, so one instance serves every document and
/// runs for different documents may share it across threads.
pub trait TransformStage: Send + Sync + fmt::Debug {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Rewrite the tree in place.
    fn apply(&self, tree: &mut Node, ctx: &mut StageContext) -> Result<(), StageError>;
}

/// The ordered stages of one phase.
#[derive(Debug)]
pub struct TransformChain {
    phase: Phase,
    stages: Vec<Box<dyn TransformStage>>,
}

impl TransformChain {
    /// Create an empty chain.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            stages: Vec::new(),
        }
    }

    /// Instantiate configured stages, rejecting any configured in the wrong phase.
    pub fn from_configs(phase: Phase, configs: &[StageConfig]) -> folio_core::Result<Self> {
        let mut chain = Self::new(phase);
        for config in configs {
            if config.phase() != phase {
                return Err(CoreError::config(format!(
                    "stage `{}` belongs to the {:?} phase, not {phase:?}",
                    config.name(),
                    config.phase()
                )));
            }
            chain.push(stages::instantiate(config));
        }
        Ok(chain)
    }

    /// Add a stage. Stages run in the order they are added.
    pub fn push(&mut self, stage: Box<dyn TransformStage>) {
        self.stages.push(stage);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. The first failure stops the chain.
    pub fn execute(&self, tree: &mut Node, ctx: &mut StageContext) -> Result<(), TransformFailed> {
        for stage in &self.stages {
            debug!(stage = stage.name(), phase = ?self.phase, "running stage");
            ctx.current_stage = Some(stage.name().to_string());
            let result = stage.apply(tree, ctx);
            ctx.current_stage = None;
            result.map_err(|cause| TransformFailed {
                stage: stage.name().to_string(),
                cause,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use folio_core::NodeKind;

    use super::*;

    #[derive(Debug)]
    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl TransformStage for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn apply(&self, tree: &mut Node, ctx: &mut StageContext) -> Result<(), StageError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(StageError::InvalidTree("boom".into()));
            }
            tree.children.push(Node::text(self.name));
            ctx.warn(format!("{} ran", self.name));
            Ok(())
        }
    }

    fn chain(names: &[(&'static str, bool)], log: &Arc<Mutex<Vec<&'static str>>>) -> TransformChain {
        let mut chain = TransformChain::new(Phase::Pre);
        for (name, fail) in names {
            chain.push(Box::new(Recording {
                name,
                log: Arc::clone(log),
                fail: *fail,
            }));
        }
        chain
    }

    #[test]
    fn test_stages_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain(&[("first", false), ("second", false)], &log);
        let mut tree = Node::document(Vec::new());
        let mut ctx = StageContext::new();

        chain.execute(&mut tree, &mut ctx).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(tree.text_content(), "firstsecond");
        assert_eq!(chain.stage_names(), vec!["first", "second"]);
        assert_eq!(ctx.diagnostics()[1].stage.as_deref(), Some("second"));
    }

    #[test]
    fn test_failure_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain(&[("ok", false), ("bad", true), ("never", false)], &log);
        let mut tree = Node::document(Vec::new());
        let mut ctx = StageContext::new();

        let err = chain.execute(&mut tree, &mut ctx).unwrap_err();

        assert_eq!(err.stage, "bad");
        assert!(matches!(err.cause, StageError::InvalidTree(_)));
        assert_eq!(*log.lock().unwrap(), vec!["ok", "bad"]);
        assert_eq!(err.to_string(), "stage `bad` failed: invalid tree: boom");
    }

    #[test]
    fn test_from_configs_rejects_wrong_phase() {
        let err = TransformChain::from_configs(Phase::Pre, &[StageConfig::Minify]).unwrap_err();
        assert!(err.to_string().contains("minify"));

        let chain = TransformChain::from_configs(
            Phase::Pre,
            &[StageConfig::CodeTitle, StageConfig::footnotes()],
        )
        .unwrap();
        assert_eq!(chain.stage_names(), vec!["code-title", "footnotes"]);
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = TransformChain::new(Phase::Post);
        let mut tree = Node::document(vec![Node::new(NodeKind::ThematicBreak)]);
        let before = tree.clone();
        chain.execute(&mut tree, &mut StageContext::new()).unwrap();
        assert_eq!(tree, before);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::error("highlight", "unsupported language `foo`").for_document("blog/a");
        assert_eq!(d.to_string(), "error [blog/a] (highlight): unsupported language `foo`");
        assert!(d.is_error());
    }
}
