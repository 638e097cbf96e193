//! Code highlighting.

use folio_core::{Node, NodeKind};
use folio_parser::{SyntaxError, SyntaxHighlighter};
use tracing::debug;

use crate::transform::{StageContext, StageError, TransformStage};

/// Tokenizes code blocks into classed token nodes.
///
/// Blocks without a language, and blocks that were already tokenized, are
/// left alone. An unknown language stays plain text unless `strict` is set.
#[derive(Debug)]
pub struct Highlight {
    strict: bool,
    highlighter: SyntaxHighlighter,
}

impl Highlight {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            highlighter: SyntaxHighlighter::new(),
        }
    }

    fn tokens(&self, code: &str, language: &str) -> Result<Option<Vec<Node>>, StageError> {
        let tokens = match self.highlighter.tokenize(code, language) {
            Ok(tokens) => tokens,
            Err(SyntaxError::UnknownLanguage(_)) if !self.strict => {
                debug!(language, "no grammar for language, leaving code plain");
                return Ok(None);
            }
            Err(SyntaxError::UnknownLanguage(language)) => {
                return Err(StageError::UnsupportedLanguage { language });
            }
            Err(e) => return Err(e.into()),
        };

        let nodes = tokens
            .into_iter()
            .map(|token| match token.class {
                Some(class) => Node::with_children(NodeKind::Token { class }, vec![Node::text(token.text)]),
                None => Node::text(token.text),
            })
            .collect();
        Ok(Some(nodes))
    }
}

impl TransformStage for Highlight {
    fn name(&self) -> &str {
        "highlight"
    }

    fn apply(&self, tree: &mut Node, _ctx: &mut StageContext) -> Result<(), StageError> {
        let mut failure = None;
        tree.walk_mut(&mut |node| {
            if failure.is_some() || !node.children.is_empty() {
                return;
            }
            let (NodeKind::CodeBlock {
                language: Some(language),
                raw_text,
                ..
            }
            | NodeKind::CodeBlockWithTitle {
                language: Some(language),
                raw_text,
                ..
            }) = &node.kind
            else {
                return;
            };
            match self.tokens(raw_text, language) {
                Ok(Some(tokens)) => node.children = tokens,
                Ok(None) => {}
                Err(e) => failure = Some(e),
            }
        });
        failure.map_or(Ok(()), Err)
    }
}
