//! Custom inline node recognizers.
//!
//! Recognizers run on every text run outside code while the tree is being
//! built, so node kinds the markdown grammar does not know about exist from
//! parse time on.

use std::fmt;

use folio_core::{Node, NodeKind};

/// Recognizes custom inline constructs inside plain text.
pub trait InlineRecognizer: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Split `text` into nodes, or return `None` if nothing in it is recognized.
    fn recognize(&self, text: &str) -> Option<Vec<Node>>;
}

/// Recognizes `{{ name }}` prop expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionRecognizer;

impl ExpressionRecognizer {
    fn is_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    }
}

impl InlineRecognizer for ExpressionRecognizer {
    fn name(&self) -> &str {
        "expression"
    }

    fn recognize(&self, text: &str) -> Option<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut literal = String::new();
        let mut rest = text;
        let mut found = false;

        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                break;
            };
            let name = after[..end].trim();
            if Self::is_name(name) {
                literal.push_str(&rest[..start]);
                if !literal.is_empty() {
                    nodes.push(Node::text(std::mem::take(&mut literal)));
                }
                nodes.push(Node::new(NodeKind::Expression {
                    name: name.to_string(),
                }));
                found = true;
            } else {
                literal.push_str(&rest[..start + 2 + end + 2]);
            }
            rest = &after[end + 2..];
        }

        if !found {
            return None;
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            nodes.push(Node::text(literal));
        }
        Some(nodes)
    }
}

/// Run every recognizer over a text run, left to right.
pub(crate) fn apply_recognizers(recognizers: &[Box<dyn InlineRecognizer>], text: &str) -> Vec<Node> {
    let mut nodes = vec![Node::text(text)];
    for recognizer in recognizers {
        nodes = nodes
            .into_iter()
            .flat_map(|node| match &node.kind {
                NodeKind::Text { value } => recognizer.recognize(value).unwrap_or_else(|| vec![node]),
                _ => vec![node],
            })
            .collect();
    }
    nodes
}
