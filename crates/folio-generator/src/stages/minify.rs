//! Structural clean-up of the rendered tree.

use folio_core::{Node, NodeKind};

use crate::transform::{StageContext, StageError, TransformStage};

/// Shrinks the tree without changing what it renders to.
///
/// Fragments are spliced into their parent, adjacent text is merged, empty
/// text and whitespace-only text next to block content are dropped, and
/// ASCII whitespace runs outside code collapse to a single space.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minify;

impl TransformStage for Minify {
    fn name(&self) -> &str {
        "minify"
    }

    fn apply(&self, tree: &mut Node, _ctx: &mut StageContext) -> Result<(), StageError> {
        minify(tree, false);
        Ok(())
    }
}

fn minify(node: &mut Node, in_code: bool) {
    let in_code = in_code || node.kind.is_code();

    let mut spliced = Vec::with_capacity(node.children.len());
    for mut child in std::mem::take(&mut node.children) {
        minify(&mut child, in_code);
        if child.kind == NodeKind::Fragment {
            spliced.extend(child.children);
        } else {
            spliced.push(child);
        }
    }

    let mut merged: Vec<Node> = Vec::with_capacity(spliced.len());
    for child in spliced {
        if let (
            Some(Node {
                kind: NodeKind::Text { value: previous },
                ..
            }),
            NodeKind::Text { value },
        ) = (merged.last_mut(), &child.kind)
        {
            previous.push_str(value);
            continue;
        }
        merged.push(child);
    }

    if !in_code {
        for child in &mut merged {
            if let NodeKind::Text { value } = &mut child.kind {
                *value = collapse_whitespace(value);
            }
        }
    }

    let keep: Vec<bool> = (0..merged.len())
        .map(|i| match &merged[i].kind {
            NodeKind::Text { value } if value.is_empty() => false,
            NodeKind::Text { value } if !in_code && value.trim_ascii().is_empty() => {
                let block_before = i > 0 && merged[i - 1].kind.is_block();
                let block_after = merged.get(i + 1).is_some_and(|n| n.kind.is_block());
                let at_edge_of_block = node.kind.is_block() && (i == 0 || i + 1 == merged.len());
                !(block_before || block_after || (at_edge_of_block && !is_inline_container(&node.kind)))
            }
            _ => true,
        })
        .collect();

    node.children = merged
        .into_iter()
        .zip(keep)
        .filter_map(|(child, keep)| keep.then_some(child))
        .collect();
}

/// Block kinds whose children are inline content, where edge whitespace is text.
fn is_inline_container(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Paragraph | NodeKind::Heading { .. } | NodeKind::TableCell { .. })
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
