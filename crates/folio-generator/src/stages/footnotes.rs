//! Footnote numbering and collection.
//!
//! Definitions are lifted out of the tree wherever they appear. Ordinals are
//! assigned in first-reference order, every reference becomes a
//! cross-reference carrying its ordinal, and one footnote list is appended at
//! the end of the document.
//!
//! With `inline_notes`, `^[text]` in running text is a footnote written in
//! place. It gets a generated label and is numbered like any other note.
//!
//! With `inline_short`, a definition that is a single short paragraph is
//! rendered at each point of reference instead and takes no ordinal.

use std::collections::{HashMap, HashSet};

use folio_core::{Node, NodeKind};
use indexmap::IndexMap;
use tracing::debug;

use crate::transform::{StageContext, StageError, TransformStage};

/// Footnotes stage.
#[derive(Debug, Clone)]
pub struct Footnotes {
    pub inline_notes: bool,
    pub inline_short: bool,
    pub inline_max_len: usize,
}

impl Default for Footnotes {
    fn default() -> Self {
        Self {
            inline_notes: true,
            inline_short: false,
            inline_max_len: 80,
        }
    }
}

/// Numbering state for one document.
#[derive(Default)]
struct Numbering {
    /// Definitions not yet placed in the list, in source order.
    pending: IndexMap<String, Vec<Node>>,
    /// Every defined label.
    defined: HashSet<String>,
    /// Content of definitions rendered inline.
    inline: HashMap<String, Vec<Node>>,
    /// Labels in first-reference order; position + 1 is the ordinal.
    ordinals: IndexMap<String, usize>,
    /// Inline notes currently being expanded.
    expanding: Vec<String>,
    /// Inline notes lifted so far.
    generated: usize,
}

impl Numbering {
    fn ordinal(&mut self, label: &str) -> usize {
        let next = self.ordinals.len() + 1;
        *self.ordinals.entry(label.to_string()).or_insert(next)
    }

    /// Register a `^[...]` note and return the reference that replaces it.
    fn define_generated(&mut self, content: Vec<Node>) -> Node {
        let label = loop {
            self.generated += 1;
            let label = format!("inline-{}", self.generated);
            if !self.defined.contains(&label) {
                break label;
            }
        };
        self.defined.insert(label.clone());
        self.pending
            .insert(label.clone(), vec![Node::with_children(NodeKind::Paragraph, content)]);
        Node::new(NodeKind::FootnoteReference { label })
    }
}

/// A `^[` seen in a children list whose closing `]` has not been found yet.
#[derive(Default)]
struct OpenNote {
    depth: usize,
    content: Vec<Node>,
    text: String,
    /// The source nodes, put back if the note never closes.
    raw: Vec<Node>,
    raw_text: String,
}

impl OpenNote {
    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.content.push(Node::text(std::mem::take(&mut self.text)));
        }
        if !self.raw_text.is_empty() {
            self.raw.push(Node::text(std::mem::take(&mut self.raw_text)));
        }
    }
}

fn push_text(out: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        out.push(Node::text(text));
    }
}

/// Join runs of adjacent text nodes so `^[` split by the parser is seen whole.
fn merge_text(children: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        if let (Some(Node { kind: NodeKind::Text { value: last }, .. }), NodeKind::Text { value }) =
            (merged.last_mut(), &child.kind)
        {
            last.push_str(value);
            continue;
        }
        merged.push(child);
    }
    merged
}

/// Replace every `^[...]` below `node` with a reference to a generated definition.
fn lift_inline_notes(node: &mut Node, state: &mut Numbering) {
    if node.kind.is_code() {
        return;
    }
    for child in &mut node.children {
        lift_inline_notes(child, state);
    }

    let has_caret = node
        .children
        .iter()
        .any(|child| matches!(&child.kind, NodeKind::Text { value } if value.contains('^')));
    if !has_caret {
        return;
    }

    let children = merge_text(std::mem::take(&mut node.children));
    let mut out = Vec::with_capacity(children.len());
    let mut open: Option<OpenNote> = None;

    for child in children {
        let value = match child.kind {
            NodeKind::Text { value } => value,
            kind => {
                let child = Node::with_children(kind, child.children);
                match open.as_mut() {
                    Some(note) => {
                        note.flush();
                        note.raw.push(child.clone());
                        note.content.push(child);
                    }
                    None => out.push(child),
                }
                continue;
            }
        };

        let bytes = value.as_bytes();
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            let Some(note) = open.as_mut() else {
                if bytes[i] == b'^' && bytes.get(i + 1) == Some(&b'[') {
                    push_text(&mut out, &value[start..i]);
                    open = Some(OpenNote {
                        depth: 1,
                        raw_text: "^[".to_string(),
                        ..OpenNote::default()
                    });
                    i += 2;
                    start = i;
                } else {
                    i += 1;
                }
                continue;
            };

            match bytes[i] {
                b'[' => note.depth += 1,
                b']' => note.depth -= 1,
                _ => {}
            }
            i += 1;
            if note.depth > 0 {
                continue;
            }

            note.text.push_str(&value[start..i - 1]);
            note.raw_text.push_str(&value[start..i]);
            start = i;
            if let Some(mut note) = open.take() {
                note.flush();
                let empty = note.content.iter().all(|n| n.text_content().trim().is_empty());
                if empty {
                    out.extend(note.raw);
                } else {
                    out.push(state.define_generated(note.content));
                }
            }
        }

        match open.as_mut() {
            Some(note) => {
                note.text.push_str(&value[start..]);
                note.raw_text.push_str(&value[start..]);
                note.flush();
            }
            None => push_text(&mut out, &value[start..]),
        }
    }

    if let Some(mut note) = open {
        note.flush();
        out.extend(note.raw);
    }
    node.children = merge_text(out);
}

impl Footnotes {
    fn is_inline(&self, content: &[Node]) -> bool {
        self.inline_short
            && matches!(content, [only] if only.kind == NodeKind::Paragraph)
            && content[0].text_content().chars().count() <= self.inline_max_len
    }

    /// Rewrite every reference below `node`.
    fn rewrite(&self, node: &mut Node, state: &mut Numbering, ctx: &mut StageContext) {
        for child in &mut node.children {
            let NodeKind::FootnoteReference { label } = &child.kind else {
                self.rewrite(child, state, ctx);
                continue;
            };
            let label = label.clone();

            if state.expanding.contains(&label) {
                ctx.warn(format!("footnote `{label}` references itself"));
                *child = Node::new(NodeKind::BrokenReference { label });
            } else if let Some(content) = state.inline.get(&label) {
                let mut note = Node::with_children(NodeKind::InlineNote { label: label.clone() }, content.clone());
                state.expanding.push(label);
                self.rewrite(&mut note, state, ctx);
                state.expanding.pop();
                *child = note;
            } else if state.defined.contains(&label) {
                let ordinal = state.ordinal(&label);
                *child = Node::new(NodeKind::FootnoteCrossReference { label, ordinal });
            } else {
                ctx.warn(format!("undefined footnote reference `{label}`"));
                *child = Node::new(NodeKind::BrokenReference { label });
            }
        }
    }
}

/// Remove every footnote definition below `node`, first definition of a label winning.
fn take_definitions(node: &mut Node, state: &mut Numbering, ctx: &mut StageContext) {
    let children = std::mem::take(&mut node.children);
    for mut child in children {
        if let NodeKind::FootnoteDefinition { label } = &child.kind {
            let label = label.clone();
            // Definitions nested in definitions are lifted too.
            take_definitions(&mut child, state, ctx);
            if state.defined.insert(label.clone()) {
                state.pending.insert(label, child.children);
            } else {
                ctx.warn(format!("duplicate footnote definition `{label}` ignored"));
            }
        } else {
            take_definitions(&mut child, state, ctx);
            node.children.push(child);
        }
    }
}

impl TransformStage for Footnotes {
    fn name(&self) -> &str {
        "footnotes"
    }

    fn apply(&self, tree: &mut Node, ctx: &mut StageContext) -> Result<(), StageError> {
        if tree.kind != NodeKind::Document {
            return Err(StageError::InvalidTree(format!(
                "expected a document root, found {}",
                tree.kind.name()
            )));
        }

        let mut state = Numbering::default();
        take_definitions(tree, &mut state, ctx);

        if self.inline_notes {
            lift_inline_notes(tree, &mut state);
            let labels: Vec<String> = state.pending.keys().cloned().collect();
            for label in labels {
                if let Some(content) = state.pending.get_mut(&label) {
                    let mut holder = Node::with_children(NodeKind::Fragment, std::mem::take(content));
                    lift_inline_notes(&mut holder, &mut state);
                    if let Some(content) = state.pending.get_mut(&label) {
                        *content = holder.children;
                    }
                }
            }
        }

        let inline: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, content)| self.is_inline(content))
            .map(|(label, _)| label.clone())
            .collect();
        for label in inline {
            if let Some(mut content) = state.pending.shift_remove(&label) {
                let paragraph = content.remove(0);
                state.inline.insert(label, paragraph.children);
            }
        }

        self.rewrite(tree, &mut state, ctx);

        // Definitions can reference further notes, which extends the list while it is built.
        let mut items = Vec::new();
        let mut next = 0;
        while let Some((label, ordinal)) = state
            .ordinals
            .get_index(next)
            .map(|(label, ordinal)| (label.clone(), *ordinal))
        {
            next += 1;
            let Some(content) = state.pending.shift_remove(&label) else {
                continue;
            };
            let mut item = Node::with_children(NodeKind::FootnoteItem { label, ordinal }, content);
            self.rewrite(&mut item, &mut state, ctx);
            items.push(item);
        }

        for label in state.pending.keys() {
            debug!(label = %label, "dropping unreferenced footnote definition");
        }

        if !items.is_empty() {
            tree.children.push(Node::with_children(NodeKind::FootnoteList, items));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use folio_parser::TreeBuilder;

    use super::*;

    fn run(stage: &Footnotes, body: &str) -> (Node, StageContext) {
        let mut tree = TreeBuilder::new().build(body).unwrap();
        let mut ctx = StageContext::new();
        stage.apply(&mut tree, &mut ctx).unwrap();
        (tree, ctx)
    }

    fn cross_refs(tree: &Node) -> Vec<(String, usize)> {
        let mut refs = Vec::new();
        tree.walk(&mut |node| {
            if let NodeKind::FootnoteCrossReference { label, ordinal } = &node.kind {
                refs.push((label.clone(), *ordinal));
            }
        });
        refs
    }

    fn list_labels(tree: &Node) -> Vec<String> {
        let list = tree.children.last().unwrap();
        assert_eq!(list.kind, NodeKind::FootnoteList);
        list.children
            .iter()
            .map(|item| match &item.kind {
                NodeKind::FootnoteItem { label, .. } => label.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_first_reference_order() {
        let body = "One[^b] two[^a] three[^b] four[^c].\n\n[^a]: A.\n\n[^b]: B.\n\n[^c]: C.\n";
        let (tree, ctx) = run(&Footnotes::default(), body);

        assert_eq!(list_labels(&tree), vec!["b", "a", "c"]);
        assert_eq!(
            cross_refs(&tree),
            vec![("b".into(), 1), ("a".into(), 2), ("b".into(), 1), ("c".into(), 3)]
        );
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(tree.count_where(|k| matches!(k, NodeKind::FootnoteDefinition { .. })), 0);
        assert_eq!(tree.count_where(|k| *k == NodeKind::FootnoteList), 1);
    }

    #[test]
    fn test_undefined_reference_is_broken() {
        let (tree, ctx) = run(&Footnotes::default(), "See[^x].\n");

        assert_eq!(
            tree.count_where(|k| matches!(k, NodeKind::BrokenReference { label } if label == "x")),
            1
        );
        assert_eq!(ctx.diagnostics().len(), 1);
        assert!(ctx.diagnostics()[0].message.contains("`x`"));
        assert_eq!(tree.count_where(|k| *k == NodeKind::FootnoteList), 0);
    }

    #[test]
    fn test_unreferenced_definition_dropped() {
        let (tree, ctx) = run(&Footnotes::default(), "Text[^a].\n\n[^a]: A.\n\n[^z]: Unused.\n");

        assert_eq!(list_labels(&tree), vec!["a"]);
        assert!(!tree.text_content().contains("Unused"));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_caret_notes_are_numbered() {
        let body = "First[^a] then^[an *inline* note] done.\n\n[^a]: A.\n";
        let (tree, ctx) = run(&Footnotes::default(), body);

        assert_eq!(list_labels(&tree), vec!["a", "inline-1"]);
        assert_eq!(cross_refs(&tree), vec![("a".into(), 1), ("inline-1".into(), 2)]);
        assert!(ctx.diagnostics().is_empty());

        let list = tree.children.last().unwrap();
        assert_eq!(list.children[1].text_content(), "an inline note");
        assert_eq!(tree.count_where(|k| *k == NodeKind::Emphasis), 1);
        assert!(tree.children[0].text_content().ends_with(" done."));
    }

    #[test]
    fn test_caret_notes_skip_taken_labels_and_code() {
        let body = "One^[x [nested] y] and `^[code]`.\n\nRef[^inline-1].\n\n[^inline-1]: Written.\n";
        let (tree, _) = run(&Footnotes::default(), body);

        assert_eq!(list_labels(&tree), vec!["inline-2", "inline-1"]);
        assert_eq!(tree.children.last().unwrap().children[0].text_content(), "x [nested] y");
        assert_eq!(
            tree.count_where(|k| matches!(k, NodeKind::InlineCode { value } if value == "^[code]")),
            1
        );
    }

    #[test]
    fn test_unclosed_caret_note_is_text() {
        let (tree, _) = run(&Footnotes::default(), "Open^[never closed.\n");
        assert_eq!(tree.text_content(), "Open^[never closed.");
        assert_eq!(tree.count_where(|k| *k == NodeKind::FootnoteList), 0);

        let off = Footnotes {
            inline_notes: false,
            ..Footnotes::default()
        };
        let (tree, _) = run(&off, "Plain^[kept] text.\n");
        assert_eq!(tree.count_where(|k| *k == NodeKind::FootnoteList), 0);
        assert!(tree.text_content().contains("^[kept]"));
    }

    #[test]
    fn test_inline_short_definitions() {
        let stage = Footnotes {
            inline_short: true,
            inline_max_len: 20,
            ..Footnotes::default()
        };
        let body = "Short[^s] long[^l].\n\n[^s]: Tiny note.\n\n[^l]: This definition is much longer than twenty characters.\n";
        let (tree, _) = run(&stage, body);

        assert_eq!(tree.count_where(|k| matches!(k, NodeKind::InlineNote { label } if label == "s")), 1);
        assert_eq!(cross_refs(&tree), vec![("l".into(), 1)]);
        assert_eq!(list_labels(&tree), vec!["l"]);
    }

    #[test]
    fn test_nested_reference_in_definition() {
        let body = "Text[^a].\n\n[^a]: See also[^b].\n\n[^b]: B.\n";
        let (tree, _) = run(&Footnotes::default(), body);

        assert_eq!(list_labels(&tree), vec!["a", "b"]);
        assert_eq!(cross_refs(&tree), vec![("a".into(), 1), ("b".into(), 2)]);
    }

    #[test]
    fn test_rejects_non_document_root() {
        let mut tree = Node::new(NodeKind::Paragraph);
        let err = Footnotes::default().apply(&mut tree, &mut StageContext::new()).unwrap_err();
        assert!(matches!(err, StageError::InvalidTree(_)));
    }
}
