//! Generic rendering between the two transform phases.

use std::fmt;

use folio_core::{Node, NodeKind, tree::Align};
use thiserror::Error;

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The tree is not rooted at a document node.
    #[error("expected a document root, found {0}")]
    UnexpectedRoot(&'static str),

    /// A table child is neither a head nor a row.
    #[error("malformed table: unexpected {0}")]
    MalformedTable(&'static str),
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Turns a source tree into a rendered tree.
pub trait GenericRenderer: Send + Sync + fmt::Debug {
    fn render(&self, tree: Node) -> Result<Node>;
}

/// Structural renderer.
///
/// - Top-level content is grouped into sections by heading level. A heading
///   opens a section that runs until the next heading of the same or a higher
///   level. A footnote list always stays at the end of the document.
/// - Tables get explicit head and body rows, and every cell carries its
///   column alignment and whether it is a header cell.
#[derive(Debug, Clone, Copy)]
pub struct StructuralRenderer {
    sectionize: bool,
}

impl Default for StructuralRenderer {
    fn default() -> Self {
        Self { sectionize: true }
    }
}

impl StructuralRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer that leaves the block structure flat.
    pub fn flat() -> Self {
        Self { sectionize: false }
    }
}

impl GenericRenderer for StructuralRenderer {
    fn render(&self, mut tree: Node) -> Result<Node> {
        if tree.kind != NodeKind::Document {
            return Err(RenderError::UnexpectedRoot(tree.kind.name()));
        }

        expand_tables(&mut tree)?;
        if self.sectionize {
            tree.children = sectionize(std::mem::take(&mut tree.children));
        }
        Ok(tree)
    }
}

fn expand_tables(node: &mut Node) -> Result<()> {
    if let NodeKind::Table { alignments } = &node.kind {
        let alignments = alignments.clone();
        let children = std::mem::take(&mut node.children);
        node.children = expand_table(children, &alignments)?;
    }
    for child in &mut node.children {
        expand_tables(child)?;
    }
    Ok(())
}

fn expand_table(children: Vec<Node>, alignments: &[Option<Align>]) -> Result<Vec<Node>> {
    let mut head_rows = Vec::new();
    let mut body_rows = Vec::new();

    for child in children {
        match child.kind {
            // Head cells sit directly in the head; already-rendered heads hold rows.
            NodeKind::TableHead => {
                if child.children.iter().all(|c| c.kind == NodeKind::TableRow) {
                    head_rows.extend(child.children);
                } else {
                    head_rows.push(Node::with_children(NodeKind::TableRow, child.children));
                }
            }
            NodeKind::TableBody => body_rows.extend(child.children),
            NodeKind::TableRow => body_rows.push(child),
            ref other => return Err(RenderError::MalformedTable(other.name())),
        }
    }

    let mark = |rows: Vec<Node>, header: bool| -> Vec<Node> {
        rows.into_iter()
            .map(|mut row| {
                for (column, cell) in row.children.iter_mut().enumerate() {
                    if let NodeKind::TableCell { header: h, align } = &mut cell.kind {
                        *h = header;
                        *align = alignments.get(column).copied().flatten();
                    }
                }
                row
            })
            .collect()
    };

    let mut expanded = Vec::with_capacity(2);
    if !head_rows.is_empty() {
        expanded.push(Node::with_children(NodeKind::TableHead, mark(head_rows, true)));
    }
    if !body_rows.is_empty() {
        expanded.push(Node::with_children(NodeKind::TableBody, mark(body_rows, false)));
    }
    Ok(expanded)
}

fn section_depth(node: &Node) -> u8 {
    match node.kind {
        NodeKind::Section { depth } => depth,
        _ => 0,
    }
}

fn close_section(open: &mut Vec<Node>, out: &mut Vec<Node>) {
    if let Some(section) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(section),
            None => out.push(section),
        }
    }
}

fn sectionize(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut open: Vec<Node> = Vec::new();

    for child in children {
        match child.kind {
            NodeKind::Heading { level, .. } => {
                while open.last().is_some_and(|s| section_depth(s) >= level) {
                    close_section(&mut open, &mut out);
                }
                open.push(Node::with_children(NodeKind::Section { depth: level }, vec![child]));
            }
            NodeKind::FootnoteList => {
                while !open.is_empty() {
                    close_section(&mut open, &mut out);
                }
                out.push(child);
            }
            _ => match open.last_mut() {
                Some(section) => section.children.push(child),
                None => out.push(child),
            },
        }
    }

    while !open.is_empty() {
        close_section(&mut open, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use folio_parser::TreeBuilder;

    use super::*;

    fn render(body: &str) -> Node {
        let tree = TreeBuilder::new().build(body).unwrap();
        StructuralRenderer::new().render(tree).unwrap()
    }

    #[test]
    fn test_sections_nest_by_level() {
        let tree = render("Lead.\n\n# A\n\nText.\n\n## A.1\n\nMore.\n\n# B\n");

        let kinds: Vec<_> = tree.children.iter().map(|n| n.kind.name()).collect();
        assert_eq!(kinds, vec!["paragraph", "section", "section"]);

        let a = &tree.children[1];
        assert_eq!(a.kind, NodeKind::Section { depth: 1 });
        assert_eq!(a.children.len(), 3);
        assert_eq!(a.children[2].kind, NodeKind::Section { depth: 2 });
        assert_eq!(a.children[2].text_content(), "A.1More.");
    }

    #[test]
    fn test_footnote_list_stays_last() {
        let tree = Node::document(vec![
            Node::with_children(NodeKind::Heading { level: 1, id: None }, vec![Node::text("T")]),
            Node::with_children(NodeKind::Paragraph, vec![Node::text("p")]),
            Node::new(NodeKind::FootnoteList),
        ]);
        let rendered = StructuralRenderer::new().render(tree).unwrap();

        assert_eq!(rendered.children.len(), 2);
        assert_eq!(rendered.children[1].kind, NodeKind::FootnoteList);
    }

    #[test]
    fn test_table_expanded() {
        let tree = render("| A | B |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |\n");
        let table = &tree.children[0];

        assert_eq!(table.children.len(), 2);
        let head = &table.children[0];
        assert_eq!(head.kind, NodeKind::TableHead);
        assert_eq!(head.children[0].kind, NodeKind::TableRow);
        assert_eq!(
            head.children[0].children[1].kind,
            NodeKind::TableCell {
                header: true,
                align: Some(Align::Right)
            }
        );

        let body = &table.children[1];
        assert_eq!(body.kind, NodeKind::TableBody);
        assert_eq!(body.children.len(), 2);
        assert_eq!(
            body.children[1].children[0].kind,
            NodeKind::TableCell {
                header: false,
                align: Some(Align::Left)
            }
        );
    }

    #[test]
    fn test_render_is_stable() {
        let once = render("# T\n\n| A |\n|---|\n| 1 |\n");
        let flat_once = StructuralRenderer::flat().render(once.clone()).unwrap();
        assert_eq!(flat_once, once);
    }

    #[test]
    fn test_rejects_non_document() {
        let err = StructuralRenderer::new()
            .render(Node::new(NodeKind::Paragraph))
            .unwrap_err();
        assert!(matches!(err, RenderError::UnexpectedRoot("paragraph")));
    }
}
