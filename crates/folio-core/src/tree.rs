//! The document syntax tree.
//!
//! A tree is rooted at a [`NodeKind::Document`] node. Nodes own their children
//! exclusively; stages rewrite the tree in place and it is dropped once the
//! compiler has produced an artifact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Column alignment for table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    /// CSS keyword for this alignment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Kind tag and kind-specific attributes of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Document,
    Heading {
        level: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Paragraph,
    Text {
        value: String,
    },
    Emphasis,
    Strong,
    Strikethrough,
    InlineCode {
        value: String,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
        raw_text: String,
    },
    CodeBlockWithTitle {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        raw_text: String,
    },
    /// A highlighted run of code; its text lives in child text nodes.
    Token {
        class: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        title: String,
    },
    ImageComponent {
        url: String,
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        title: String,
    },
    BlockQuote,
    List {
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
    },
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    Table {
        alignments: Vec<Option<Align>>,
    },
    TableHead,
    TableBody,
    TableRow,
    TableCell {
        #[serde(default)]
        header: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<Align>,
    },
    ThematicBreak,
    SoftBreak,
    HardBreak,
    Html {
        value: String,
    },
    FootnoteReference {
        label: String,
    },
    FootnoteDefinition {
        label: String,
    },
    FootnoteCrossReference {
        label: String,
        ordinal: usize,
    },
    BrokenReference {
        label: String,
    },
    /// A short footnote rendered at its point of reference.
    InlineNote {
        label: String,
    },
    FootnoteList,
    FootnoteItem {
        label: String,
        ordinal: usize,
    },
    /// A heading together with the content it governs.
    Section {
        depth: u8,
    },
    /// A transparent grouping that renders only its children.
    Fragment,
    /// A prop looked up when the artifact is invoked.
    Expression {
        name: String,
    },
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
    },
}

impl NodeKind {
    /// Whether the kind is block-level content.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::Heading { .. }
                | Self::Paragraph
                | Self::CodeBlock { .. }
                | Self::CodeBlockWithTitle { .. }
                | Self::BlockQuote
                | Self::List { .. }
                | Self::ListItem { .. }
                | Self::Table { .. }
                | Self::TableHead
                | Self::TableBody
                | Self::TableRow
                | Self::ThematicBreak
                | Self::FootnoteDefinition { .. }
                | Self::FootnoteList
                | Self::FootnoteItem { .. }
                | Self::Section { .. }
        )
    }

    /// Whether text inside this kind is literal code.
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            Self::CodeBlock { .. }
                | Self::CodeBlockWithTitle { .. }
                | Self::InlineCode { .. }
                | Self::Token { .. }
        )
    }

    /// Short kind name for logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Heading { .. } => "heading",
            Self::Paragraph => "paragraph",
            Self::Text { .. } => "text",
            Self::Emphasis => "emphasis",
            Self::Strong => "strong",
            Self::Strikethrough => "strikethrough",
            Self::InlineCode { .. } => "inline-code",
            Self::CodeBlock { .. } => "code-block",
            Self::CodeBlockWithTitle { .. } => "code-block-with-title",
            Self::Token { .. } => "token",
            Self::Image { .. } => "image",
            Self::ImageComponent { .. } => "image-component",
            Self::Link { .. } => "link",
            Self::BlockQuote => "block-quote",
            Self::List { .. } => "list",
            Self::ListItem { .. } => "list-item",
            Self::Table { .. } => "table",
            Self::TableHead => "table-head",
            Self::TableBody => "table-body",
            Self::TableRow => "table-row",
            Self::TableCell { .. } => "table-cell",
            Self::ThematicBreak => "thematic-break",
            Self::SoftBreak => "soft-break",
            Self::HardBreak => "hard-break",
            Self::Html { .. } => "html",
            Self::FootnoteReference { .. } => "footnote-reference",
            Self::FootnoteDefinition { .. } => "footnote-definition",
            Self::FootnoteCrossReference { .. } => "footnote-cross-reference",
            Self::BrokenReference { .. } => "broken-reference",
            Self::InlineNote { .. } => "inline-note",
            Self::FootnoteList => "footnote-list",
            Self::FootnoteItem { .. } => "footnote-item",
            Self::Section { .. } => "section",
            Self::Fragment => "fragment",
            Self::Expression { .. } => "expression",
            Self::Custom { .. } => "custom",
        }
    }
}

/// A node in the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a childless node.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Create a node with children.
    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// Create an empty document root.
    pub fn document(children: Vec<Node>) -> Self {
        Self::with_children(NodeKind::Document, children)
    }

    /// Create a text node.
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text {
            value: value.into(),
        })
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { value } | NodeKind::InlineCode { value } => out.push_str(value),
            NodeKind::CodeBlock { raw_text, .. } | NodeKind::CodeBlockWithTitle { raw_text, .. }
                if self.children.is_empty() =>
            {
                out.push_str(raw_text);
            }
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Visit every node in document order (pre-order).
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Visit every node mutably in document order (pre-order).
    ///
    /// Children are visited after `f` returns, so replacements made by `f`
    /// are descended into.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Total number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Count nodes in this subtree matching a predicate.
    pub fn count_where(&self, pred: impl Fn(&NodeKind) -> bool) -> usize {
        let mut n = 0;
        self.walk(&mut |node| {
            if pred(&node.kind) {
                n += 1;
            }
        });
        n
    }
}
