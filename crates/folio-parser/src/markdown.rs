//! Markdown tree builder using pulldown-cmark.

use std::collections::BTreeMap;

use folio_core::{Node, NodeKind, tree::Align};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag, TagEnd, TextMergeStream};
use tracing::debug;

use crate::{
    ParserError, Result,
    recognize::{ExpressionRecognizer, InlineRecognizer, apply_recognizers},
};

/// Builds a [`Node`] tree from a markdown body.
#[derive(Debug)]
pub struct TreeBuilder {
    options: Options,
    recognizers: Vec<Box<dyn InlineRecognizer>>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An open element waiting for its end tag.
struct Frame {
    node: Node,
    end: TagEnd,
}

impl TreeBuilder {
    /// Create a tree builder with the standard recognizers registered.
    pub fn new() -> Self {
        Self::bare().with_recognizer(ExpressionRecognizer)
    }

    /// Create a tree builder with no custom recognizers.
    pub fn bare() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        // Undefined references must still surface as reference events.
        options.insert(Options::ENABLE_OLD_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            options,
            recognizers: Vec::new(),
        }
    }

    /// Register an inline recognizer. Recognizers run in registration order.
    pub fn with_recognizer(mut self, recognizer: impl InlineRecognizer + 'static) -> Self {
        self.recognizers.push(Box::new(recognizer));
        self
    }

    /// Names of the registered recognizers.
    pub fn recognizer_names(&self) -> Vec<&str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    /// Build the syntax tree of a markdown body.
    pub fn build(&self, body: &str) -> Result<Node> {
        let events = TextMergeStream::new(Parser::new_ext(body, self.options));
        let tree = self.assemble(events)?;
        debug!(nodes = tree.count(), "built syntax tree");
        Ok(tree)
    }

    /// Assemble a tree from an event stream, checking that it is balanced.
    fn assemble<'a>(&self, events: impl IntoIterator<Item = Event<'a>>) -> Result<Node> {
        let mut root = Node::document(Vec::new());
        let mut open: Vec<Frame> = Vec::new();

        for event in events {
            match event {
                Event::Start(tag) => {
                    let end = tag.to_end();
                    open.push(Frame {
                        node: Node::new(kind_for_tag(tag)),
                        end,
                    });
                }

                Event::End(end) => {
                    let Some(frame) = open.pop() else {
                        return Err(ParserError::unparseable(&[], format!("unexpected end of {end:?}")));
                    };
                    if frame.end != end {
                        let mut path = open_path(&root, &open);
                        path.push(current(&mut root, &mut open).children.len());
                        return Err(ParserError::unparseable(
                            &path,
                            format!("expected end of {:?}, found end of {end:?}", frame.end),
                        ));
                    }
                    current(&mut root, &mut open).children.push(frame.node);
                }

                Event::Text(text) => {
                    let parent = current(&mut root, &mut open);
                    if let NodeKind::CodeBlock { raw_text, .. } = &mut parent.kind {
                        raw_text.push_str(&text);
                    } else if self.recognizers.is_empty() {
                        parent.children.push(Node::text(text.as_ref()));
                    } else {
                        parent.children.extend(apply_recognizers(&self.recognizers, &text));
                    }
                }

                Event::Code(code) => push(&mut root, &mut open, NodeKind::InlineCode {
                    value: code.to_string(),
                }),

                Event::InlineMath(math) => {
                    let node = math_node("span", "math inline", &math);
                    current(&mut root, &mut open).children.push(node);
                }

                Event::DisplayMath(math) => {
                    let node = math_node("div", "math display", &math);
                    current(&mut root, &mut open).children.push(node);
                }

                Event::Html(raw) | Event::InlineHtml(raw) => push(&mut root, &mut open, NodeKind::Html {
                    value: raw.to_string(),
                }),

                Event::FootnoteReference(label) => push(&mut root, &mut open, NodeKind::FootnoteReference {
                    label: label.to_string(),
                }),

                Event::SoftBreak => push(&mut root, &mut open, NodeKind::SoftBreak),
                Event::HardBreak => push(&mut root, &mut open, NodeKind::HardBreak),
                Event::Rule => push(&mut root, &mut open, NodeKind::ThematicBreak),

                Event::TaskListMarker(is_checked) => {
                    let item = open
                        .iter_mut()
                        .rev()
                        .find(|frame| matches!(frame.node.kind, NodeKind::ListItem { .. }));
                    if let Some(Frame {
                        node:
                            Node {
                                kind: NodeKind::ListItem { checked },
                                ..
                            },
                        ..
                    }) = item
                    {
                        *checked = Some(is_checked);
                    }
                }
            }
        }

        if !open.is_empty() {
            let path = open_path(&root, &open);
            let unclosed: Vec<_> = open.iter().map(|frame| format!("{:?}", frame.end)).collect();
            return Err(ParserError::unparseable(
                &path,
                format!("unclosed elements: {}", unclosed.join(", ")),
            ));
        }

        Ok(root)
    }
}

/// The innermost open node, or the root when nothing is open.
fn current<'n>(root: &'n mut Node, open: &'n mut [Frame]) -> &'n mut Node {
    match open.last_mut() {
        Some(frame) => &mut frame.node,
        None => root,
    }
}

fn push(root: &mut Node, open: &mut [Frame], kind: NodeKind) {
    current(root, open).children.push(Node::new(kind));
}

/// Child indices from the root down to the innermost open node.
fn open_path(root: &Node, open: &[Frame]) -> Vec<usize> {
    let mut path = Vec::with_capacity(open.len());
    let mut parent = root;
    for frame in open {
        path.push(parent.children.len());
        parent = &frame.node;
    }
    path
}

fn math_node(element: &str, class: &str, math: &str) -> Node {
    let attributes = BTreeMap::from([("class".to_string(), class.to_string())]);
    Node::with_children(
        NodeKind::Custom {
            name: element.to_string(),
            attributes,
        },
        vec![Node::text(math)],
    )
}

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom {
        name: name.to_string(),
        attributes: BTreeMap::new(),
    }
}

/// Split a fence info string into language and meta.
fn split_info(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    match info.split_once(char::is_whitespace) {
        Some((language, meta)) => {
            let meta = meta.trim();
            (
                Some(language.to_string()),
                (!meta.is_empty()).then(|| meta.to_string()),
            )
        }
        None if info.is_empty() => (None, None),
        None => (Some(info.to_string()), None),
    }
}

fn align(alignment: Alignment) -> Option<Align> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some(Align::Left),
        Alignment::Center => Some(Align::Center),
        Alignment::Right => Some(Align::Right),
    }
}

/// Map a pulldown-cmark tag to a node kind.
fn kind_for_tag(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, id, .. } => NodeKind::Heading {
            level: level as u8,
            id: id.map(|id| id.to_string()),
        },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
            let (language, meta) = split_info(&info);
            NodeKind::CodeBlock {
                language,
                meta,
                raw_text: String::new(),
            }
        }
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock {
            language: None,
            meta: None,
            raw_text: String::new(),
        },
        Tag::HtmlBlock | Tag::MetadataBlock(_) => NodeKind::Fragment,
        Tag::List(start) => NodeKind::List {
            ordered: start.is_some(),
            start,
        },
        Tag::Item => NodeKind::ListItem { checked: None },
        Tag::FootnoteDefinition(label) => NodeKind::FootnoteDefinition {
            label: label.to_string(),
        },
        Tag::DefinitionList => custom("dl"),
        Tag::DefinitionListTitle => custom("dt"),
        Tag::DefinitionListDefinition => custom("dd"),
        Tag::Table(alignments) => NodeKind::Table {
            alignments: alignments.into_iter().map(align).collect(),
        },
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell {
            header: false,
            align: None,
        },
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Superscript => custom("sup"),
        Tag::Subscript => custom("sub"),
        Tag::Link { dest_url, title, .. } => NodeKind::Link {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        Tag::Image { dest_url, title, .. } => NodeKind::Image {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(body: &str) -> Node {
        TreeBuilder::new().build(body).unwrap()
    }

    #[test]
    fn test_build_simple_markdown() {
        let tree = build("# Hello World\n\nThis is a *test*.");

        assert_eq!(tree.kind, NodeKind::Document);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].kind, NodeKind::Heading { level: 1, id: None });
        assert_eq!(tree.children[0].text_content(), "Hello World");
        assert_eq!(tree.children[1].kind, NodeKind::Paragraph);
        assert_eq!(tree.children[1].children[1].kind, NodeKind::Emphasis);
    }

    #[test]
    fn test_code_block_raw_text() {
        let tree = build("```rust title=\"main.rs\"\nfn main() {\n    println!(\"{{ x }}\");\n}\n```");

        let NodeKind::CodeBlock {
            language,
            meta,
            raw_text,
        } = &tree.children[0].kind
        else {
            panic!("expected code block, got {:?}", tree.children[0].kind);
        };
        assert_eq!(language.as_deref(), Some("rust"));
        assert_eq!(meta.as_deref(), Some("title=\"main.rs\""));
        assert_eq!(raw_text, "fn main() {\n    println!(\"{{ x }}\");\n}\n");
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_code_title_info_kept_whole() {
        let tree = build("```js:app.js\nlet a = 1;\n```");
        assert!(matches!(
            &tree.children[0].kind,
            NodeKind::CodeBlock { language: Some(l), meta: None, .. } if l == "js:app.js"
        ));
    }

    #[test]
    fn test_indented_code_block() {
        let tree = build("    plain code\n");
        assert!(matches!(
            &tree.children[0].kind,
            NodeKind::CodeBlock { language: None, raw_text, .. } if raw_text == "plain code\n"
        ));
    }

    #[test]
    fn test_footnotes() {
        let tree = build("Text[^a] and[^missing].\n\n[^a]: The note.\n");

        let refs = tree.count_where(|k| matches!(k, NodeKind::FootnoteReference { .. }));
        assert_eq!(refs, 2);
        let defs = tree.count_where(|k| matches!(k, NodeKind::FootnoteDefinition { label } if label == "a"));
        assert_eq!(defs, 1);
    }

    #[test]
    fn test_heading_attribute_id() {
        let tree = build("## Custom {#my-id}\n");
        assert_eq!(
            tree.children[0].kind,
            NodeKind::Heading {
                level: 2,
                id: Some("my-id".into())
            }
        );
        assert_eq!(tree.children[0].text_content(), "Custom");
    }

    #[test]
    fn test_table_alignments() {
        let tree = build("| A | B | C |\n|:--|:-:|---|\n| 1 | 2 | 3 |\n");

        let table = &tree.children[0];
        assert_eq!(
            table.kind,
            NodeKind::Table {
                alignments: vec![Some(Align::Left), Some(Align::Center), None]
            }
        );
        assert_eq!(table.children[0].kind, NodeKind::TableHead);
        assert_eq!(table.children[1].kind, NodeKind::TableRow);
    }

    #[test]
    fn test_task_list() {
        let tree = build("- [x] Done\n- [ ] Not done\n- plain\n");

        let items: Vec<_> = tree.children[0].children.iter().map(|n| n.kind.clone()).collect();
        assert_eq!(
            items,
            vec![
                NodeKind::ListItem { checked: Some(true) },
                NodeKind::ListItem { checked: Some(false) },
                NodeKind::ListItem { checked: None },
            ]
        );
    }

    #[test]
    fn test_image_and_link() {
        let tree = build("![Alt *text*](/a.png \"Title\") [site](https://example.com)");

        let para = &tree.children[0];
        assert_eq!(
            para.children[0].kind,
            NodeKind::Image {
                url: "/a.png".into(),
                title: "Title".into()
            }
        );
        assert_eq!(para.children[0].text_content(), "Alt text");
        assert!(matches!(&para.children[2].kind, NodeKind::Link { url, .. } if url == "https://example.com"));
    }

    #[test]
    fn test_expression_recognized_outside_code() {
        let tree = build("Hi {{ name }}, see `{{ raw }}`.");

        assert_eq!(tree.count_where(|k| matches!(k, NodeKind::Expression { .. })), 1);
        assert_eq!(
            tree.count_where(|k| matches!(k, NodeKind::InlineCode { value } if value == "{{ raw }}")),
            1
        );
    }

    #[test]
    fn test_bare_builder_keeps_text() {
        let builder = TreeBuilder::bare();
        assert!(builder.recognizer_names().is_empty());
        let tree = builder.build("Hi {{ name }}").unwrap();
        assert_eq!(tree.count_where(|k| matches!(k, NodeKind::Expression { .. })), 0);
        assert_eq!(tree.text_content(), "Hi {{ name }}");
    }

    #[test]
    fn test_empty_body() {
        let tree = build("");
        assert_eq!(tree, Node::document(Vec::new()));
    }

    #[test]
    fn test_unclosed_stream_is_unparseable() {
        let events = vec![
            Event::Start(Tag::BlockQuote(None)),
            Event::Start(Tag::Paragraph),
            Event::Text("dangling".into()),
        ];
        let err = TreeBuilder::new().assemble(events).unwrap_err();
        let ParserError::UnparseableDocument { path, message } = err;
        assert_eq!(path, "0/0");
        assert!(message.contains("unclosed"));
    }

    #[test]
    fn test_mismatched_end_is_unparseable() {
        let events = vec![
            Event::Start(Tag::Paragraph),
            Event::End(TagEnd::Emphasis),
        ];
        let err = TreeBuilder::new().assemble(events).unwrap_err();
        assert!(err.to_string().contains("expected end of Paragraph"));

        let events = vec![Event::End(TagEnd::Paragraph)];
        assert!(TreeBuilder::new().assemble(events).is_err());
    }
}
