//! HTML emission for rendered trees.
//!
//! The output is a [`Template`](crate::template::Template): document text is
//! escaped, literal braces included, so the only placeholders in it are the
//! ones emitted for expression nodes.

use folio_core::{Node, NodeKind};

/// Emit a tree as template source.
pub fn emit(tree: &Node) -> String {
    let mut out = String::new();
    emit_node(tree, &mut out);
    out
}

fn emit_children(node: &Node, out: &mut String) {
    for child in &node.children {
        emit_node(child, out);
    }
}

fn wrap(node: &Node, open: &str, close: &str, out: &mut String) {
    out.push_str(open);
    emit_children(node, out);
    out.push_str(close);
}

fn code_body(node: &Node, raw_text: &str, out: &mut String) {
    if node.children.is_empty() {
        out.push_str(&escape(raw_text));
    } else {
        emit_children(node, out);
    }
}

fn language_class(language: Option<&str>) -> String {
    language
        .map(|l| format!(" class=\"language-{}\"", escape(l)))
        .unwrap_or_default()
}

fn emit_node(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Document | NodeKind::Fragment => emit_children(node, out),

        NodeKind::Heading { level, id } => {
            let id_attr = id
                .as_ref()
                .map(|i| format!(" id=\"{}\"", escape(i)))
                .unwrap_or_default();
            wrap(node, &format!("<h{level}{id_attr}>"), &format!("</h{level}>\n"), out);
        }
        NodeKind::Paragraph => wrap(node, "<p>", "</p>\n", out),
        NodeKind::Text { value } => out.push_str(&escape(value)),
        NodeKind::Emphasis => wrap(node, "<em>", "</em>", out),
        NodeKind::Strong => wrap(node, "<strong>", "</strong>", out),
        NodeKind::Strikethrough => wrap(node, "<del>", "</del>", out),
        NodeKind::InlineCode { value } => {
            out.push_str(&format!("<code>{}</code>", escape(value)));
        }

        NodeKind::CodeBlock {
            language, raw_text, ..
        } => {
            let class = language_class(language.as_deref());
            out.push_str(&format!("<pre{class}><code{class}>"));
            code_body(node, raw_text, out);
            out.push_str("</code></pre>\n");
        }
        NodeKind::CodeBlockWithTitle {
            title,
            language,
            raw_text,
        } => {
            let class = language_class(language.as_deref());
            out.push_str(&format!(
                "<div class=\"code-block\"><div class=\"code-title\">{}</div><pre{class}><code{class}>",
                escape(title)
            ));
            code_body(node, raw_text, out);
            out.push_str("</code></pre></div>\n");
        }
        NodeKind::Token { class } => {
            wrap(node, &format!("<span class=\"token {}\">", escape(class)), "</span>", out);
        }

        NodeKind::Image { url, title } => {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\"{} />",
                escape(url),
                escape(&node.text_content()),
                optional_attr("title", title)
            ));
        }
        NodeKind::ImageComponent {
            url,
            alt,
            width,
            height,
        } => {
            out.push_str(&format!("<img src=\"{}\" alt=\"{}\"", escape(url), escape(alt)));
            if let Some(width) = width {
                out.push_str(&format!(" width=\"{width}\""));
            }
            if let Some(height) = height {
                out.push_str(&format!(" height=\"{height}\""));
            }
            out.push_str(" loading=\"lazy\" decoding=\"async\" />");
        }
        NodeKind::Link { url, title } => {
            let open = format!("<a href=\"{}\"{}>", escape(url), optional_attr("title", title));
            wrap(node, &open, "</a>", out);
        }

        NodeKind::BlockQuote => wrap(node, "<blockquote>\n", "</blockquote>\n", out),
        NodeKind::List { ordered: true, start } => {
            let start = match start {
                Some(n) if *n != 1 => format!(" start=\"{n}\""),
                _ => String::new(),
            };
            wrap(node, &format!("<ol{start}>\n"), "</ol>\n", out);
        }
        NodeKind::List { ordered: false, .. } => wrap(node, "<ul>\n", "</ul>\n", out),
        NodeKind::ListItem { checked } => {
            out.push_str("<li>");
            match checked {
                Some(true) => out.push_str("<input type=\"checkbox\" checked disabled /> "),
                Some(false) => out.push_str("<input type=\"checkbox\" disabled /> "),
                None => {}
            }
            emit_children(node, out);
            out.push_str("</li>\n");
        }

        NodeKind::Table { .. } => wrap(node, "<table>\n", "</table>\n", out),
        NodeKind::TableHead => wrap(node, "<thead>\n", "</thead>\n", out),
        NodeKind::TableBody => wrap(node, "<tbody>\n", "</tbody>\n", out),
        NodeKind::TableRow => wrap(node, "<tr>", "</tr>\n", out),
        NodeKind::TableCell { header, align } => {
            let tag = if *header { "th" } else { "td" };
            let style = align
                .map(|a| format!(" style=\"text-align: {}\"", a.as_str()))
                .unwrap_or_default();
            wrap(node, &format!("<{tag}{style}>"), &format!("</{tag}>"), out);
        }

        NodeKind::ThematicBreak => out.push_str("<hr />\n"),
        NodeKind::SoftBreak => out.push('\n'),
        NodeKind::HardBreak => out.push_str("<br />\n"),
        NodeKind::Html { value } => out.push_str(&guard_placeholders(value)),

        NodeKind::FootnoteReference { label } | NodeKind::BrokenReference { label } => {
            out.push_str(&format!("<sup class=\"footnote-missing\">[^{}]</sup>", escape(label)));
        }
        NodeKind::FootnoteDefinition { label } => {
            let open = format!("<div class=\"footnote-definition\" id=\"fn-{}\">", escape(label));
            wrap(node, &open, "</div>\n", out);
        }
        NodeKind::FootnoteCrossReference { ordinal, .. } => {
            out.push_str(&format!(
                "<sup class=\"footnote-ref\"><a href=\"#fn-{ordinal}\">{ordinal}</a></sup>"
            ));
        }
        NodeKind::InlineNote { .. } => wrap(node, "<span class=\"inline-note\">", "</span>", out),
        NodeKind::FootnoteList => wrap(node, "<section class=\"footnotes\">\n<ol>\n", "</ol>\n</section>\n", out),
        NodeKind::FootnoteItem { ordinal, .. } => {
            wrap(node, &format!("<li id=\"fn-{ordinal}\">"), "</li>\n", out);
        }

        NodeKind::Section { depth } => {
            wrap(node, &format!("<section data-depth=\"{depth}\">\n"), "</section>\n", out);
        }
        NodeKind::Expression { name } => {
            out.push_str(&format!("{{{{ {name}? }}}}"));
        }
        NodeKind::Custom { name, attributes } => {
            if !is_element_name(name) {
                emit_children(node, out);
                return;
            }
            out.push_str(&format!("<{name}"));
            for (key, value) in attributes.iter().filter(|(k, _)| is_element_name(k)) {
                out.push_str(&format!(" {key}=\"{}\"", escape(value)));
            }
            out.push('>');
            emit_children(node, out);
            out.push_str(&format!("</{name}>"));
        }
    }
}

fn optional_attr(name: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!(" {name}=\"{}\"", escape(value))
    }
}

fn is_element_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Escape text for HTML, braces included.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            c => out.push(c),
        }
    }
    out
}

/// Break up `{{` in raw HTML so it cannot open a placeholder.
fn guard_placeholders(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            out.push_str("&#123;");
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use folio_core::tree::Align;

    use super::*;

    fn para(children: Vec<Node>) -> Node {
        Node::with_children(NodeKind::Paragraph, children)
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<script>"), "&lt;script&gt;");
        assert_eq!(escape("a & b"), "a &amp; b");
        assert_eq!(escape("{{ x }}"), "&#123;&#123; x &#125;&#125;");
    }

    #[test]
    fn test_emit_paragraph_and_expression() {
        let tree = Node::document(vec![para(vec![
            Node::text("Hi "),
            Node::new(NodeKind::Expression { name: "name".into() }),
            Node::text(" {literal}"),
        ])]);
        assert_eq!(emit(&tree), "<p>Hi {{ name? }} &#123;literal&#125;</p>\n");
    }

    #[test]
    fn test_emit_titled_code() {
        let tree = Node::new(NodeKind::CodeBlockWithTitle {
            title: "main.rs".into(),
            language: Some("rust".into()),
            raw_text: "a < b\n".into(),
        });
        assert_eq!(
            emit(&tree),
            "<div class=\"code-block\"><div class=\"code-title\">main.rs</div>\
             <pre class=\"language-rust\"><code class=\"language-rust\">a &lt; b\n</code></pre></div>\n"
        );
    }

    #[test]
    fn test_emit_tokens() {
        let tree = Node::with_children(
            NodeKind::CodeBlock {
                language: Some("rust".into()),
                meta: None,
                raw_text: "fn x".into(),
            },
            vec![
                Node::with_children(NodeKind::Token { class: "keyword".into() }, vec![Node::text("fn")]),
                Node::text(" x"),
            ],
        );
        assert!(emit(&tree).contains("<span class=\"token keyword\">fn</span> x"));
    }

    #[test]
    fn test_emit_image_component() {
        let tree = Node::new(NodeKind::ImageComponent {
            url: "/a.png".into(),
            alt: "A \"cat\"".into(),
            width: Some(10),
            height: None,
        });
        assert_eq!(
            emit(&tree),
            "<img src=\"/a.png\" alt=\"A &quot;cat&quot;\" width=\"10\" loading=\"lazy\" decoding=\"async\" />"
        );
    }

    #[test]
    fn test_emit_footnotes() {
        let tree = Node::document(vec![
            para(vec![Node::new(NodeKind::FootnoteCrossReference {
                label: "a".into(),
                ordinal: 1,
            })]),
            Node::with_children(
                NodeKind::FootnoteList,
                vec![Node::with_children(
                    NodeKind::FootnoteItem {
                        label: "a".into(),
                        ordinal: 1,
                    },
                    vec![para(vec![Node::text("Note")])],
                )],
            ),
        ]);
        let html = emit(&tree);
        assert!(html.contains("<a href=\"#fn-1\">1</a>"));
        assert!(html.contains("<li id=\"fn-1\"><p>Note</p>\n</li>"));
    }

    #[test]
    fn test_emit_table_cells() {
        let cell = Node::with_children(
            NodeKind::TableCell {
                header: true,
                align: Some(Align::Center),
            },
            vec![Node::text("H")],
        );
        assert_eq!(emit(&cell), "<th style=\"text-align: center\">H</th>");
    }

    #[test]
    fn test_emit_custom_and_raw_html() {
        let sup = Node::with_children(
            NodeKind::Custom {
                name: "sup".into(),
                attributes: BTreeMap::new(),
            },
            vec![Node::text("2")],
        );
        assert_eq!(emit(&sup), "<sup>2</sup>");

        let bogus = Node::with_children(
            NodeKind::Custom {
                name: "<script>".into(),
                attributes: BTreeMap::new(),
            },
            vec![Node::text("x")],
        );
        assert_eq!(emit(&bogus), "x");

        let raw = Node::new(NodeKind::Html {
            value: "<div data-x=\"{{ y }}\">".into(),
        });
        assert_eq!(emit(&raw), "<div data-x=\"&#123;{ y }}\">");
    }

    #[test]
    fn test_emit_attributes_and_markers() {
        let mut attributes = BTreeMap::new();
        attributes.insert("data-n".to_string(), "1 & 2".to_string());
        attributes.insert("on click".to_string(), "x".to_string());
        let custom = Node::new(NodeKind::Custom {
            name: "abbr".into(),
            attributes,
        });
        assert_eq!(emit(&custom), "<abbr data-n=\"1 &amp; 2\"></abbr>");

        let tree = para(vec![
            Node::new(NodeKind::InlineCode { value: "<T>".into() }),
            Node::new(NodeKind::BrokenReference { label: "x&y".into() }),
            Node::with_children(NodeKind::InlineNote { label: "n".into() }, vec![Node::text("aside")]),
        ]);
        assert_eq!(
            emit(&tree),
            "<p><code>&lt;T&gt;</code><sup class=\"footnote-missing\">[^x&amp;y]</sup>\
             <span class=\"inline-note\">aside</span></p>\n"
        );
    }
}
