//! Titled code blocks.

use folio_core::{Node, NodeKind};

use crate::transform::{StageContext, StageError, TransformStage};

/// Turns a code fence that carries a caption into a titled code block.
///
/// Recognized captions:
/// - `lang:title`
/// - `lang title="…"` (or single quotes)
/// - `lang file.ext` when the meta is a single file name
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeTitle;

impl TransformStage for CodeTitle {
    fn name(&self) -> &str {
        "code-title"
    }

    fn apply(&self, tree: &mut Node, _ctx: &mut StageContext) -> Result<(), StageError> {
        tree.walk_mut(&mut |node| {
            let NodeKind::CodeBlock {
                language,
                meta,
                raw_text,
            } = &node.kind
            else {
                return;
            };
            if let Some((language, title)) = caption(language.as_deref(), meta.as_deref()) {
                node.kind = NodeKind::CodeBlockWithTitle {
                    title,
                    language,
                    raw_text: raw_text.clone(),
                };
            }
        });
        Ok(())
    }
}

/// Split the fence info into `(language, title)` when it carries a caption.
fn caption(language: Option<&str>, meta: Option<&str>) -> Option<(Option<String>, String)> {
    if let Some((lang, title)) = language.and_then(|l| l.split_once(':')) {
        let title = title.trim();
        if !title.is_empty() {
            let lang = (!lang.is_empty()).then(|| lang.to_string());
            return Some((lang, title.to_string()));
        }
    }

    let meta = meta?.trim();
    let title = match title_attribute(meta) {
        Some(value) => quoted(value)?,
        None if is_file_name(meta) => meta.to_string(),
        None => return None,
    };
    Some((language.map(str::to_string), title))
}

fn quoted(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &text[1..];
    let end = rest.find(quote)?;
    let title = rest[..end].trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// The text after a `title=` that starts a meta word.
fn title_attribute(meta: &str) -> Option<&str> {
    meta.match_indices("title=")
        .find(|(at, _)| meta[..*at].chars().next_back().is_none_or(char::is_whitespace))
        .map(|(at, key)| &meta[at + key.len()..])
}

/// A lone word like `main.rs`; flags such as `ignore` or `{1,3}` are not titles.
fn is_file_name(meta: &str) -> bool {
    if meta.contains(char::is_whitespace) || meta.contains(['=', '{', '}']) {
        return false;
    }
    meta.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}
