//! Heading anchors.

use std::collections::HashSet;

use folio_core::{Node, NodeKind, document::slugify};

use crate::transform::{StageContext, StageError, TransformStage};

/// Gives every heading a document-unique id derived from its text.
///
/// Explicit `{#id}` attributes are kept and reserve their id. Repeated slugs
/// get `-2`, `-3`, ... in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingSlug;

impl TransformStage for HeadingSlug {
    fn name(&self) -> &str {
        "heading-slug"
    }

    fn apply(&self, tree: &mut Node, ctx: &mut StageContext) -> Result<(), StageError> {
        let mut used = HashSet::new();
        let mut duplicates = Vec::new();
        tree.walk(&mut |node| {
            if let NodeKind::Heading { id: Some(id), .. } = &node.kind
                && !used.insert(id.clone())
            {
                duplicates.push(id.clone());
            }
        });
        for id in duplicates {
            ctx.warn(format!("heading id `{id}` is used more than once"));
        }

        tree.walk_mut(&mut |node| {
            if !matches!(node.kind, NodeKind::Heading { id: None, .. }) {
                return;
            }
            let slug = unique_slug(&node.text_content(), &mut used);
            if let NodeKind::Heading { id, .. } = &mut node.kind {
                *id = Some(slug);
            }
        });
        Ok(())
    }
}

fn unique_slug(text: &str, used: &mut HashSet<String>) -> String {
    let base = match slugify(text) {
        s if s.is_empty() => "heading".to_string(),
        s => s,
    };
    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}
