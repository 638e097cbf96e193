//! Image components.

use std::collections::BTreeMap;

use folio_core::{Node, NodeKind, config::ImageSize};

use crate::transform::{StageContext, StageError, TransformStage};

/// Replaces every image with an embeddable image component.
///
/// Sizes come from the `dimensions` table, keyed by url, or from a `=WxH`
/// hint in the image title.
#[derive(Debug, Clone, Default)]
pub struct ImageComponent {
    pub dimensions: BTreeMap<String, ImageSize>,
}

impl TransformStage for ImageComponent {
    fn name(&self) -> &str {
        "image-component"
    }

    fn apply(&self, tree: &mut Node, _ctx: &mut StageContext) -> Result<(), StageError> {
        tree.walk_mut(&mut |node| {
            let NodeKind::Image { url, title } = &node.kind else {
                return;
            };
            let size = self
                .dimensions
                .get(url)
                .copied()
                .or_else(|| size_hint(title));
            node.kind = NodeKind::ImageComponent {
                url: url.clone(),
                alt: node.text_content(),
                width: size.map(|s| s.width),
                height: size.map(|s| s.height),
            };
            node.children.clear();
        });
        Ok(())
    }
}

/// Parse a `=800x600` title hint.
fn size_hint(title: &str) -> Option<ImageSize> {
    let (width, height) = title.trim().strip_prefix('=')?.split_once(['x', 'X'])?;
    Some(ImageSize {
        width: width.trim().parse().ok()?,
        height: height.trim().parse().ok()?,
    })
}
