//! The built-in transform stages.
//!
//! Phase A (source tree): [`CodeTitle`], [`Footnotes`], [`ImageComponent`].
//! Phase B (rendered tree): [`HeadingSlug`], [`Highlight`], [`Minify`].

mod code_title;
mod footnotes;
mod heading_slug;
mod highlight;
mod image;
mod minify;

pub use code_title::CodeTitle;
use folio_core::StageConfig;
pub use footnotes::Footnotes;
pub use heading_slug::HeadingSlug;
pub use highlight::Highlight;
pub use image::ImageComponent;
pub use minify::Minify;

use crate::transform::TransformStage;

/// Build the stage a configuration entry describes.
pub fn instantiate(config: &StageConfig) -> Box<dyn TransformStage> {
    match config {
        StageConfig::CodeTitle => Box::new(CodeTitle),
        StageConfig::Footnotes {
            inline_notes,
            inline_short,
            inline_max_len,
        } => Box::new(Footnotes {
            inline_notes: *inline_notes,
            inline_short: *inline_short,
            inline_max_len: *inline_max_len,
        }),
        StageConfig::ImageComponent { dimensions } => Box::new(ImageComponent {
            dimensions: dimensions.clone(),
        }),
        StageConfig::HeadingSlug => Box::new(HeadingSlug),
        StageConfig::Highlight { strict } => Box::new(Highlight::new(*strict)),
        StageConfig::Minify => Box::new(Minify),
    }
}
