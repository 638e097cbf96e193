//! Folio Parser Library
//!
//! Builds syntax trees from markdown bodies and tokenizes code for highlighting.

pub mod markdown;
pub mod recognize;
pub mod syntax;

pub use markdown::TreeBuilder;
pub use recognize::{ExpressionRecognizer, InlineRecognizer};
pub use syntax::{SyntaxError, SyntaxHighlighter, Token};
use thiserror::Error;

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    /// The event stream could not be assembled into a tree.
    #[error("unparseable document at node path [{path}]: {message}")]
    UnparseableDocument { path: String, message: String },
}

impl ParserError {
    /// Create an unparseable-document error at a node path.
    pub fn unparseable(path: &[usize], message: impl Into<String>) -> Self {
        Self::UnparseableDocument {
            path: path
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join("/"),
            message: message.into(),
        }
    }
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;
