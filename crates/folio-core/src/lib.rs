//! Folio Core Library
//!
//! Core types, metadata extraction, configuration, and error handling for the
//! Folio document compilation pipeline.

pub mod config;
pub mod document;
pub mod error;
pub mod metadata;
pub mod tree;

pub use config::{BackendConfig, CompileStrategy, Config, Phase, StageConfig};
pub use document::Document;
pub use error::{CoreError, Result};
pub use metadata::{Metadata, MetadataSchema, MetaValue};
pub use tree::{Node, NodeKind};
