//! Folio Generator Library
//!
//! Turns authored documents into cached, compiled artifacts.
//!
//! # Modules
//!
//! - [`transform`] - Transform stages, chains and diagnostics
//! - [`stages`] - The built-in Phase A and Phase B stages
//! - [`render`] - Generic renderer producing the structural tree
//! - [`html`] - HTML emission from a tree
//! - [`template`] - Placeholder templates used by precompiled artifacts
//! - [`compiler`] - Precompiled and on-demand compilation
//! - [`presentation`] - Invoking artifact code with props
//! - [`cache`] - Per-backend artifact cache
//! - [`store`] - Source document lookup
//! - [`pipeline`] - The per-document pipeline
//! - [`build`] - Parallel build orchestration

pub mod build;
pub mod cache;
pub mod compiler;
pub mod html;
pub mod pipeline;
pub mod presentation;
pub mod render;
pub mod stages;
pub mod store;
pub mod template;
pub mod transform;

pub use build::{BuildStats, Builder};
pub use cache::{CacheError, CacheStore};
pub use compiler::{CompiledArtifact, Compiler};
pub use pipeline::{Pipeline, PipelineError, RunOutput};
pub use presentation::{HtmlPresenter, Presentation};
pub use render::{GenericRenderer, StructuralRenderer};
pub use store::{DocumentStore, FsDocumentStore};
pub use template::{Template, TemplateContext};
pub use transform::{Diagnostic, Severity, StageContext, TransformChain, TransformStage};
