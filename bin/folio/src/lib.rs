//! Folio CLI Library
//!
//! Drives the Folio pipeline from the command line: it picks a backend,
//! runs the build, and reports diagnostics. The binary entry point lives in
//! `main.rs`.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check, show)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use folio::cmd;
//!
//! // Compile every document for the `mdx-bundler` backend
//! cmd::build::run(Path::new("folio.toml"), &["mdx-bundler".to_string()], &[]).unwrap();
//! ```

pub mod cmd;

// Re-export core types for convenience
pub use folio_core::{Config, Document};
pub use folio_generator::{BuildStats, Builder, Pipeline};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
