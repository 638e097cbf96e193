//! Build command - compiles documents into the artifact cache

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr, bail};
use folio_generator::{Builder, FsDocumentStore, Pipeline};

use super::{load_config, print_diagnostics, select_backends};

/// Run the build command.
///
/// Compiles `identifiers` (or every document in the content directory) for
/// each selected backend and writes the artifacts to the cache.
pub fn run(config_path: &Path, backends: &[String], identifiers: &[String]) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?backends, count = identifiers.len(), "Starting build");

    let config = load_config(config_path)?;
    let store = FsDocumentStore::new(&config.content.dir, config.content.extension.trim_start_matches('.'));

    let mut failed = 0;
    for name in select_backends(&config, backends)? {
        let pipeline = Pipeline::from_config(&config, &name)
            .wrap_err_with(|| format!("Failed to configure backend `{name}`"))?;
        let cache = pipeline.cache_store(&config.cache.dir);
        let builder = Builder::new(&pipeline, &store).with_cache(&cache);

        let stats = if identifiers.is_empty() {
            builder
                .build_all()
                .wrap_err_with(|| format!("Failed to list documents in {}", config.content.dir))?
        } else {
            builder.build(identifiers)
        };

        println!();
        println!("  Backend:    {name}");
        println!("  Documents:  {}", stats.documents);
        println!("  Written:    {}", stats.written);
        println!("  Failed:     {}", stats.failed);
        println!("  Warnings:   {}", stats.warnings);
        println!("  Output:     {}", cache.dir().display());
        if !stats.diagnostics.is_empty() {
            println!();
            print_diagnostics(&stats.diagnostics);
        }

        failed += stats.failed;
    }

    let duration = start.elapsed();
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!();

    if failed > 0 {
        bail!("Build failed for {failed} document(s)");
    }

    tracing::info!(?duration, "Build completed successfully");
    Ok(())
}
