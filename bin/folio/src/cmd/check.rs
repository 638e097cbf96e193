//! Check command - validate configuration and content without writing

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use folio_generator::{Builder, FsDocumentStore, Pipeline};

use super::{load_config, print_diagnostics, select_backends};

/// Run the check command.
///
/// Compiles every document for the selected backends, reporting errors and
/// warnings. Nothing is written to the cache.
pub fn run(config_path: &Path, backends: &[String], strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    println!("Checking configuration...");
    let config = load_config(config_path)?;
    config.validate().wrap_err("Configuration invalid")?;
    println!("  ✓ Configuration valid");

    let store = FsDocumentStore::new(&config.content.dir, config.content.extension.trim_start_matches('.'));
    let mut errors = 0;
    let mut warnings = 0;

    for name in select_backends(&config, backends)? {
        println!("\nChecking backend `{name}`...");
        let pipeline = Pipeline::from_config(&config, &name)?;
        let stats = Builder::new(&pipeline, &store)
            .build_all()
            .wrap_err_with(|| format!("Failed to list documents in {}", config.content.dir))?;

        print_diagnostics(&stats.diagnostics);
        println!("  {} document(s), {} failed, {} warning(s)", stats.documents, stats.failed, stats.warnings);

        errors += stats.failed;
        warnings += stats.warnings;
    }

    println!();
    println!("Summary:");
    println!("  Errors:   {errors}");
    println!("  Warnings: {warnings}");

    if errors > 0 {
        bail!("Validation failed with {errors} error(s)");
    }

    if strict && warnings > 0 {
        bail!("Validation failed with {warnings} warning(s) (strict mode)");
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn site(post: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("post.mdx"), post).unwrap();
        fs::write(
            dir.path().join("folio.toml"),
            format!("[content]\ndir = {:?}\n", content.display().to_string()),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_check_passes_and_strict_fails_on_warnings() {
        let dir = site("---\ntitle: T\ndate: 2023-01-01\n---\nHello\n");
        let config = dir.path().join("folio.toml");
        let backends = ["mdx-bundler".to_string()];

        assert!(run(&config, &backends, false).is_ok());
        // Missing optional fields are warnings.
        assert!(run(&config, &backends, true).is_err());
    }

    #[test]
    fn test_check_fails_on_bad_metadata() {
        let dir = site("---\ntitle: T\n---\nHello\n");
        assert!(run(&dir.path().join("folio.toml"), &[], false).is_err());
    }
}
