//! Command implementations.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use folio_core::Config;
use folio_generator::Diagnostic;

pub mod build;
pub mod check;
pub mod show;

/// Load the configuration, falling back to defaults when the file is absent.
///
/// `FOLIO__*` environment variables override file values.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_with_env(path)
        .wrap_err_with(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Backends named on the command line, or every configured backend.
pub fn select_backends(config: &Config, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(config.backends.keys().cloned().collect());
    }
    for name in requested {
        config.backend(name)?;
    }
    Ok(requested.to_vec())
}

/// Print diagnostics, errors first.
pub(crate) fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
        println!("  ✗ {diagnostic}");
    }
    for diagnostic in diagnostics.iter().filter(|d| !d.is_error()) {
        println!("  ⚠ {diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_backends() {
        let config = Config::default();

        let all = select_backends(&config, &[]).unwrap();
        assert_eq!(all, vec!["contentlayer", "mdx-bundler", "next-mdx-remote"]);

        let one = select_backends(&config, &["mdx-bundler".to_string()]).unwrap();
        assert_eq!(one, vec!["mdx-bundler"]);

        assert!(select_backends(&config, &["gatsby".to_string()]).is_err());
    }

    #[test]
    fn test_load_config_without_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.backends.len(), 3);
    }
}
