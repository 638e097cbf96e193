//! Show command - render a cached artifact

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, eyre};
use folio_generator::{HtmlPresenter, Pipeline, Presentation, TemplateContext};

use super::load_config;

/// Parse a `key=value` prop.
pub fn parse_prop(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| eyre!("invalid prop `{raw}`: expected key=value"))?;
    if key.is_empty() {
        return Err(eyre!("invalid prop `{raw}`: empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Run the show command.
///
/// Reads `identifier` from the backend's cache and prints it as HTML.
pub fn run(config_path: &Path, backend: &str, identifier: &str, props: &[String]) -> Result<()> {
    tracing::info!(?config_path, backend, identifier, "Showing artifact");

    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config, backend)?;
    let cache = pipeline.cache_store(&config.cache.dir);

    let artifact = cache
        .read(identifier)
        .wrap_err_with(|| format!("Failed to read `{identifier}` from {}", cache.dir().display()))?;

    let mut context = TemplateContext::new();
    for raw in props {
        let (key, value) = parse_prop(raw)?;
        context.insert(key, value);
    }

    let html = HtmlPresenter
        .present(&artifact, &context)
        .wrap_err_with(|| format!("Failed to present `{identifier}`"))?;
    print!("{html}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prop() {
        assert_eq!(parse_prop("title=Hi=there").unwrap(), ("title".into(), "Hi=there".into()));
        assert_eq!(parse_prop("empty=").unwrap(), ("empty".into(), String::new()));
        assert!(parse_prop("novalue").is_err());
        assert!(parse_prop("=x").is_err());
    }
}
