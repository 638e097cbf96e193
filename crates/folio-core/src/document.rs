//! Documents and their identifiers.

use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, Result};

/// A source document addressed by a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    identifier: String,
    raw_source: String,
}

impl Document {
    /// Create a document from an identifier and its raw source.
    pub fn new(identifier: impl Into<String>, raw_source: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            raw_source: raw_source.into(),
        }
    }

    /// The corpus-unique identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The raw source text, header included.
    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }
}

/// Derive a document identifier from its location relative to `root`.
///
/// Supports patterns like:
/// - `blog/sample.mdx` → `blog/sample`
/// - `blog/sample/index.mdx` → `blog/sample`
/// - `index.mdx` → `index`
pub fn identifier_from_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let stem = relative.file_stem()?.to_str()?;
    let parent = relative.parent().unwrap_or(Path::new(""));

    let identifier = if stem == "index" && !parent.as_os_str().is_empty() {
        parent.to_string_lossy().to_string()
    } else if parent.as_os_str().is_empty() {
        stem.to_string()
    } else {
        format!("{}/{}", parent.display(), stem)
    };

    let identifier = identifier.replace('\\', "/");
    let identifier = identifier.trim_matches('/');
    (!identifier.is_empty()).then(|| identifier.to_string())
}

/// Map an identifier to a relative path, rejecting anything that escapes the root.
pub fn identifier_to_relative_path(identifier: &str, extension: &str) -> Result<PathBuf> {
    if identifier.is_empty() || identifier.starts_with('/') || identifier.contains('\\') {
        return Err(CoreError::InvalidIdentifier(identifier.to_string()));
    }

    let path = PathBuf::from(format!("{identifier}.{extension}"));
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(CoreError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(path)
}

/// The derived `slug` field: the identifier normalized for use in URLs.
///
/// Each path segment is lowercased, whitespace and underscores become `-`,
/// and any other punctuation is dropped: `Notes/Hello World` → `notes/hello-world`.
pub fn derive_slug(identifier: &str) -> String {
    identifier
        .split('/')
        .map(slugify)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert text to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_simple() {
        let id = identifier_from_path(Path::new("data"), Path::new("data/blog/sample.mdx"));
        assert_eq!(id.as_deref(), Some("blog/sample"));
    }

    #[test]
    fn test_identifier_index_file() {
        let id = identifier_from_path(Path::new("data"), Path::new("data/blog/sample/index.mdx"));
        assert_eq!(id.as_deref(), Some("blog/sample"));
    }

    #[test]
    fn test_identifier_root_file() {
        let id = identifier_from_path(Path::new("data"), Path::new("data/sample.md"));
        assert_eq!(id.as_deref(), Some("sample"));
    }

    #[test]
    fn test_relative_path_rejects_escape() {
        assert!(identifier_to_relative_path("../etc/passwd", "mdx").is_err());
        assert!(identifier_to_relative_path("/abs", "mdx").is_err());
        assert!(identifier_to_relative_path("", "mdx").is_err());
        assert_eq!(
            identifier_to_relative_path("blog/sample", "json").unwrap(),
            PathBuf::from("blog/sample.json")
        );
    }

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug("sample"), "sample");
        assert_eq!(derive_slug("Notes/Hello World"), "notes/hello-world");
        assert_eq!(derive_slug("2023/first_post"), "2023/first-post");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test 123 Post"), "test-123-post");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Special!@#Chars"), "specialchars");
    }

    #[test]
    fn test_document_accessors() {
        let doc = Document::new("sample", "# hi");
        assert_eq!(doc.identifier(), "sample");
        assert_eq!(doc.raw_source(), "# hi");
    }
}
