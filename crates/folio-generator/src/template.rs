//! Lightweight templates with `{{ name }}` interpolation.
//!
//! Precompiled artifacts are templates: the emitted HTML with one placeholder
//! per expression node. `{{ name? }}` renders as empty when the prop is absent;
//! a bare `{{ name }}` is required.

use std::collections::HashMap;

use folio_core::Metadata;
use thiserror::Error;

/// Template errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Props available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding the display value of every metadata field.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mut ctx = Self::new();
        for (key, value) in metadata.iter() {
            ctx.insert(key, value.to_display());
        }
        ctx
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Create context with initial variables.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Overlay `other` on this context; its values win.
    #[must_use]
    pub fn merged(mut self, other: &TemplateContext) -> Self {
        for (key, value) in &other.variables {
            self.variables.insert(key.clone(), value.clone());
        }
        self
    }

    /// Transform every value.
    #[must_use]
    pub fn map_values(mut self, f: impl Fn(&str) -> String) -> Self {
        for value in self.variables.values_mut() {
            *value = f(value);
        }
        self
    }

    /// Get a variable value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Check if a variable exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, optional: bool },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source, checking every placeholder.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| TemplateError::InvalidSyntax("unclosed {{ delimiter".to_string()))?;

            let inner = after[..end].trim();
            let (name, optional) = match inner.strip_suffix('?') {
                Some(stripped) => (stripped.trim_end(), true),
                None => (inner, false),
            };
            if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '{') {
                return Err(TemplateError::InvalidSyntax(format!("bad placeholder `{{{{{inner}}}}}`")));
            }
            segments.push(Segment::Placeholder {
                name: name.to_string(),
                optional,
            });
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Names of all placeholders, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render the template with the given context.
    ///
    /// Prop values are inserted verbatim and never re-scanned for placeholders.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, optional } => match context.get(name) {
                    Some(value) => out.push_str(value),
                    None if *optional => {}
                    None => return Err(TemplateError::MissingVariable(name.clone())),
                },
            }
        }
        Ok(out)
    }
}
