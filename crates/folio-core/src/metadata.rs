//! Metadata header extraction and schema handling.
//!
//! A document may open with a header block fenced by `---` (YAML) or `+++`
//! (TOML). The header is split off, each field is converted into a typed
//! [`MetaValue`] according to a caller supplied [`MetadataSchema`], and the
//! remaining text is handed on verbatim as the markup body.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// A single typed metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// Free-form text.
    String(String),
    /// A point in time, normalized to UTC.
    Date(DateTime<Utc>),
    /// A flag.
    Bool(bool),
    /// A list of strings (tags, image urls, ...).
    List(Vec<String>),
}

impl MetaValue {
    /// Borrow the value as a string if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a date if it is one.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Render the value as display text, used for presentation props.
    pub fn to_display(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Bool(b) => b.to_string(),
            Self::List(items) => items.join(", "),
        }
    }

    fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Self::String(s) => serde_yaml::Value::String(s.clone()),
            Self::Date(d) => serde_yaml::Value::String(format_date(d)),
            Self::Bool(b) => serde_yaml::Value::Bool(*b),
            Self::List(items) => serde_yaml::Value::Sequence(
                items
                    .iter()
                    .map(|s| serde_yaml::Value::String(s.clone()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&format_date(d)),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::List(items) => items.serialize(serializer),
        }
    }
}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Date,
    Boolean,
    List,
}

/// A field declared by a metadata schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as written in the header.
    pub name: String,

    /// Expected value type.
    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Whether the field must be present.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// Declare an optional field.
    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
        }
    }

    /// Declare a required field.
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
        }
    }
}

/// The set of fields a document header may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSchema {
    fields: IndexMap<String, FieldSpec>,
    strict: bool,
}

impl Default for MetadataSchema {
    fn default() -> Self {
        Self::blog()
    }
}

impl MetadataSchema {
    /// Schema with only the required `title` and `date` fields.
    pub fn new(strict: bool) -> Self {
        let mut schema = Self {
            fields: IndexMap::new(),
            strict,
        };
        schema.declare(FieldSpec::required("title", FieldType::String));
        schema.declare(FieldSpec::required("date", FieldType::Date));
        schema
    }

    /// The blog post schema: required `title`/`date` plus the usual optional fields.
    pub fn blog() -> Self {
        let mut schema = Self::new(false);
        for (name, ty) in [
            ("tags", FieldType::List),
            ("lastmod", FieldType::Date),
            ("draft", FieldType::Boolean),
            ("summary", FieldType::String),
            ("images", FieldType::List),
            ("layout", FieldType::String),
            ("series", FieldType::String),
            ("bibliography", FieldType::String),
            ("canonicalUrl", FieldType::String),
        ] {
            schema.declare(FieldSpec::optional(name, ty));
        }
        schema
    }

    /// Schema that declares nothing and passes every field through untyped.
    pub fn permissive() -> Self {
        Self {
            fields: IndexMap::new(),
            strict: false,
        }
    }

    /// Add or replace a field declaration.
    pub fn declare(&mut self, spec: FieldSpec) {
        self.fields.insert(spec.name.clone(), spec);
    }

    /// Builder form of [`MetadataSchema::declare`].
    #[must_use]
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.declare(spec);
        self
    }

    /// Set whether unknown fields are rejected.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Whether unknown fields are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Look up a declared field.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Check that every required field is present.
    ///
    /// `line` is reported on failure; callers pass the closing line of the header.
    pub fn validate(&self, metadata: &Metadata, line: usize) -> Result<()> {
        for spec in self.fields.values().filter(|f| f.required) {
            if !metadata.contains(&spec.name) {
                return Err(CoreError::malformed(
                    line,
                    format!("missing required field `{}`", spec.name),
                ));
            }
        }
        Ok(())
    }

    /// Names of declared optional fields absent from `metadata`.
    pub fn missing_optional<'a>(&'a self, metadata: &Metadata) -> Vec<&'a str> {
        self.fields
            .values()
            .filter(|f| !f.required && !metadata.contains(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Convert a raw header value into the declared (or inferred) type.
    fn coerce(&self, key: &str, raw: RawValue, line: usize) -> Result<MetaValue> {
        let Some(spec) = self.fields.get(key) else {
            if self.strict {
                return Err(CoreError::malformed(line, format!("unknown field `{key}`")));
            }
            return Ok(raw.into_untyped());
        };

        let mismatch = |found: &str| {
            CoreError::malformed(
                line,
                format!("field `{key}` expects {:?}, found {found}", spec.ty),
            )
        };

        match (spec.ty, raw) {
            (FieldType::String, RawValue::Text(s)) => Ok(MetaValue::String(s)),
            (FieldType::String, RawValue::Bool(b)) => Ok(MetaValue::String(b.to_string())),
            (FieldType::Date, RawValue::Text(s)) => parse_date(&s)
                .map(MetaValue::Date)
                .ok_or_else(|| CoreError::malformed(line, format!("field `{key}`: invalid date `{s}`"))),
            (FieldType::Boolean, RawValue::Bool(b)) => Ok(MetaValue::Bool(b)),
            (FieldType::Boolean, RawValue::Text(s)) => match s.as_str() {
                "true" => Ok(MetaValue::Bool(true)),
                "false" => Ok(MetaValue::Bool(false)),
                _ => Err(mismatch("text")),
            },
            (FieldType::List, RawValue::List(items)) => Ok(MetaValue::List(items)),
            (FieldType::List, RawValue::Text(s)) => Ok(MetaValue::List(vec![s])),
            (_, RawValue::List(_)) => Err(mismatch("a list")),
            (_, RawValue::Bool(_)) => Err(mismatch("a boolean")),
        }
    }
}

/// Ordered mapping from field name to typed value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: IndexMap<String, MetaValue>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.fields.insert(key.into(), value);
    }

    /// Insert a field at the end, moving it there if it already exists.
    pub fn append(&mut self, key: impl Into<String>, value: MetaValue) {
        let key = key.into();
        self.fields.shift_remove(&key);
        self.fields.insert(key, value);
    }

    /// Remove a field, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        self.fields.shift_remove(key)
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.fields.get(key)
    }

    /// Get a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetaValue::as_str)
    }

    /// Whether the field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The document title, if set.
    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in header order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Re-serialize as a `---` delimited YAML header.
    pub fn to_header(&self) -> Result<String> {
        let mapping: serde_yaml::Mapping = self
            .fields
            .iter()
            .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.to_yaml()))
            .collect();
        let body = if mapping.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&mapping)?
        };
        Ok(format!("---\n{body}---\n"))
    }

    /// Rebuild metadata from a flat JSON object, typing fields by `schema`.
    ///
    /// `skip` names keys that belong to the enclosing record rather than the metadata.
    pub fn from_json_object(
        object: &serde_json::Map<String, serde_json::Value>,
        schema: &MetadataSchema,
        skip: &[&str],
    ) -> std::result::Result<Self, String> {
        let mut metadata = Self::new();
        for (key, value) in object {
            if skip.contains(&key.as_str()) {
                continue;
            }
            let declared = schema.field(key).map(|f| f.ty);
            let value = match value {
                serde_json::Value::String(s) if declared == Some(FieldType::Date) => {
                    MetaValue::Date(parse_date(s).ok_or_else(|| format!("field `{key}`: invalid date `{s}`"))?)
                }
                serde_json::Value::String(s) => MetaValue::String(s.clone()),
                serde_json::Value::Bool(b) => MetaValue::Bool(*b),
                serde_json::Value::Number(n) => MetaValue::String(n.to_string()),
                serde_json::Value::Array(items) => MetaValue::List(
                    items
                        .iter()
                        .map(|item| {
                            item.as_str()
                                .map(str::to_string)
                                .ok_or_else(|| format!("field `{key}`: list items must be strings"))
                        })
                        .collect::<std::result::Result<_, _>>()?,
                ),
                serde_json::Value::Null => continue,
                serde_json::Value::Object(_) => {
                    return Err(format!("field `{key}`: nested objects are not metadata"));
                }
            };
            metadata.insert(key.clone(), value);
        }
        Ok(metadata)
    }
}

/// Delimiter types for metadata headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// YAML header delimited by `---`.
    Yaml,
    /// TOML header delimited by `+++`.
    Toml,
}

impl HeaderFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }

    fn detect(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// A header block split off the start of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader<'a> {
    /// Header syntax.
    pub format: HeaderFormat,
    /// Text between the delimiters.
    pub text: &'a str,
    /// Document line (1-based) of the first header line.
    pub first_line: usize,
    /// Document line (1-based) of the closing delimiter.
    pub closing_line: usize,
    /// Everything after the closing delimiter line, verbatim.
    pub body: &'a str,
}

/// Split a document into its header block and body.
///
/// Returns `Ok(None)` when the document does not open with a delimiter line.
pub fn split_header(source: &str) -> Result<Option<RawHeader<'_>>> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.split_inclusive('\n');

    let Some(opening) = lines.next() else {
        return Ok(None);
    };
    let Some(format) = HeaderFormat::detect(opening) else {
        return Ok(None);
    };

    let header_start = opening.len();
    let mut offset = header_start;
    for (index, line) in lines.enumerate() {
        if line.trim_end() == format.delimiter() {
            return Ok(Some(RawHeader {
                format,
                text: &source[header_start..offset],
                first_line: 2,
                closing_line: index + 2,
                body: &source[offset + line.len()..],
            }));
        }
        offset += line.len();
    }

    Err(CoreError::malformed(
        1,
        format!(
            "unterminated metadata header: missing closing `{}`",
            format.delimiter()
        ),
    ))
}

/// Result of extracting the header from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Typed header fields, in header order.
    pub metadata: Metadata,
    /// Markup body following the header.
    pub body: String,
    /// Line of the closing header delimiter, or 1 when there is no header.
    pub header_end_line: usize,
}

/// Extract and type the metadata header of `source`.
pub fn extract(source: &str, schema: &MetadataSchema) -> Result<Extracted> {
    let Some(header) = split_header(source)? else {
        return Ok(Extracted {
            metadata: Metadata::new(),
            body: source.to_string(),
            header_end_line: 1,
        });
    };

    let raw = match header.format {
        HeaderFormat::Yaml => parse_yaml_header(&header)?,
        HeaderFormat::Toml => parse_toml_header(&header)?,
    };

    let mut metadata = Metadata::new();
    for (key, value) in raw {
        let line = key_line(&header, &key);
        let value = schema.coerce(&key, value, line)?;
        metadata.insert(key, value);
    }

    Ok(Extracted {
        metadata,
        body: header.body.to_string(),
        header_end_line: header.closing_line,
    })
}

/// Untyped value as it appeared in the header.
#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Text(String),
    Bool(bool),
    List(Vec<String>),
}

impl RawValue {
    fn into_untyped(self) -> MetaValue {
        match self {
            Self::Text(s) => MetaValue::String(s),
            Self::Bool(b) => MetaValue::Bool(b),
            Self::List(items) => MetaValue::List(items),
        }
    }
}

fn parse_yaml_header(header: &RawHeader<'_>) -> Result<Vec<(String, RawValue)>> {
    if header.text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_yaml::Value = serde_yaml::from_str(header.text).map_err(|e| {
        let line = e
            .location()
            .map_or(header.first_line, |l| header.first_line + l.line() - 1);
        CoreError::malformed(line, e.to_string())
    })?;

    let serde_yaml::Value::Mapping(mapping) = value else {
        return Err(CoreError::malformed(
            header.first_line,
            "metadata header must be a mapping",
        ));
    };

    let mut fields = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            return Err(CoreError::malformed(
                header.first_line,
                "metadata keys must be strings",
            ));
        };
        let line = key_line(header, &key);
        if let Some(value) = yaml_to_raw(&key, value, line)? {
            fields.push((key, value));
        }
    }
    Ok(fields)
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_to_raw(key: &str, value: serde_yaml::Value, line: usize) -> Result<Option<RawValue>> {
    let raw = match value {
        serde_yaml::Value::Null => return Ok(None),
        serde_yaml::Value::Bool(b) => RawValue::Bool(b),
        serde_yaml::Value::Sequence(items) => RawValue::List(
            items
                .iter()
                .map(|item| {
                    yaml_scalar(item).ok_or_else(|| {
                        CoreError::malformed(line, format!("field `{key}`: list items must be scalars"))
                    })
                })
                .collect::<Result<_>>()?,
        ),
        other => RawValue::Text(yaml_scalar(&other).ok_or_else(|| {
            CoreError::malformed(line, format!("field `{key}`: unsupported value"))
        })?),
    };
    Ok(Some(raw))
}

fn parse_toml_header(header: &RawHeader<'_>) -> Result<Vec<(String, RawValue)>> {
    let table: toml::Table = toml::from_str(header.text).map_err(|e| {
        let line = e.span().map_or(header.first_line, |span| {
            header.first_line + header.text[..span.start].matches('\n').count()
        });
        CoreError::malformed(line, e.message().to_string())
    })?;

    let mut fields = Vec::with_capacity(table.len());
    for (key, value) in table {
        let line = key_line(header, &key);
        let raw = match value {
            toml::Value::Boolean(b) => RawValue::Bool(b),
            toml::Value::Array(items) => RawValue::List(
                items
                    .iter()
                    .map(|item| {
                        toml_scalar(item).ok_or_else(|| {
                            CoreError::malformed(line, format!("field `{key}`: list items must be scalars"))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            other => RawValue::Text(toml_scalar(&other).ok_or_else(|| {
                CoreError::malformed(line, format!("field `{key}`: unsupported value"))
            })?),
        };
        fields.push((key, raw));
    }
    Ok(fields)
}

fn toml_scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        _ => None,
    }
}

/// Document line on which `key` is declared, falling back to the header start.
fn key_line(header: &RawHeader<'_>, key: &str) -> usize {
    header
        .text
        .lines()
        .position(|line| {
            let line = line.trim_start_matches(['"', '\'']);
            line.strip_prefix(key).is_some_and(|rest| {
                let rest = rest.trim_start_matches(['"', '\'']).trim_start();
                rest.starts_with(':') || rest.starts_with('=')
            })
        })
        .map_or(header.first_line, |pos| header.first_line + pos)
}

/// Parse a date in RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` form.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// RFC 3339 in UTC with at least millisecond precision.
///
/// Sub-millisecond digits are written when present, so formatting then
/// parsing returns the same instant.
fn format_date(date: &DateTime<Utc>) -> String {
    let format = if date.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    date.to_rfc3339_opts(format, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "---\ntitle: \"Sample\"\ndate: 2023-01-01\ntags:\n  - rust\n  - mdx\ndraft: false\n---\n\nBody text.\n";

    #[test]
    fn test_split_yaml_header() {
        let header = split_header(SAMPLE).unwrap().expect("header");
        assert_eq!(header.format, HeaderFormat::Yaml);
        assert!(header.text.contains("title:"));
        assert_eq!(header.closing_line, 8);
        assert_eq!(header.body, "\nBody text.\n");
    }

    #[test]
    fn test_split_toml_header() {
        let content = "+++\ntitle = \"Hello\"\n+++\nBody";
        let header = split_header(content).unwrap().expect("header");
        assert_eq!(header.format, HeaderFormat::Toml);
        assert_eq!(header.body, "Body");
    }

    #[test]
    fn test_no_header_keeps_whole_body() {
        let content = "# Just a heading\n\n---\n";
        let extracted = extract(content, &MetadataSchema::blog()).unwrap();
        assert!(extracted.metadata.is_empty());
        assert_eq!(extracted.body, content);
    }

    #[test]
    fn test_unterminated_header() {
        let err = extract("---\ntitle: x\nbody", &MetadataSchema::blog()).unwrap_err();
        assert_eq!(err.metadata_line(), Some(1));
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_typed_fields() {
        let extracted = extract(SAMPLE, &MetadataSchema::blog()).unwrap();
        let meta = &extracted.metadata;
        assert_eq!(meta.title(), Some("Sample"));
        assert_eq!(
            meta.get("date").and_then(MetaValue::as_date),
            parse_date("2023-01-01")
        );
        assert_eq!(
            meta.get("tags"),
            Some(&MetaValue::List(vec!["rust".into(), "mdx".into()]))
        );
        assert_eq!(meta.get("draft"), Some(&MetaValue::Bool(false)));
        assert_eq!(
            meta.keys().collect::<Vec<_>>(),
            vec!["title", "date", "tags", "draft"]
        );
    }

    #[test]
    fn test_bad_date_reports_line() {
        let content = "---\ntitle: x\ndate: someday\n---\n";
        let err = extract(content, &MetadataSchema::blog()).unwrap_err();
        assert_eq!(err.metadata_line(), Some(3));
        assert!(err.to_string().contains("invalid date"));
    }

    #[test]
    fn test_yaml_syntax_error_reports_line() {
        let content = "---\ntitle: ok\ntags: [a, b\n---\n";
        let err = extract(content, &MetadataSchema::blog()).unwrap_err();
        assert!(err.metadata_line().is_some_and(|line| line >= 2));
    }

    #[test]
    fn test_unknown_field_strictness() {
        let content = "---\ntitle: x\ndate: 2023-01-01\nmood: happy\n---\n";

        let lenient = extract(content, &MetadataSchema::blog()).unwrap();
        assert_eq!(lenient.metadata.get_str("mood"), Some("happy"));

        let strict = MetadataSchema::blog().with_strict(true);
        let err = extract(content, &strict).unwrap_err();
        assert_eq!(err.metadata_line(), Some(4));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_scalar_promoted_to_list() {
        let content = "---\ntags: solo\n---\n";
        let extracted = extract(content, &MetadataSchema::blog()).unwrap();
        assert_eq!(
            extracted.metadata.get("tags"),
            Some(&MetaValue::List(vec!["solo".into()]))
        );
    }

    #[test]
    fn test_toml_header_typed() {
        let content = "+++\ntitle = \"T\"\ndate = 2023-01-01\ndraft = true\n+++\nbody";
        let extracted = extract(content, &MetadataSchema::blog()).unwrap();
        assert_eq!(extracted.metadata.get("draft"), Some(&MetaValue::Bool(true)));
        assert!(extracted.metadata.get("date").and_then(MetaValue::as_date).is_some());
        assert_eq!(extracted.body, "body");
    }

    #[test]
    fn test_validate_required() {
        let schema = MetadataSchema::blog();
        let extracted = extract("---\ntitle: only\n---\n", &schema).unwrap();
        let err = schema
            .validate(&extracted.metadata, extracted.header_end_line)
            .unwrap_err();
        assert!(err.to_string().contains("`date`"));
        assert_eq!(err.metadata_line(), Some(3));
    }

    #[test]
    fn test_missing_optional_listed() {
        let schema = MetadataSchema::new(false)
            .with_field(FieldSpec::optional("summary", FieldType::String));
        let extracted = extract(SAMPLE, &schema).unwrap();
        assert_eq!(schema.missing_optional(&extracted.metadata), vec!["summary"]);
    }

    #[test]
    fn test_header_round_trip() {
        let schema = MetadataSchema::blog();
        let first = extract(SAMPLE, &schema).unwrap().metadata;
        let header = first.to_header().unwrap();
        let second = extract(&header, &schema).unwrap().metadata;
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_round_trip_keeps_subsecond_dates() {
        let schema = MetadataSchema::blog();
        let source = "---\ntitle: T\ndate: 2023-01-01T10:00:00.123456Z\nlastmod: 2023-01-02T08:30:00.5Z\n---\n";
        let first = extract(source, &schema).unwrap().metadata;
        assert_eq!(first.get("date").and_then(MetaValue::as_date).map(|d| d.timestamp_subsec_micros()), Some(123_456));

        let second = extract(&first.to_header().unwrap(), &schema).unwrap().metadata;
        assert_eq!(first, second);

        let object = serde_json::to_value(&first).unwrap();
        assert_eq!(object["date"], "2023-01-01T10:00:00.123456Z");
        assert_eq!(object["lastmod"], "2023-01-02T08:30:00.500Z");
    }

    #[test]
    fn test_append_moves_existing_field_to_end() {
        let mut meta = extract("---\nslug: custom\ntitle: T\n---\n", &MetadataSchema::permissive())
            .unwrap()
            .metadata;
        meta.append("slug", MetaValue::String("derived".into()));

        assert_eq!(meta.keys().collect::<Vec<_>>(), vec!["title", "slug"]);
        assert_eq!(meta.get_str("slug"), Some("derived"));
        assert_eq!(meta.remove("title"), Some(MetaValue::String("T".into())));
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_round_trip_keeps_string_that_looks_boolean() {
        let schema = MetadataSchema::permissive();
        let first = extract("---\nlabel: \"true\"\n---\n", &schema).unwrap().metadata;
        let second = extract(&first.to_header().unwrap(), &schema).unwrap().metadata;
        assert_eq!(second.get("label"), Some(&MetaValue::String("true".into())));
    }

    #[test]
    fn test_json_object_restores_dates() {
        let schema = MetadataSchema::blog();
        let meta = extract(SAMPLE, &schema).unwrap().metadata;
        let json = serde_json::to_value(&meta).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object["date"], "2023-01-01T00:00:00.000Z");

        let restored = Metadata::from_json_object(object, &schema, &[]).unwrap();
        assert_eq!(restored, meta);
    }

    #[test]
    fn test_parse_date_forms() {
        assert!(parse_date("2023-01-01").is_some());
        assert!(parse_date("2023-01-01T10:00:00Z").is_some());
        assert!(parse_date("2023-01-01 10:00:00").is_some());
        assert!(parse_date("January").is_none());
    }
}
