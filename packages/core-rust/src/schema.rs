//! Explicit collection schemas: field constraints, defaults and validation
//! applied by the write path before anything reaches the store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::types::Document;

/// JSON shape a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// Array of strings.
    StringArray,
    /// String identifier of a document in another collection.
    Reference,
    /// RFC 3339 timestamp string.
    Date,
    Object,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String | FieldKind::Reference => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldKind::Date => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            FieldKind::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "a boolean",
            FieldKind::StringArray => "a list of strings",
            FieldKind::Reference => "a resource id",
            FieldKind::Date => "an RFC 3339 date",
            FieldKind::Object => "an object",
        }
    }
}

/// Formats a timestamp the way every stored date is written, so that dates
/// order correctly as plain strings.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalizes any RFC 3339 offset or precision to [`format_timestamp`].
/// Unparseable input is kept for validation to reject.
fn canonical_date(raw: String) -> Value {
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(parsed) => Value::String(format_timestamp(parsed.with_timezone(&Utc))),
        Err(_) => Value::String(raw),
    }
}

/// Value filled in on insert when the field is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// Current time, formatted as RFC 3339 with millisecond precision.
    Now,
    Value(Value),
}

/// Single field definition within a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Error message when absent; `None` means optional.
    pub required: Option<String>,
    /// Strip surrounding whitespace from string values before validation.
    pub trim: bool,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Permitted values for strings (or each element of a string array).
    pub allowed: Vec<String>,
    pub default: Option<FieldDefault>,
    /// Computed server-side; client-supplied values are discarded.
    pub derived: bool,
    /// Enforced by a unique index in the store.
    pub unique: bool,
}

impl FieldDef {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: None,
            trim: false,
            max_length: None,
            min: None,
            max: None,
            allowed: Vec::new(),
            default: None,
            derived: false,
            unique: false,
        }
    }

    #[must_use]
    pub fn string(name: &str) -> Self {
        Self::new(name, FieldKind::String)
    }

    #[must_use]
    pub fn number(name: &str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    #[must_use]
    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    #[must_use]
    pub fn string_array(name: &str) -> Self {
        Self::new(name, FieldKind::StringArray)
    }

    #[must_use]
    pub fn reference(name: &str) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    #[must_use]
    pub fn date(name: &str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    #[must_use]
    pub fn object(name: &str) -> Self {
        Self::new(name, FieldKind::Object)
    }

    #[must_use]
    pub fn required(mut self, message: &str) -> Self {
        self.required = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    #[must_use]
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        self.allowed = allowed.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Value(value));
        self
    }

    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(FieldDefault::Now);
        self
    }

    #[must_use]
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn check(&self, value: &Value, errors: &mut Vec<String>) {
        let name = &self.name;
        if !self.kind.accepts(value) {
            errors.push(format!("{name} must be {}", self.kind.describe()));
            return;
        }
        if let (Some(max), Some(s)) = (self.max_length, value.as_str()) {
            if s.chars().count() > max {
                errors.push(format!("{name} can not be more than {max} characters"));
            }
        }
        if let Some(n) = value.as_f64() {
            if self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max) {
                errors.push(match (self.min, self.max) {
                    (Some(min), Some(max)) => format!("{name} must be between {min} and {max}"),
                    (Some(min), None) => format!("{name} must be at least {min}"),
                    (None, Some(max)) => format!("{name} must be at most {max}"),
                    (None, None) => unreachable!("range check without bounds"),
                });
            }
        }
        if !self.allowed.is_empty() {
            let candidates: Vec<&str> = match value {
                Value::String(s) => vec![s.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            for candidate in candidates {
                if !self.allowed.iter().any(|a| a == candidate) {
                    errors.push(format!("{name} value `{candidate}` is not allowed"));
                }
            }
        }
    }
}

/// Result of validating a document against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid {
        /// Human-readable descriptions of each validation failure.
        errors: Vec<String>,
    },
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Converts into a `Result`, carrying the error list on failure.
    ///
    /// # Errors
    ///
    /// Returns the collected messages when the document was invalid.
    pub fn into_result(self) -> Result<(), Vec<String>> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { errors } => Err(errors),
        }
    }
}

/// Field definitions and unique constraints for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub collection: String,
    pub fields: Vec<FieldDef>,
    /// Composite unique indexes in addition to single `unique` fields.
    pub compound_unique: Vec<Vec<String>>,
}

impl CollectionSchema {
    #[must_use]
    pub fn new(collection: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            collection: collection.to_string(),
            fields,
            compound_unique: Vec::new(),
        }
    }

    #[must_use]
    pub fn unique_together(mut self, fields: &[&str]) -> Self {
        self.compound_unique
            .push(fields.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every unique index the store must enforce, single-field ones first.
    #[must_use]
    pub fn unique_indexes(&self) -> Vec<Vec<String>> {
        self.fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| vec![f.name.clone()])
            .chain(self.compound_unique.iter().cloned())
            .collect()
    }

    /// Cleans client input: drops unknown and derived fields, trims strings
    /// and rewrites dates to canonical UTC. `_id` is dropped too; the store
    /// assigns identifiers.
    #[must_use]
    pub fn sanitize_input(&self, input: Document) -> Document {
        input
            .into_iter()
            .filter_map(|(key, value)| {
                let def = self.field(&key).filter(|def| !def.derived)?;
                let value = match value {
                    Value::String(s) if def.trim => Value::String(s.trim().to_string()),
                    Value::String(s) if def.kind == FieldKind::Date => canonical_date(s),
                    other => other,
                };
                Some((key, value))
            })
            .collect()
    }

    /// Fills absent fields that declare a default.
    pub fn apply_defaults(&self, doc: &mut Document, now: DateTime<Utc>) {
        for def in &self.fields {
            if doc.contains_key(&def.name) {
                continue;
            }
            match &def.default {
                Some(FieldDefault::Now) => {
                    doc.insert(
                        def.name.clone(),
                        Value::String(format_timestamp(now)),
                    );
                }
                Some(FieldDefault::Value(v)) => {
                    doc.insert(def.name.clone(), v.clone());
                }
                None => {}
            }
        }
    }

    /// Checks every field constraint, collecting all failures.
    #[must_use]
    pub fn validate(&self, doc: &Document) -> ValidationResult {
        let mut errors = Vec::new();
        for def in &self.fields {
            match doc.get(&def.name) {
                None | Some(Value::Null) => {
                    if let Some(message) = &def.required {
                        errors.push(message.clone());
                    }
                }
                Some(Value::String(s)) if s.is_empty() && def.required.is_some() => {
                    errors.extend(def.required.clone());
                }
                Some(value) => def.check(value, &mut errors),
            }
        }
        if errors.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { errors }
        }
    }
}
