//! Request body sanitization against operator injection and stored markup.

use serde_json::Value;

use crate::types::Document;

/// Recursively removes keys that start with `$` or contain a `.`, so client
/// bodies can never smuggle query operators or path expressions into storage.
pub fn strip_operator_keys(doc: &mut Document) {
    doc.retain(|key, _| !key.starts_with('$') && !key.contains('.'));
    for value in doc.values_mut() {
        strip_value(value);
    }
}

fn strip_value(value: &mut Value) {
    match value {
        Value::Object(map) => strip_operator_keys(map),
        Value::Array(items) => items.iter_mut().for_each(strip_value),
        _ => {}
    }
}

/// Escapes `<` in every string value, recursively, so stored text cannot
/// open an HTML tag when rendered. Keys are left alone.
pub fn escape_markup(doc: &mut Document) {
    doc.values_mut().for_each(escape_value);
}

fn escape_value(value: &mut Value) {
    match value {
        Value::String(s) if s.contains('<') => *s = s.replace('<', "&lt;"),
        Value::Object(map) => escape_markup(map),
        Value::Array(items) => items.iter_mut().for_each(escape_value),
        _ => {}
    }
}
