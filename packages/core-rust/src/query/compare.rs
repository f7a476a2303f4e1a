//! Field lookup and value ordering shared by filtering and sorting.
//!
//! Ordering follows document-store conventions: values of different types
//! sort by a fixed type rank (missing/null < numbers < strings < objects <
//! arrays < booleans), and range comparisons only match within the same
//! type bracket.

use std::cmp::Ordering;

use serde_json::Value;

use crate::types::Document;

/// Resolves a possibly dotted path (`location.city`) against a document.
#[must_use]
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting. Never fails; mismatched types order by rank.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(Some(l), Some(r)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x.len().cmp(&y.len()),
        _ => Ordering::Equal,
    }
}

/// Ordering for range operators: `None` when the values are not in the same
/// type bracket (a number is never `gt` a string).
#[must_use]
pub fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality with numeric normalisation (`7 == 7.0`), string casting of
/// scalar query values against string fields (`"true"` field vs `true`), and
/// numeric parsing of string query values against number fields (`"07"`).
#[must_use]
pub fn loosely_equal(field: &Value, query: &Value) -> bool {
    match (field, query) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), Value::Number(_) | Value::Bool(_)) => *s == query.to_string(),
        (Value::Number(x), Value::String(s)) => {
            s.trim().parse::<f64>().ok().is_some_and(|y| x.as_f64() == Some(y))
        }
        _ => field == query,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let d = doc(json!({"location": {"city": "Boston", "tags": ["a", "b"]}}));
        assert_eq!(lookup(&d, "location.city"), Some(&json!("Boston")));
        assert_eq!(lookup(&d, "location.tags.1"), Some(&json!("b")));
        assert_eq!(lookup(&d, "location.zip"), None);
        assert_eq!(lookup(&d, "missing.path"), None);
    }

    #[test]
    fn missing_sorts_before_numbers_before_strings() {
        let n = json!(3);
        let s = json!("a");
        assert_eq!(compare_values(None, Some(&n)), Ordering::Less);
        assert_eq!(compare_values(Some(&n), Some(&s)), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2.5)), Some(&json!(2))), Ordering::Greater);
    }

    #[test]
    fn range_comparison_requires_same_bracket() {
        assert_eq!(comparable(&json!(8), &json!(7)), Some(Ordering::Greater));
        assert_eq!(comparable(&json!("8"), &json!(7)), None);
    }

    #[test]
    fn loose_equality_normalises_numbers_and_casts_to_string_fields() {
        assert!(loosely_equal(&json!(7), &json!(7.0)));
        assert!(loosely_equal(&json!("10"), &json!(10)));
        assert!(loosely_equal(&json!("true"), &json!(true)));
        assert!(loosely_equal(&json!(123), &json!("0123")));
        assert!(loosely_equal(&json!(1000), &json!("1e3")));
        assert!(!loosely_equal(&json!(10), &json!("ten")));
        assert!(!loosely_equal(&json!("123"), &json!("0123")));
    }
}
