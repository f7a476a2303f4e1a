//! Translates URL query parameters into a [`QueryDescriptor`].
//!
//! `select`, `sort`, `page` and `limit` are reserved; every other parameter
//! becomes a filter term. A key of the form `field[op]` with `op` one of
//! `gt`, `gte`, `lt`, `lte`, `in` becomes a comparison, a bare key becomes
//! equality. Translation never fails: malformed input falls back to
//! defaults or to literal equality terms.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};
use tracing::debug;

use super::descriptor::{PageWindow, Projection, QueryDescriptor, SortKey};
use super::filter::{ComparisonOp, FilterNode, FilterTerm};
use super::params::{ParamValue, QueryParams};
use crate::types::CREATED_AT_FIELD;

/// Parameter names consumed by the translator instead of becoming filters.
pub const RESERVED_PARAMS: [&str; 4] = ["select", "sort", "limit", "page"];

/// Page used when `page` is absent or not a positive integer.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when `limit` is absent or not a positive integer.
pub const DEFAULT_LIMIT: usize = 25;

static BRACKET_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<field>[^\[\]]+)\[(?P<op>[^\[\]]*)\]$").expect("static regex compiles")
});

/// Tunables for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Page size when the request gives none.
    pub default_limit: usize,
    /// Optional ceiling on `limit`. Larger requests are clamped, not rejected.
    pub max_limit: Option<usize>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
        }
    }
}

/// Translates with default options.
#[must_use]
pub fn translate(params: &QueryParams) -> QueryDescriptor {
    translate_with(params, &TranslateOptions::default())
}

/// Builds a descriptor from request parameters. Expansions are left empty;
/// routes attach their own with [`QueryDescriptor::with_expansions`].
#[must_use]
pub fn translate_with(params: &QueryParams, options: &TranslateOptions) -> QueryDescriptor {
    let reserved = |name: &str| params.get(name).map(ParamValue::last);

    let terms = params
        .iter()
        .filter(|(key, _)| !RESERVED_PARAMS.contains(key))
        .filter_map(|(key, value)| filter_term(key, value));

    let page = reserved("page").and_then(parse_positive).unwrap_or(DEFAULT_PAGE);
    let mut limit = reserved("limit")
        .and_then(parse_positive)
        .unwrap_or(options.default_limit);
    if let Some(max) = options.max_limit {
        limit = limit.min(max);
    }

    QueryDescriptor {
        filter: FilterNode::from_terms(terms),
        sort: parse_sort(reserved("sort")),
        projection: reserved("select").and_then(parse_select),
        window: PageWindow::new(page, limit),
        expansions: Vec::new(),
    }
}

/// Comma-separated field list. An empty list means no restriction.
fn parse_select(value: &str) -> Option<Projection> {
    let fields: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    (!fields.is_empty()).then(|| Projection::new(fields))
}

/// Comma-separated sort keys; falls back to newest first.
fn parse_sort(value: Option<&str>) -> Vec<SortKey> {
    let keys: Vec<SortKey> = value
        .map(|v| v.split(',').filter_map(SortKey::parse).collect())
        .unwrap_or_default();
    if keys.is_empty() {
        vec![SortKey::desc(CREATED_AT_FIELD)]
    } else {
        keys
    }
}

/// Reads the leading decimal digits (`"3abc"` is 3). Zero, negatives and
/// non-numeric input yield `None`.
fn parse_positive(value: &str) -> Option<usize> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<usize>().ok().filter(|n| *n >= 1)
}

fn filter_term(key: &str, value: &ParamValue) -> Option<FilterTerm> {
    if key.starts_with('$') {
        debug!(key, "dropping operator-like query parameter");
        return None;
    }

    if let Some(caps) = BRACKET_KEY.captures(key) {
        let field = &caps["field"];
        if let Some(op) = ComparisonOp::from_token(&caps["op"]) {
            let rhs = if op == ComparisonOp::In {
                list_value(value.all())
            } else {
                coerce_scalar(value.last())
            };
            return Some(FilterTerm::new(field, op, rhs));
        }
    }

    if key.contains(['[', ']']) {
        debug!(key, "unrecognised filter syntax, using literal equality");
        return Some(FilterTerm::eq(key, Value::String(value.last().to_string())));
    }

    Some(match value {
        ParamValue::Single(v) => FilterTerm::eq(key, coerce_scalar(v)),
        ParamValue::List(vs) => FilterTerm::new(key, ComparisonOp::In, list_value(vs)),
    })
}

/// Flattens repeated and comma-separated values into one JSON array.
fn list_value(values: &[String]) -> Value {
    Value::Array(
        values
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(coerce_scalar)
            .collect(),
    )
}

/// Interprets a raw parameter as the most specific JSON scalar. Numbers are
/// only produced when they print back to exactly `raw`, so `0123`, `1e3` and
/// integers beyond `i64` stay strings.
fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    let number = raw
        .parse::<i64>()
        .ok()
        .map(Number::from)
        .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
        .filter(|n| n.to_string() == raw);
    match number {
        Some(n) => Value::Number(n),
        None => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::SortDirection;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn reserved_params_never_become_filters() {
        let descriptor = translate(&params(&[
            ("select", "name"),
            ("sort", "name"),
            ("page", "2"),
            ("limit", "5"),
            ("housing", "true"),
        ]));

        let fields: Vec<&str> = descriptor.filter.terms().iter().map(|t| t.field.as_str()).collect();
        assert_eq!(fields, ["housing"]);
    }

    #[test]
    fn bracket_operator_becomes_comparison() {
        let descriptor = translate(&params(&[("rating[gte]", "8")]));
        let terms = descriptor.filter.terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0], &FilterTerm::new("rating", ComparisonOp::Gte, json!(8)));
    }

    #[test]
    fn bare_value_is_equality() {
        let descriptor = translate(&params(&[("location.state", "MA")]));
        assert_eq!(
            descriptor.filter.terms()[0],
            &FilterTerm::eq("location.state", json!("MA"))
        );
    }

    #[test]
    fn in_operator_splits_commas() {
        let descriptor = translate(&params(&[("careers[in]", "Business,UI/UX")]));
        assert_eq!(
            descriptor.filter.terms()[0],
            &FilterTerm::new("careers", ComparisonOp::In, json!(["Business", "UI/UX"]))
        );
    }

    #[test]
    fn repeated_bare_key_becomes_in() {
        let descriptor = translate(&params(&[("minimumSkill", "beginner"), ("minimumSkill", "advanced")]));
        assert_eq!(
            descriptor.filter.terms()[0],
            &FilterTerm::new("minimumSkill", ComparisonOp::In, json!(["beginner", "advanced"]))
        );
    }

    #[test]
    fn operator_must_be_a_whole_token() {
        let descriptor = translate(&params(&[("tuition[int]", "5")]));
        assert_eq!(
            descriptor.filter.terms()[0],
            &FilterTerm::eq("tuition[int]", json!("5"))
        );
    }

    #[test]
    fn unbalanced_brackets_fall_back_to_literal_equality() {
        let descriptor = translate(&params(&[("rating[gte", "7")]));
        assert_eq!(descriptor.filter.terms()[0], &FilterTerm::eq("rating[gte", json!("7")));
    }

    #[test]
    fn dollar_keys_are_dropped() {
        let descriptor = translate(&params(&[("$where", "1"), ("name", "x")]));
        assert_eq!(descriptor.filter.terms().len(), 1);
    }

    #[test]
    fn select_builds_exact_projection() {
        let descriptor = translate(&params(&[("select", "a,b")]));
        let projection = descriptor.projection.expect("projection");
        let fields: Vec<&str> = projection.fields().iter().map(String::as_str).collect();
        assert_eq!(fields, ["a", "b"]);
    }

    #[test]
    fn empty_select_means_all_fields() {
        assert!(translate(&params(&[("select", " , ")])).projection.is_none());
        assert!(translate(&QueryParams::new()).projection.is_none());
    }

    #[test]
    fn sort_keys_in_tie_break_order() {
        let descriptor = translate(&params(&[("sort", "-createdAt,title")]));
        assert_eq!(descriptor.sort, vec![SortKey::desc("createdAt"), SortKey::asc("title")]);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let descriptor = translate(&QueryParams::new());
        assert_eq!(descriptor.sort.len(), 1);
        assert_eq!(descriptor.sort[0].field, "createdAt");
        assert_eq!(descriptor.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn pagination_defaults_for_missing_or_invalid_input() {
        let defaults = translate(&QueryParams::new()).window;
        assert_eq!((defaults.page(), defaults.limit()), (1, 25));

        let invalid = translate(&params(&[("page", "abc"), ("limit", "-4")])).window;
        assert_eq!((invalid.page(), invalid.limit()), (1, 25));

        let zero = translate(&params(&[("page", "0"), ("limit", "0")])).window;
        assert_eq!((zero.page(), zero.limit()), (1, 25));

        let prefixed = translate(&params(&[("page", "3rd"), ("limit", "10.5")])).window;
        assert_eq!((prefixed.page(), prefixed.limit()), (3, 10));
    }

    #[test]
    fn repeated_reserved_key_uses_last_value() {
        let window = translate(&params(&[("page", "2"), ("page", "4")])).window;
        assert_eq!(window.page(), 4);
    }

    #[test]
    fn max_limit_clamps() {
        let options = TranslateOptions {
            default_limit: 25,
            max_limit: Some(100),
        };
        let window = translate_with(&params(&[("limit", "5000")]), &options).window;
        assert_eq!(window.limit(), 100);

        let unbounded = translate(&params(&[("limit", "5000")])).window;
        assert_eq!(unbounded.limit(), 5000);
    }

    #[test]
    fn scalar_coercion() {
        assert_eq!(coerce_scalar("7"), json!(7));
        assert_eq!(coerce_scalar("7.5"), json!(7.5));
        assert_eq!(coerce_scalar("false"), json!(false));
        assert_eq!(coerce_scalar("null"), Value::Null);
        assert_eq!(coerce_scalar("Boston"), json!("Boston"));
    }

    #[test]
    fn non_canonical_numbers_stay_strings() {
        assert_eq!(coerce_scalar("0123"), json!("0123"));
        assert_eq!(coerce_scalar("1e3"), json!("1e3"));
        assert_eq!(coerce_scalar("+5"), json!("+5"));
        assert_eq!(coerce_scalar("7.50"), json!("7.50"));
        assert_eq!(coerce_scalar("99999999999999999999"), json!("99999999999999999999"));
        assert_eq!(coerce_scalar("-3"), json!(-3));
    }

    #[test]
    fn leading_zero_values_match_string_fields() {
        let descriptor = translate(&params(&[("phone", "0123")]));
        let stored = json!({"phone": "0123"}).as_object().cloned().unwrap();
        let other = json!({"phone": "123"}).as_object().cloned().unwrap();
        assert!(descriptor.filter.matches(&stored));
        assert!(!descriptor.filter.matches(&other));
    }
}
