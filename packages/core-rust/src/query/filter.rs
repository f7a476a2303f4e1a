//! Filter predicate tree evaluated against stored documents.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::compare::{comparable, lookup, loosely_equal};
use crate::types::Document;

/// Comparison operators recognised in filter terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    /// Equal (default for bare parameters).
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Value is one of a list.
    In,
}

impl ComparisonOp {
    /// Parses a bracket token such as the `gte` in `rating[gte]`.
    ///
    /// Only whole tokens match: `int` is not `in`, `gtx` is not `gt`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(ComparisonOp::Gt),
            "gte" => Some(ComparisonOp::Gte),
            "lt" => Some(ComparisonOp::Lt),
            "lte" => Some(ComparisonOp::Lte),
            "in" => Some(ComparisonOp::In),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Gte => "gte",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Lte => "lte",
            ComparisonOp::In => "in",
        }
    }
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTerm {
    /// Field path; dotted paths address nested objects.
    pub field: String,
    /// Comparison operator.
    pub op: ComparisonOp,
    /// Right-hand side. An array for [`ComparisonOp::In`].
    pub value: Value,
}

impl FilterTerm {
    #[must_use]
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, ComparisonOp::Eq, value)
    }

    /// Whether the document satisfies this term.
    ///
    /// Array-valued fields match when any element matches, so
    /// `careers=Web Development` finds bootcamps listing that career.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match lookup(doc, &self.field) {
            None => self.op == ComparisonOp::Eq && self.value.is_null(),
            Some(Value::Array(items)) if self.op == ComparisonOp::In || !self.value.is_array() => {
                items.iter().any(|item| self.matches_value(item))
            }
            Some(field_value) => self.matches_value(field_value),
        }
    }

    fn matches_value(&self, field_value: &Value) -> bool {
        let ordered = |accept: fn(Ordering) -> bool| {
            comparable(field_value, &self.value).is_some_and(accept)
        };
        match self.op {
            ComparisonOp::Eq => loosely_equal(field_value, &self.value),
            ComparisonOp::Gt => ordered(Ordering::is_gt),
            ComparisonOp::Gte => ordered(Ordering::is_ge),
            ComparisonOp::Lt => ordered(Ordering::is_lt),
            ComparisonOp::Lte => ordered(Ordering::is_le),
            ComparisonOp::In => match &self.value {
                Value::Array(candidates) => {
                    candidates.iter().any(|c| loosely_equal(field_value, c))
                }
                single => loosely_equal(field_value, single),
            },
        }
    }
}

/// Boolean predicate tree over filter terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    /// A leaf condition.
    Term(FilterTerm),
    /// All children must match. An empty conjunction matches everything.
    And(Vec<FilterNode>),
}

impl Default for FilterNode {
    fn default() -> Self {
        FilterNode::all()
    }
}

impl FilterNode {
    /// The always-true filter.
    #[must_use]
    pub fn all() -> Self {
        FilterNode::And(Vec::new())
    }

    /// Builds a conjunction of terms.
    #[must_use]
    pub fn from_terms(terms: impl IntoIterator<Item = FilterTerm>) -> Self {
        FilterNode::And(terms.into_iter().map(FilterNode::Term).collect())
    }

    /// Returns a new filter that additionally requires `term`.
    #[must_use]
    pub fn and(self, term: FilterTerm) -> Self {
        match self {
            FilterNode::And(mut children) => {
                children.push(FilterNode::Term(term));
                FilterNode::And(children)
            }
            leaf @ FilterNode::Term(_) => FilterNode::And(vec![leaf, FilterNode::Term(term)]),
        }
    }

    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            FilterNode::Term(term) => term.matches(doc),
            FilterNode::And(children) => children.iter().all(|c| c.matches(doc)),
        }
    }

    /// Flattened view of every leaf term, in tree order.
    #[must_use]
    pub fn terms(&self) -> Vec<&FilterTerm> {
        match self {
            FilterNode::Term(term) => vec![term],
            FilterNode::And(children) => children.iter().flat_map(FilterNode::terms).collect(),
        }
    }

    /// Whether the filter restricts nothing.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterNode::And(children) if children.iter().all(FilterNode::is_match_all))
    }
}
