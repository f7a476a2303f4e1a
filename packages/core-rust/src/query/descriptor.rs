//! Immutable query descriptor built once per request and interpreted by the
//! result executor.

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::filter::{FilterNode, FilterTerm};
use crate::page::PageLink;
use crate::types::{Document, ID_FIELD};

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `(field, direction)` entry of an ordered sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses `name` (ascending) or `-name` (descending).
    /// Returns `None` for an empty field name.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let key = match spec.strip_prefix('-') {
            Some(field) => Self::desc(field.trim()),
            None => Self::asc(spec.strip_prefix('+').unwrap_or(spec).trim()),
        };
        (!key.field.is_empty()).then_some(key)
    }
}

/// Set of fields to return per record. `_id` is always kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    fields: BTreeSet<String>,
}

impl Projection {
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The requested field names, excluding the implicit `_id`.
    #[must_use]
    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    #[must_use]
    pub fn includes(&self, field: &str) -> bool {
        field == ID_FIELD || self.fields.contains(field)
    }

    /// Copies the projected top-level fields out of `doc`.
    #[must_use]
    pub fn apply(&self, doc: &Document) -> Document {
        doc.iter()
            .filter(|(k, _)| self.includes(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Pagination window: a 1-based page of `limit` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    page: usize,
    limit: usize,
}

impl PageWindow {
    /// Creates a window; zero values are raised to 1.
    #[must_use]
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of items skipped before this page: `(page - 1) * limit`.
    #[must_use]
    pub fn start_index(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Exclusive end of this page: `page * limit`.
    #[must_use]
    pub fn end_index(&self) -> usize {
        self.page.saturating_mul(self.limit)
    }

    /// Indices of this page within a result set of `total` items.
    #[must_use]
    pub fn bounds(&self, total: usize) -> Range<usize> {
        let start = self.start_index().min(total);
        start..self.end_index().min(total)
    }

    /// Link to the following page, if `total` extends past this one.
    #[must_use]
    pub fn next(&self, total: usize) -> Option<PageLink> {
        (self.end_index() < total).then(|| PageLink::new(self.page + 1, self.limit))
    }

    /// Link to the preceding page, if this is not the first.
    #[must_use]
    pub fn prev(&self) -> Option<PageLink> {
        (self.start_index() > 0).then(|| PageLink::new(self.page - 1, self.limit))
    }
}

/// A related resource to inline in place of its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    /// Reference field on the listed records, e.g. `bootcamp`.
    pub field: String,
    /// Collection the reference points into.
    pub collection: String,
    /// Fields of the referenced record to inline (plus `_id`).
    pub select: Vec<String>,
}

impl Expansion {
    #[must_use]
    pub fn new<S: Into<String>>(
        field: impl Into<String>,
        collection: impl Into<String>,
        select: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            field: field.into(),
            collection: collection.into(),
            select: select.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn projection(&self) -> Projection {
        Projection::new(self.select.iter().cloned())
    }
}

/// Structured query built from request parameters.
///
/// Never mutated after construction; the `with_*` methods return new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub filter: FilterNode,
    pub sort: Vec<SortKey>,
    pub projection: Option<Projection>,
    pub window: PageWindow,
    pub expansions: Vec<Expansion>,
}

impl QueryDescriptor {
    /// Returns a copy that also requires `term`; used to scope a list to a parent.
    #[must_use]
    pub fn with_term(&self, term: FilterTerm) -> Self {
        Self {
            filter: self.filter.clone().and(term),
            ..self.clone()
        }
    }

    /// Returns a copy scoped to records whose `field` equals `value`.
    #[must_use]
    pub fn scoped_to(&self, field: &str, value: impl Into<Value>) -> Self {
        self.with_term(FilterTerm::eq(field, value.into()))
    }

    /// Returns a copy carrying the route-supplied expansions.
    #[must_use]
    pub fn with_expansions(self, expansions: Vec<Expansion>) -> Self {
        Self { expansions, ..self }
    }
}
