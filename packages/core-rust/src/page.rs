//! Result pages and the list payload returned to clients.

use serde::{Deserialize, Serialize};

use crate::query::PageWindow;
use crate::types::Document;

/// Reference to an adjacent page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page: usize,
    pub limit: usize,
}

impl PageLink {
    #[must_use]
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }
}

/// Links to the neighbouring pages. Absent links are omitted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev: Option<PageLink>,
}

impl Pagination {
    /// Links for `window` over a population of `total` matching records.
    #[must_use]
    pub fn for_window(window: &PageWindow, total: usize) -> Self {
        Self {
            next: window.next(total),
            prev: window.prev(),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    /// Records on this page, at most `limit` of them.
    pub items: Vec<Document>,
    /// Size of the matching population the page was cut from.
    pub total_count: usize,
    pub pagination: Pagination,
}

/// List response body: `{ success, count, pagination, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedResults {
    pub success: bool,
    /// Number of records in `data` (this page only).
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Document>,
}

impl From<ResultPage> for AdvancedResults {
    fn from(page: ResultPage) -> Self {
        Self {
            success: true,
            count: page.items.len(),
            pagination: page.pagination,
            data: page.items,
        }
    }
}
