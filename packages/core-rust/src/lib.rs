//! `DevCamper` Core: query translation, result pages, schemas and derived aggregates.

pub mod aggregate;
pub mod context;
pub mod models;
pub mod page;
pub mod query;
pub mod sanitize;
pub mod schema;
pub mod types;

pub use aggregate::{AggregateRule, Rounding, AVERAGE_COST, AVERAGE_RATING};
pub use context::RequestContext;
pub use page::{AdvancedResults, PageLink, Pagination, ResultPage};
pub use query::{
    translate, translate_with, ComparisonOp, Expansion, FilterNode, FilterTerm, PageWindow,
    Projection, QueryDescriptor, QueryParams, SortDirection, SortKey, TranslateOptions,
};
pub use schema::{CollectionSchema, FieldDef, ValidationResult};
pub use types::{Document, Principal, Role, ID_FIELD};
