//! Query translation: request parameters in, [`QueryDescriptor`] out.
//!
//! - [`params`]: raw parameters grouped by key
//! - [`filter`]: predicate tree and its evaluation against documents
//! - [`descriptor`]: sort, projection, pagination window, expansions
//! - [`translate`]: the parameter-to-descriptor translation itself
//! - [`compare`]: value ordering shared by filtering and sorting

pub mod compare;
pub mod descriptor;
pub mod filter;
pub mod params;
pub mod translate;

pub use descriptor::{Expansion, PageWindow, Projection, QueryDescriptor, SortDirection, SortKey};
pub use filter::{ComparisonOp, FilterNode, FilterTerm};
pub use params::{ParamValue, QueryParams};
pub use translate::{translate, translate_with, TranslateOptions, DEFAULT_LIMIT, RESERVED_PARAMS};
