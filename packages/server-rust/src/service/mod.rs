//! Domain services between the HTTP handlers and the document store.
//!
//! - [`results`]: list queries, pagination and expansions
//! - [`resources`]: the validated, authorized write path
//! - [`aggregate`]: derived-field recomputation triggered by writes

pub mod aggregate;
pub mod resources;
pub mod results;

pub use aggregate::AggregateRecalculator;
pub use resources::{ResourceKind, ResourceService};
pub use results::ResultExecutor;
