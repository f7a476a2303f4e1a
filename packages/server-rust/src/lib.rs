//! `DevCamper` Server: REST API over bootcamps, courses and reviews with
//! filtered, sorted and paginated list queries.

pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod service;
pub mod storage;

pub use config::{LogFormat, ServerArgs};
pub use error::{ApiError, ApiResult};
pub use storage::{DocumentStore, MemoryStore, StoreError, TimedStore};
