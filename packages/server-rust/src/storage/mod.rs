//! Document storage for the `DevCamper` server.
//!
//! - [`DocumentStore`]: async collection abstraction used by every service
//! - [`MemoryStore`]: `DashMap`-backed implementation with unique indexes
//! - [`TimedStore`]: wrapper bounding every call with a timeout

pub mod engine;
pub mod memory;
pub mod timeout;

pub use engine::{DocumentStore, FindSpec, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use timeout::TimedStore;
