//! HTTP surface: configuration, middleware, extractors, handlers and the
//! server lifecycle.

pub mod config;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::{NetworkConfig, RateLimit};
pub use handlers::AppState;
pub use module::{build_router, NetworkModule, API_PREFIX};
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
