//! HTTP listener and middleware settings.

use std::path::PathBuf;
use std::time::Duration;

/// Per-client request budget: `burst` requests up front, one more every
/// `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub period: Duration,
    pub burst: u32,
}

impl Default for RateLimit {
    /// 100 requests per 10 minutes.
    fn default() -> Self {
        Self {
            period: Duration::from_secs(6),
            burst: 100,
        }
    }
}

/// Settings for the HTTP listener and its middleware stack.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Upper bound on handling one request.
    pub request_timeout: Duration,
    /// Maximum accepted request body size in bytes.
    pub body_limit: usize,
    /// Directory served for paths no route matches.
    pub public_dir: Option<PathBuf>,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
    /// Per-client rate limit keyed by forwarded or peer IP. `None` disables it.
    pub rate_limit: Option<RateLimit>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            body_limit: 1024 * 1024,
            public_dir: None,
            drain_timeout: Duration::from_secs(30),
            rate_limit: None,
        }
    }
}
