//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the server can be configured
//! entirely through the environment in containers.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use devcamper_core::query::DEFAULT_LIMIT;
use devcamper_core::TranslateOptions;

use crate::network::{NetworkConfig, RateLimit};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// `DevCamper` API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "devcamper-server", version, about)]
pub struct ServerArgs {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port.
    #[arg(long, env = "PORT", default_value_t = 5001)]
    pub port: u16,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Per-storage-call timeout in milliseconds.
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 5_000)]
    pub store_timeout_ms: u64,

    /// Page size used when a request gives no `limit`.
    #[arg(long, env = "DEFAULT_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub default_limit: usize,

    /// Clamp for client-supplied `limit`. Unbounded when unset.
    #[arg(long, env = "MAX_LIMIT")]
    pub max_limit: Option<usize>,

    /// Directory of static files served for unmatched paths.
    #[arg(long, env = "PUBLIC_DIR")]
    pub public_dir: Option<PathBuf>,

    /// Comma-separated allowed CORS origins.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[arg(long, env = "BODY_LIMIT", default_value_t = 1024 * 1024)]
    pub body_limit: usize,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,

    /// Milliseconds for one request of a client's budget to refill.
    #[arg(long, env = "RATE_LIMIT_PERIOD_MS", default_value_t = 6_000)]
    pub rate_limit_period_ms: u64,

    /// Requests a client may burst before being limited. 0 disables limiting.
    #[arg(long, env = "RATE_LIMIT_BURST", default_value_t = 100)]
    pub rate_limit_burst: u32,
}

impl ServerArgs {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            body_limit: self.body_limit,
            public_dir: self.public_dir.clone(),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
            rate_limit: self.rate_limit(),
        }
    }

    fn rate_limit(&self) -> Option<RateLimit> {
        (self.rate_limit_burst > 0 && self.rate_limit_period_ms > 0).then(|| RateLimit {
            period: Duration::from_millis(self.rate_limit_period_ms),
            burst: self.rate_limit_burst,
        })
    }

    #[must_use]
    pub fn query_config(&self) -> TranslateOptions {
        TranslateOptions {
            default_limit: self.default_limit.max(1),
            max_limit: self.max_limit.filter(|&max| max > 0),
        }
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
