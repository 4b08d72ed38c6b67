//! Configuration for Sharcache

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub metrics: MetricsConfig,
}

/// Access policy applied by the listener
///
/// `GetOnly` and `PutOnly` let deployments expose the read and write paths on
/// separate network segments; the refused command gets an `ERROR,` header and
/// the connection is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    #[default]
    Unrestricted,
    GetOnly,
    PutOnly,
}

impl AccessPolicy {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unrestricted" => Some(Self::Unrestricted),
            "get-only" | "getonly" => Some(Self::GetOnly),
            "put-only" | "putonly" => Some(Self::PutOnly),
            _ => None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: String,

    /// Maximum number of concurrent connections
    pub max_connections: usize,

    /// Seconds a connection may sit idle between requests before it is
    /// closed (0 = no timeout)
    pub idle_timeout_secs: u64,

    /// Number of Tokio worker threads (0 = number of CPUs)
    pub worker_threads: usize,

    /// Access policy for this listener
    pub policy: AccessPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:51200".to_string(),
            max_connections: 10000,
            idle_timeout_secs: 60,
            worker_threads: 0,
            policy: AccessPolicy::Unrestricted,
        }
    }
}

/// Blob store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory holding the shard tree
    pub root: PathBuf,

    /// Byte-size ceiling; exceeding it triggers an eviction pass
    pub ceiling_bytes: u64,

    /// Fraction of the ceiling an eviction pass trims down to
    pub low_watermark: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/sharcache"),
            ceiling_bytes: 50 * 1024 * 1024 * 1024, // 50GB
            low_watermark: 0.85,
        }
    }
}

/// Metrics and health check configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics collection
    pub enabled: bool,

    /// Address for metrics/health HTTP server
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:9090".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::SharcacheError::Config(format!("Failed to read config file: {e}"))
        })?;

        toml::from_str(&contents)
            .map_err(|e| crate::SharcacheError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables or use defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SHARCACHE_LISTEN_ADDR") {
            config.server.listen_addr = addr;
        }

        if let Ok(max_conn) = std::env::var("SHARCACHE_MAX_CONNECTIONS")
            && let Ok(n) = max_conn.parse()
        {
            config.server.max_connections = n;
        }

        if let Ok(secs) = std::env::var("SHARCACHE_IDLE_TIMEOUT_SECS")
            && let Ok(n) = secs.parse()
        {
            config.server.idle_timeout_secs = n;
        }

        if let Ok(policy) = std::env::var("SHARCACHE_POLICY")
            && let Some(p) = AccessPolicy::parse(&policy)
        {
            config.server.policy = p;
        }

        if let Ok(path) = std::env::var("SHARCACHE_ROOT") {
            config.store.root = PathBuf::from(path);
        }

        if let Ok(bytes) = std::env::var("SHARCACHE_CEILING_BYTES")
            && let Ok(n) = bytes.parse()
        {
            config.store.ceiling_bytes = n;
        }

        if let Ok(ratio) = std::env::var("SHARCACHE_LOW_WATERMARK")
            && let Ok(r) = ratio.parse()
        {
            config.store.low_watermark = r;
        }

        if let Ok(addr) = std::env::var("SHARCACHE_METRICS_ADDR") {
            config.metrics.listen_addr = addr;
        }

        if let Ok(enabled) = std::env::var("SHARCACHE_METRICS_ENABLED") {
            config.metrics.enabled = enabled.to_lowercase() == "true" || enabled == "1";
        }

        config
    }
}
