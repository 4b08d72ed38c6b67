//! Prelude module for common imports.
//!
//! This module re-exports commonly used types and traits for convenience.
//!
//! # Usage
//!
//! ```ignore
//! use sharcache::prelude::*;
//! ```

// Error types
pub use crate::error::{ProtocolError, Result, SharcacheError, StoreError};

// Configuration
pub use crate::config::{AccessPolicy, Config, MetricsConfig, ServerConfig, StoreConfig};

// Storage
pub use crate::store::{Blob, BlobStore, CacheIndex, EvictionManager};

// Protocol
pub use crate::protocol::{Command, HEADER_SIZE, ResponseWriter};

// Metrics
pub use crate::metrics::Metrics;

// Server
pub use crate::server::Server;

// Common external crates
pub use std::sync::Arc;
pub use tracing::{debug, error, info, trace, warn};
