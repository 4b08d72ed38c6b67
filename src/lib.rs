//! # Sharcache
//!
//! Network blob cache for build artifacts, with sharded on-disk storage,
//! bounded capacity and batched LRU eviction.
//!
//! Build tooling submits compiled artifacts as named blobs under a content
//! *signature* and fetches them back over a simple fixed-header TCP
//! protocol. The cache is strictly best-effort: a miss, an eviction or a
//! dropped connection all mean the same thing to a client - recompute the
//! value.
//!
//! ## Features
//!
//! - Fixed 128-byte header protocol (GET, PUT, LST, CLN, RST, BYE)
//! - Sharded filesystem storage with atomic rename commits
//! - In-memory index rebuilt from a full scan at startup, never persisted
//! - Byte-size ceiling with oldest-first eviction down to a low watermark
//! - Access policy variants: unrestricted, get-only, put-only
//! - Prometheus metrics and health check endpoints
//!
//! ## Example
//!
//! ```ignore
//! use sharcache::config::Config;
//! use sharcache::store::BlobStore;
//! use sharcache::server::Server;
//!
//! let config = Config::default();
//! let store = BlobStore::open(&config.store)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────────────────────┐
//! │ build tool   │────▶│ Sharcache                       │
//! │ (cache       │     │  ├─ fixed-header TCP protocol   │
//! │  client)     │     │  ├─ shard/signature/blob tree   │
//! └──────────────┘     │  └─ LRU eviction w/ hysteresis  │
//!                      └─────────────────────────────────┘
//! ```

// Modules
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod prelude;
pub mod protocol;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use error::{ProtocolError, Result, SharcacheError, StoreError};
