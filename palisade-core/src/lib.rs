//! # Palisade Core — Shared infrastructure
//!
//! Every Palisade security layer links against this crate. It carries the
//! pieces the layers have in common:
//! - **Error type** — one workspace-wide error enum with a result alias
//! - **Config loader** — `palisade.toml` deserialized into typed sections
//! - **Ring history** — fixed-capacity event history with O(1) eviction
//! - **Expiring map** — TTL-bounded map for caches and stale-state eviction
//! - **Rate window** — short-horizon decaying counter for frequency checks
//! - **Blob store** — day-partitioned durable key→bytes storage abstraction

pub mod config;
pub mod error;
pub mod expiry;
pub mod ring;
pub mod store;
pub mod window;

pub use config::PalisadeConfig;
pub use error::{PalisadeError, PalisadeResult};

/// Seconds in one day, used by retention and partitioning logic.
pub const DAY_SECS: i64 = 86_400;
