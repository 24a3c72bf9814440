//! # Palisade Threat — Per-identity threat state
//!
//! Everything the pipeline knows about an attacking identity lives here:
//! - **Threat Ledger** — per-IP profiles with lifetime counters, bounded
//!   event history, login lockouts, and TTL eviction
//! - **Threat Scorer** — the pure counters → (level, score) function
//! - **Counter-Measure Engine** — escalating responses per finding
//! - **Behavior Analyzer** — sliding-window anomaly checks
//! - **Geo Tracker** — cached, best-effort IP geolocation

pub mod behavior;
pub mod countermeasures;
pub mod geo_tracker;
pub mod scorer;
pub mod threat_ledger;
pub mod types;

pub use countermeasures::CounterMeasureEngine;
pub use geo_tracker::{GeoResolver, GeoTracker};
pub use threat_ledger::{IdentityProfile, ThreatLedger};
pub use types::{Measure, ThreatLevel};
