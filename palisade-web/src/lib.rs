//! # Palisade Web — Request-facing detection layer
//!
//! Stateless-per-request inspection of inbound HTTP traffic:
//! - **Signature Matcher** — declarative regex groups over URL, body, and
//!   headers; one finding per group per request
//! - **Honeypot Registry** — decoy routes whose access is itself a
//!   maximum-confidence finding

pub mod honeypot_registry;
pub mod signature_matcher;
pub mod types;

pub use honeypot_registry::HoneypotRegistry;
pub use signature_matcher::SignatureMatcher;
pub use types::{AttackType, Finding, RequestView, Severity};

#[cfg(test)]
mod tests;
