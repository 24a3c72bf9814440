//! Shared types for the detection layer.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Xss,
    SqlInjection,
    PathTraversal,
    CommandInjection,
    Scanning,
    HoneypotAccess,
    BruteForce,
}

impl AttackType {
    /// Fixed severity lookup — derived from attack type, never recomputed.
    pub fn severity(self) -> Severity {
        match self {
            AttackType::SqlInjection | AttackType::CommandInjection | AttackType::HoneypotAccess => {
                Severity::Critical
            }
            AttackType::Xss | AttackType::PathTraversal => Severity::High,
            AttackType::BruteForce => Severity::Medium,
            AttackType::Scanning => Severity::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttackType::Xss => "xss",
            AttackType::SqlInjection => "sql_injection",
            AttackType::PathTraversal => "path_traversal",
            AttackType::CommandInjection => "command_injection",
            AttackType::Scanning => "scanning",
            AttackType::HoneypotAccess => "honeypot_access",
            AttackType::BruteForce => "brute_force",
        }
    }
}

/// Read-only view of an inbound request, as handed over by the HTTP layer.
/// Header names are lowercased at construction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RequestView {
    pub method: String,
    /// Full request target, path plus query string.
    pub url: String,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub remote_ip: String,
}

impl RequestView {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        body: impl Into<String>,
        headers: &[(&str, &str)],
        remote_ip: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: body.into(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), (*v).to_string()))
                .collect(),
            remote_ip: remote_ip.into(),
        }
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str).unwrap_or("")
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent")
    }

    /// Path component without the query string.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

/// One detected signal. Immutable once created.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Finding {
    pub source_ip: String,
    pub attack_type: AttackType,
    /// Which pattern fired, e.g. `xss:script_tag`.
    pub pattern: String,
    /// Bounded excerpt of the offending payload.
    pub excerpt: String,
    pub timestamp: i64,
    pub severity: Severity,
}

/// Longest excerpt kept on a finding.
pub const EXCERPT_MAX_LEN: usize = 200;

impl Finding {
    pub fn new(
        source_ip: impl Into<String>,
        attack_type: AttackType,
        pattern: impl Into<String>,
        payload: &str,
        timestamp: i64,
    ) -> Self {
        Self {
            source_ip: source_ip.into(),
            attack_type,
            pattern: pattern.into(),
            excerpt: truncate_utf8(payload, EXCERPT_MAX_LEN),
            timestamp,
            severity: attack_type.severity(),
        }
    }
}

/// Truncate at a char boundary so excerpts never split multibyte input.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Bounded alert feed entry, one per detection event worth surfacing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetectionAlert {
    pub timestamp: i64,
    pub severity: Severity,
    pub component: String,
    pub title: String,
    pub details: String,
}
