//! Shared types for the threat layer.

pub use palisade_web::types::{AttackType, Finding, Severity};

/// Coarse classification derived from an identity's aggregated behavior.
/// Always a pure function of the profile's counters — never mutated
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

/// An automated response action taken against an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Measure {
    Block,
    FlagSuspicious,
    HoneypotRedirect,
    ResourceLimit,
    EnhancedMonitoring,
    LegalWarning,
}

impl Measure {
    pub fn as_str(self) -> &'static str {
        match self {
            Measure::Block => "BLOCK",
            Measure::FlagSuspicious => "FLAG_SUSPICIOUS",
            Measure::HoneypotRedirect => "HONEYPOT_REDIRECT",
            Measure::ResourceLimit => "RESOURCE_LIMIT",
            Measure::EnhancedMonitoring => "ENHANCED_MONITORING",
            Measure::LegalWarning => "LEGAL_WARNING",
        }
    }
}

/// All measures applied in response to one finding.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CounterMeasureRecord {
    pub source_ip: String,
    pub timestamp: i64,
    pub attack_type: AttackType,
    pub pattern: String,
    pub measures: Vec<Measure>,
}

/// Best-effort geolocation data for an identity. Every field defaults to
/// "Unknown" when the lookup fails or has not run yet.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GeoInfo {
    pub ip: String,
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub isp: String,
    pub org: String,
    pub asn: String,
    pub mobile: bool,
    pub proxy: bool,
    pub hosting: bool,
}

impl GeoInfo {
    pub fn unknown(ip: &str) -> Self {
        Self {
            ip: ip.to_string(),
            country: "Unknown".into(),
            country_code: "Unknown".into(),
            region: "Unknown".into(),
            city: "Unknown".into(),
            lat: 0.0,
            lon: 0.0,
            timezone: "Unknown".into(),
            isp: "Unknown".into(),
            org: "Unknown".into(),
            asn: "Unknown".into(),
            mobile: false,
            proxy: false,
            hosting: false,
        }
    }
}

/// Bounded alert feed entry for the threat layer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ThreatAlert {
    pub timestamp: i64,
    pub severity: Severity,
    pub component: String,
    pub title: String,
    pub details: String,
}
