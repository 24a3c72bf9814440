//! Shared types for the forensics layer.

use palisade_web::types::{AttackType, Severity};
use std::collections::HashMap;

/// Snapshot of the offending request, frozen at collection time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// The header subset forensic analysts reach for first.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForensicHeaders {
    pub user_agent: String,
    pub referer: String,
    pub x_forwarded_for: String,
    pub x_real_ip: String,
    pub fingerprint: String,
}

/// Append-only record of one detected finding. Never mutated after
/// creation; retrievable by id from the day partition it was written to.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EvidenceRecord {
    pub id: String,
    pub collected_at: i64,
    pub attacker_ip: String,
    pub attack_type: AttackType,
    pub severity: Severity,
    pub pattern: String,
    pub payload_excerpt: String,
    pub request: RequestSnapshot,
    pub forensics: ForensicHeaders,
    pub blocked: bool,
    pub action: String,
}

/// One periodic aggregate report over the ledger and evidence stats.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AttackReport {
    pub generated_at: i64,
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub attack_types: HashMap<String, u64>,
    pub threat_levels: HashMap<String, u64>,
    pub top_attackers: Vec<TopAttacker>,
    pub geo_distribution: HashMap<String, u64>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Hourly,
    SixHourly,
    Daily,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportPeriod::Hourly => "hourly",
            ReportPeriod::SixHourly => "six-hourly",
            ReportPeriod::Daily => "daily",
        }
    }

    /// How far back "active" reaches for this period.
    pub fn horizon_secs(self) -> i64 {
        match self {
            ReportPeriod::Hourly => 3_600,
            ReportPeriod::SixHourly => 6 * 3_600,
            ReportPeriod::Daily => 24 * 3_600,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ReportSummary {
    pub total_attackers: u64,
    pub active_attackers: u64,
    pub total_attacks: u64,
    pub blocked_ips: u64,
    pub honeypot_hits: u64,
    pub evidence_collected: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TopAttacker {
    pub ip: String,
    pub attack_count: u64,
    pub threat_level: String,
    pub country: String,
}
