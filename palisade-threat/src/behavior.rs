//! Behavior Analyzer — sliding-window anomaly checks per identity.
//!
//! Complements the signature path: even when individual requests look
//! harmless, their frequency and mix can give an attacker away. Thresholds
//! are per-minute or per-hour over the identity's bounded event history and
//! rate windows.

use crate::threat_ledger::{IdentityProfile, ThreatLedger};
use crate::types::*;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const MAX_ALERTS: usize = 10_000;
const HOUR_SECS: i64 = 3_600;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct BehaviorThresholds {
    pub requests_per_minute: u32,
    pub login_failures_per_hour: u32,
    pub xss_per_hour: usize,
    pub sqli_per_hour: usize,
    pub spam_comments_per_hour: u32,
}

impl Default for BehaviorThresholds {
    fn default() -> Self {
        Self {
            requests_per_minute: 100,
            login_failures_per_hour: 10,
            xss_per_hour: 5,
            sqli_per_hour: 3,
            spam_comments_per_hour: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    HighRequestFrequency,
    BruteForceLogin,
    XssBarrage,
    SqliBarrage,
    SpamFlood,
    MultiVector,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BehaviorThreat {
    pub kind: BehaviorKind,
    pub severity: Severity,
    pub description: String,
    pub count: u64,
}

pub struct BehaviorAnalyzer {
    thresholds: BehaviorThresholds,
    alerts: RwLock<Vec<ThreatAlert>>,
    total_analyzed: AtomicU64,
    total_threats: AtomicU64,
}

impl BehaviorAnalyzer {
    pub fn new(thresholds: BehaviorThresholds) -> Self {
        Self {
            thresholds,
            alerts: RwLock::new(Vec::new()),
            total_analyzed: AtomicU64::new(0),
            total_threats: AtomicU64::new(0),
        }
    }

    /// Run every behavior check for one identity. The ledger supplies the
    /// event history and rate counters; `request_rate` is the live
    /// requests-per-minute count for this identity.
    pub fn analyze(
        &self,
        ledger: &ThreatLedger,
        profile: &IdentityProfile,
        request_rate: u32,
        now: i64,
    ) -> Vec<BehaviorThreat> {
        self.total_analyzed.fetch_add(1, Ordering::Relaxed);
        let ip = profile.ip.as_str();
        let t = &self.thresholds;
        let mut threats = Vec::new();

        if request_rate > t.requests_per_minute {
            threats.push(BehaviorThreat {
                kind: BehaviorKind::HighRequestFrequency,
                severity: Severity::High,
                description: format!("{} sent {} requests inside one minute", ip, request_rate),
                count: request_rate as u64,
            });
        }

        let login_failures = ledger.login_failures_last_hour(ip, now);
        if login_failures > t.login_failures_per_hour {
            threats.push(BehaviorThreat {
                kind: BehaviorKind::BruteForceLogin,
                severity: Severity::Critical,
                description: format!("{} failed login {} times inside one hour", ip, login_failures),
                count: login_failures as u64,
            });
        }

        let xss = ledger.recent_count(ip, AttackType::Xss, HOUR_SECS, now);
        if xss > t.xss_per_hour {
            threats.push(BehaviorThreat {
                kind: BehaviorKind::XssBarrage,
                severity: Severity::High,
                description: format!("{} attempted XSS {} times inside one hour", ip, xss),
                count: xss as u64,
            });
        }

        let sqli = ledger.recent_count(ip, AttackType::SqlInjection, HOUR_SECS, now);
        if sqli > t.sqli_per_hour {
            threats.push(BehaviorThreat {
                kind: BehaviorKind::SqliBarrage,
                severity: Severity::Critical,
                description: format!("{} attempted SQL injection {} times inside one hour", ip, sqli),
                count: sqli as u64,
            });
        }

        let spam = ledger.spam_comments_last_hour(ip, now);
        if spam > t.spam_comments_per_hour {
            threats.push(BehaviorThreat {
                kind: BehaviorKind::SpamFlood,
                severity: Severity::Medium,
                description: format!("{} posted {} spam comments inside one hour", ip, spam),
                count: spam as u64,
            });
        }

        // Mixing attack kinds inside one hour is the strongest signal of a
        // human-driven probe rather than stray crawler noise.
        let recent_types = ledger.recent_distinct_types(ip, HOUR_SECS, now);
        let vectors: Vec<&str> = recent_types
            .iter()
            .filter(|t| !matches!(t, AttackType::Scanning | AttackType::HoneypotAccess))
            .map(|t| t.as_str())
            .collect();
        if vectors.len() >= 2 {
            threats.push(BehaviorThreat {
                kind: BehaviorKind::MultiVector,
                severity: Severity::Critical,
                description: format!("{} used multiple attack vectors: {}", ip, vectors.join(", ")),
                count: vectors.len() as u64,
            });
        }

        for threat in &threats {
            self.total_threats.fetch_add(1, Ordering::Relaxed);
            warn!(
                ip = %ip,
                kind = ?threat.kind,
                severity = ?threat.severity,
                "Behavior threat detected"
            );
            self.add_alert(now, threat.severity, "Behavior threat", &threat.description);
        }

        threats
    }

    pub fn thresholds(&self) -> BehaviorThresholds {
        self.thresholds
    }

    pub fn total_analyzed(&self) -> u64 {
        self.total_analyzed.load(Ordering::Relaxed)
    }

    pub fn total_threats(&self) -> u64 {
        self.total_threats.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> Vec<ThreatAlert> {
        self.alerts.read().clone()
    }

    fn add_alert(&self, ts: i64, sev: Severity, title: &str, details: &str) {
        let mut a = self.alerts.write();
        if a.len() >= MAX_ALERTS {
            a.remove(0);
        }
        a.push(ThreatAlert {
            timestamp: ts,
            severity: sev,
            component: "behavior_analyzer".into(),
            title: title.into(),
            details: details.into(),
        });
    }
}
