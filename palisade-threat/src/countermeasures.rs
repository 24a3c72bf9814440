//! Counter-Measure Engine — escalating responses per finding.
//!
//! Every rule is evaluated independently (measures are not mutually
//! exclusive) and every applied set is logged and recorded. BLOCK flips the
//! profile's block flag with a 24-hour expiry; the legal warning is sent at
//! most once per identity.

use crate::threat_ledger::{IdentityProfile, ThreatLedger};
use crate::types::*;
use palisade_core::config::CounterMeasureConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const MAX_RECORDS: usize = 10_000;
const MAX_ALERTS: usize = 10_000;

/// Attack count at which an identity gets blocked.
const BLOCK_ATTACK_THRESHOLD: u64 = 3;
/// Attack count at which honeypot redirection starts.
const REDIRECT_ATTACK_THRESHOLD: u64 = 2;
/// Attack count past which the legal warning goes out.
const LEGAL_WARNING_THRESHOLD: u64 = 5;

pub struct CounterMeasureEngine {
    config: CounterMeasureConfig,
    records: RwLock<Vec<CounterMeasureRecord>>,
    measure_counts: RwLock<HashMap<Measure, u64>>,
    alerts: RwLock<Vec<ThreatAlert>>,
    total_executed: AtomicU64,
}

impl CounterMeasureEngine {
    pub fn new(config: CounterMeasureConfig) -> Self {
        Self {
            config,
            records: RwLock::new(Vec::new()),
            measure_counts: RwLock::new(HashMap::new()),
            alerts: RwLock::new(Vec::new()),
            total_executed: AtomicU64::new(0),
        }
    }

    /// Decide which measures apply to this profile state. Pure — no state
    /// is touched; `execute` applies the result.
    pub fn decide(&self, profile: &IdentityProfile) -> Vec<Measure> {
        let total = profile.total_attack_count();
        let level = profile.threat_level;
        let mut measures = Vec::new();

        if self.config.auto_block && Self::should_block(profile) {
            measures.push(Measure::Block);
        }
        if self.config.honeypot_redirect
            && total >= REDIRECT_ATTACK_THRESHOLD
            && level != ThreatLevel::Low
        {
            measures.push(Measure::HoneypotRedirect);
        }
        if level >= ThreatLevel::High {
            measures.push(Measure::ResourceLimit);
        }
        measures.push(Measure::EnhancedMonitoring);
        if self.config.legal_notification && total > LEGAL_WARNING_THRESHOLD && !profile.legal_warned
        {
            measures.push(Measure::LegalWarning);
        }
        measures
    }

    fn should_block(profile: &IdentityProfile) -> bool {
        profile.total_attack_count() >= BLOCK_ATTACK_THRESHOLD
            || profile.threat_level == ThreatLevel::Critical
            || profile.honeypot_hits > 0
    }

    /// Decide and apply: flip block state, mark the legal warning sent, and
    /// record the full measure set against the finding.
    pub fn execute(
        &self,
        ledger: &ThreatLedger,
        profile: &IdentityProfile,
        finding: &Finding,
        now: i64,
    ) -> Vec<Measure> {
        let measures = self.decide(profile);
        self.total_executed.fetch_add(1, Ordering::Relaxed);

        for measure in &measures {
            match measure {
                Measure::Block => {
                    ledger.apply_block(&profile.ip, now + self.config.block_duration_secs, now);
                }
                Measure::LegalWarning => {
                    if ledger.mark_legal_warned(&profile.ip) {
                        let text = render_legal_warning(&profile.ip, now);
                        warn!(ip = %profile.ip, "Legal warning issued");
                        self.add_alert(now, Severity::High, "Legal warning issued", &text);
                    }
                }
                _ => {}
            }
            *self.measure_counts.write().entry(*measure).or_insert(0) += 1;
        }

        let applied: Vec<&str> = measures.iter().map(|m| m.as_str()).collect();
        warn!(
            ip = %profile.ip,
            attack = finding.attack_type.as_str(),
            level = profile.threat_level.as_str(),
            measures = %applied.join(","),
            "Counter-measures applied"
        );

        let mut records = self.records.write();
        if records.len() >= MAX_RECORDS {
            let half = records.len() / 2;
            records.drain(..half);
        }
        records.push(CounterMeasureRecord {
            source_ip: profile.ip.clone(),
            timestamp: now,
            attack_type: finding.attack_type,
            pattern: finding.pattern.clone(),
            measures: measures.clone(),
        });

        measures
    }

    pub fn records(&self) -> Vec<CounterMeasureRecord> {
        self.records.read().clone()
    }

    pub fn measure_counts(&self) -> HashMap<Measure, u64> {
        self.measure_counts.read().clone()
    }

    pub fn total_executed(&self) -> u64 {
        self.total_executed.load(Ordering::Relaxed)
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
            component: "countermeasures".into(),
            title: title.into(),
            details: details.into(),
        });
    }
}

/// The warning text recorded against an identity the first time its attack
/// count crosses the legal threshold.
pub fn render_legal_warning(ip: &str, now: i64) -> String {
    let when = chrono::DateTime::from_timestamp(now, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();
    format!(
        "LEGAL WARNING\n\
         \n\
         IP address: {ip}\n\
         Time: {when}\n\
         \n\
         Your activity has been identified as unauthorized access attempts\n\
         against this system. Such conduct may constitute a criminal offense\n\
         under applicable computer misuse legislation.\n\
         \n\
         We have recorded all of your activity, including:\n\
         - IP address and geographic location\n\
         - Attack types and payloads\n\
         - Timestamps and access patterns\n\
         - Digital fingerprint information\n\
         \n\
         Cease this activity immediately. Continued attempts will be\n\
         reported to law enforcement and your ISP, and may result in legal\n\
         proceedings.\n\
         \n\
         This warning has been recorded and is admissible as evidence."
    )
}
