//! Report Generator — periodic aggregate projections.
//!
//! Read-only over the threat ledger and evidence stats: nothing here
//! mutates pipeline state. Generated reports are kept in a bounded
//! in-memory feed and persisted to the blob store under `reports/`.

use crate::types::*;
use palisade_core::store::{utc_date, BlobStore};
use palisade_threat::threat_ledger::IdentityProfile;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const TOP_ATTACKERS: usize = 10;

pub struct ReportGenerator {
    store: Arc<dyn BlobStore>,
    reports: RwLock<Vec<AttackReport>>,
    max_reports: usize,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn BlobStore>, max_reports: usize) -> Self {
        Self { store, reports: RwLock::new(Vec::new()), max_reports: max_reports.max(1) }
    }

    /// Build one report over the current profile set.
    pub fn generate(
        &self,
        profiles: &[IdentityProfile],
        evidence_collected: u64,
        period: ReportPeriod,
        now: i64,
    ) -> AttackReport {
        let mut summary = ReportSummary {
            total_attackers: profiles.len() as u64,
            evidence_collected,
            ..Default::default()
        };
        let mut attack_types: HashMap<String, u64> = HashMap::new();
        let mut threat_levels: HashMap<String, u64> = HashMap::new();
        let mut geo_distribution: HashMap<String, u64> = HashMap::new();
        let mut top: Vec<TopAttacker> = Vec::new();

        for p in profiles {
            summary.total_attacks += p.total_attack_count();
            summary.honeypot_hits += p.honeypot_hits;
            if p.blocked {
                summary.blocked_ips += 1;
            }
            if now - p.last_seen < period.horizon_secs() {
                summary.active_attackers += 1;
            }
            for t in &p.distinct_types {
                *attack_types.entry(t.as_str().to_string()).or_insert(0) += 1;
            }
            *threat_levels.entry(p.threat_level.as_str().to_string()).or_insert(0) += 1;
            *geo_distribution.entry(p.country().to_string()).or_insert(0) += 1;

            top.push(TopAttacker {
                ip: p.ip.clone(),
                attack_count: p.total_attack_count(),
                threat_level: p.threat_level.as_str().to_string(),
                country: p.country().to_string(),
            });
        }

        top.sort_by(|a, b| b.attack_count.cmp(&a.attack_count));
        top.truncate(TOP_ATTACKERS);

        let report = AttackReport {
            generated_at: now,
            period,
            recommendations: recommendations(&summary, &threat_levels, &attack_types),
            summary,
            attack_types,
            threat_levels,
            top_attackers: top,
            geo_distribution,
        };

        self.retain_and_push(report.clone());
        self.persist(&report);
        info!(
            period = period.as_str(),
            attackers = report.summary.total_attackers,
            attacks = report.summary.total_attacks,
            "Attack report generated"
        );
        report
    }

    fn retain_and_push(&self, report: AttackReport) {
        let mut reports = self.reports.write();
        if reports.len() >= self.max_reports {
            reports.remove(0);
        }
        reports.push(report);
    }

    fn persist(&self, report: &AttackReport) {
        let date = utc_date(report.generated_at);
        let id = format!("attack-report-{}-{}", report.period.as_str(), report.generated_at);
        match serde_json::to_vec_pretty(report) {
            Ok(json) => {
                if let Err(e) = self.store.put("reports", &date, &format!("{}.json", id), &json) {
                    warn!(report = %id, error = %e, "Report persistence failed");
                }
            }
            Err(e) => warn!(report = %id, error = %e, "Report serialization failed"),
        }
        let text = render_report(report);
        if let Err(e) = self.store.put("reports", &date, &format!("{}.txt", id), text.as_bytes()) {
            warn!(report = %id, error = %e, "Report text persistence failed");
        }
    }

    pub fn reports(&self) -> Vec<AttackReport> {
        self.reports.read().clone()
    }

    pub fn latest(&self) -> Option<AttackReport> {
        self.reports.read().last().cloned()
    }
}

fn recommendations(
    summary: &ReportSummary,
    threat_levels: &HashMap<String, u64>,
    attack_types: &HashMap<String, u64>,
) -> Vec<String> {
    let mut recs = Vec::new();
    if threat_levels.get("CRITICAL").copied().unwrap_or(0) > 0 {
        recs.push("Review CRITICAL-level identities immediately; consider permanent blocks".into());
    }
    if summary.honeypot_hits > 10 {
        recs.push("Honeypots are seeing heavy traffic; consider deploying more decoys".into());
    }
    if summary.active_attackers > 20 {
        recs.push("Large number of active attackers; consider tightening block thresholds".into());
    }
    if let Some((top_type, _)) = attack_types.iter().max_by_key(|(_, c)| **c) {
        recs.push(format!("Dominant attack type is {}; review its defenses", top_type));
    }
    if recs.is_empty() {
        recs.push("Security posture nominal; continue monitoring".into());
    }
    recs
}

/// Human-readable rendering, persisted next to the JSON report.
pub fn render_report(report: &AttackReport) -> String {
    let when = chrono::DateTime::from_timestamp(report.generated_at, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    let mut attack_types: Vec<_> = report.attack_types.iter().collect();
    attack_types.sort_by(|a, b| b.1.cmp(a.1));
    let attack_lines = attack_types
        .iter()
        .map(|(t, c)| format!("{}: {}", t, c))
        .collect::<Vec<_>>()
        .join("\n");

    let top_lines = report
        .top_attackers
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!("{}. {} ({}) - {} attacks [{}]", i + 1, a.ip, a.country, a.attack_count, a.threat_level)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut geo: Vec<_> = report.geo_distribution.iter().collect();
    geo.sort_by(|a, b| b.1.cmp(a.1));
    let geo_lines =
        geo.iter().map(|(c, n)| format!("{}: {}", c, n)).collect::<Vec<_>>().join("\n");

    format!(
        "=== ATTACK MONITORING REPORT ===\n\
         Generated: {when}\n\
         Period: {period}\n\
         \n\
         === SUMMARY ===\n\
         Total attackers: {total}\n\
         Active attackers: {active}\n\
         Total attacks: {attacks}\n\
         Blocked IPs: {blocked}\n\
         Honeypot hits: {honeypot}\n\
         Evidence collected: {evidence}\n\
         \n\
         === THREAT LEVELS ===\n\
         CRITICAL: {crit}\n\
         HIGH: {high}\n\
         MEDIUM: {medium}\n\
         LOW: {low}\n\
         \n\
         === ATTACK TYPES ===\n\
         {attack_lines}\n\
         \n\
         === TOP ATTACKERS ===\n\
         {top_lines}\n\
         \n\
         === GEOGRAPHIC DISTRIBUTION ===\n\
         {geo_lines}\n\
         \n\
         === RECOMMENDATIONS ===\n\
         {recs}\n",
        when = when,
        period = report.period.as_str(),
        total = report.summary.total_attackers,
        active = report.summary.active_attackers,
        attacks = report.summary.total_attacks,
        blocked = report.summary.blocked_ips,
        honeypot = report.summary.honeypot_hits,
        evidence = report.summary.evidence_collected,
        crit = report.threat_levels.get("CRITICAL").copied().unwrap_or(0),
        high = report.threat_levels.get("HIGH").copied().unwrap_or(0),
        medium = report.threat_levels.get("MEDIUM").copied().unwrap_or(0),
        low = report.threat_levels.get("LOW").copied().unwrap_or(0),
        attack_lines = attack_lines,
        top_lines = top_lines,
        geo_lines = geo_lines,
        recs = report.recommendations.iter().map(|r| format!("- {}", r)).collect::<Vec<_>>().join("\n"),
    )
}
