//! Threat Ledger — per-identity rolling state.
//!
//! One `IdentityProfile` per observed source IP: lifetime attack counters,
//! the distinct attack types ever seen, a bounded event history for window
//! queries, block state, and a digital fingerprint. The threat level stored
//! on a profile is recomputed from its counters on every update and is never
//! mutated independently.
//!
//! All mutation of a given profile happens under the write lock on the
//! profile map, so concurrent findings for the same IP cannot race on
//! counter increments or level recomputation. Background sweeps use the same
//! lock and are idempotent.

use crate::scorer;
use crate::types::*;
use palisade_core::ring::RingHistory;
use palisade_core::window::RateWindow;
use palisade_core::{PalisadeError, PalisadeResult};
use palisade_web::types::RequestView;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

const MAX_ALERTS: usize = 10_000;
const MAX_TRACKED_UAS: usize = 100;
const MAX_TRACKED_PATHS: usize = 1_000;

/// Compact history entry kept on each profile.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FindingEvent {
    pub timestamp: i64,
    pub attack_type: AttackType,
    pub pattern: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IdentityProfile {
    pub ip: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub attack_counts: BTreeMap<AttackType, u64>,
    pub distinct_types: BTreeSet<AttackType>,
    pub user_agents: BTreeSet<String>,
    pub requested_paths: BTreeSet<String>,
    pub honeypot_hits: u64,
    pub threat_level: ThreatLevel,
    pub threat_score: u8,
    pub blocked: bool,
    pub block_expiry: Option<i64>,
    pub legal_warned: bool,
    pub fingerprint: Option<String>,
    pub geo: Option<GeoInfo>,
    pub history: RingHistory<FindingEvent>,
}

impl IdentityProfile {
    fn new(ip: &str, now: i64, history_capacity: usize) -> Self {
        Self {
            ip: ip.to_string(),
            first_seen: now,
            last_seen: now,
            attack_counts: BTreeMap::new(),
            distinct_types: BTreeSet::new(),
            user_agents: BTreeSet::new(),
            requested_paths: BTreeSet::new(),
            honeypot_hits: 0,
            threat_level: ThreatLevel::Low,
            threat_score: 0,
            blocked: false,
            block_expiry: None,
            legal_warned: false,
            fingerprint: None,
            geo: None,
            history: RingHistory::new(history_capacity),
        }
    }

    pub fn total_attack_count(&self) -> u64 {
        self.attack_counts.values().sum()
    }

    pub fn country(&self) -> &str {
        self.geo.as_ref().map(|g| g.country.as_str()).unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct LoginRecord {
    failures: u32,
    hourly: RateWindow,
    locked_until: Option<i64>,
}

/// Outcome of one failed login attempt.
#[derive(Debug, Clone, Copy)]
pub struct LoginFailureOutcome {
    pub failures: u32,
    /// True exactly when this attempt tripped the lockout.
    pub locked: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LedgerStats {
    pub total_profiles: u64,
    pub blocked_ips: u64,
    pub honeypot_hits: u64,
    pub threat_levels: BTreeMap<ThreatLevel, u64>,
}

pub struct ThreatLedger {
    profiles: RwLock<HashMap<String, IdentityProfile>>,
    logins: RwLock<HashMap<String, LoginRecord>>,
    request_rates: RwLock<HashMap<String, RateWindow>>,
    spam_rates: RwLock<HashMap<String, RateWindow>>,
    alerts: RwLock<Vec<ThreatAlert>>,
    history_capacity: usize,
    login_failure_limit: u32,
    login_lockout_secs: i64,
    total_recorded: AtomicU64,
    total_evicted: AtomicU64,
}

impl ThreatLedger {
    pub fn new(history_capacity: usize, login_failure_limit: u32, login_lockout_secs: i64) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            logins: RwLock::new(HashMap::new()),
            request_rates: RwLock::new(HashMap::new()),
            spam_rates: RwLock::new(HashMap::new()),
            alerts: RwLock::new(Vec::new()),
            history_capacity,
            login_failure_limit,
            login_lockout_secs,
            total_recorded: AtomicU64::new(0),
            total_evicted: AtomicU64::new(0),
        }
    }

    // ── Recording ────────────────────────────────────────────────────────

    /// Upsert the identity's profile with a new finding and return the
    /// updated state. Threat level is recomputed before the lock drops.
    pub fn record(&self, finding: &Finding, req: Option<&RequestView>) -> IdentityProfile {
        self.total_recorded.fetch_add(1, Ordering::Relaxed);
        let now = finding.timestamp;
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(finding.source_ip.clone())
            .or_insert_with(|| IdentityProfile::new(&finding.source_ip, now, self.history_capacity));

        let prev_level = profile.threat_level;
        profile.last_seen = now;
        *profile.attack_counts.entry(finding.attack_type).or_insert(0) += 1;
        profile.distinct_types.insert(finding.attack_type);
        if finding.attack_type == AttackType::HoneypotAccess {
            profile.honeypot_hits += 1;
        }

        if let Some(req) = req {
            let ua = req.user_agent();
            if !ua.is_empty() && profile.user_agents.len() < MAX_TRACKED_UAS {
                profile.user_agents.insert(ua.to_string());
            }
            if profile.requested_paths.len() < MAX_TRACKED_PATHS {
                profile.requested_paths.insert(req.url.clone());
            }
            profile.fingerprint = Some(request_fingerprint(req));
        }

        profile.history.push(FindingEvent {
            timestamp: now,
            attack_type: finding.attack_type,
            pattern: finding.pattern.clone(),
        });

        let (level, score) = scorer::score(profile, now);
        profile.threat_level = level;
        profile.threat_score = score;

        let snapshot = profile.clone();
        drop(profiles);

        if level > prev_level && level >= ThreatLevel::High {
            warn!(
                ip = %snapshot.ip,
                level = level.as_str(),
                score,
                attacks = snapshot.total_attack_count(),
                "Threat level escalation"
            );
            self.add_alert(
                now,
                if level == ThreatLevel::Critical { Severity::Critical } else { Severity::High },
                "Threat escalation",
                &format!(
                    "{} level={} score={} attacks={}",
                    snapshot.ip,
                    level.as_str(),
                    score,
                    snapshot.total_attack_count()
                ),
            );
        }

        snapshot
    }

    /// Count recent history entries of `kind` inside the window.
    pub fn is_over_threshold(
        &self,
        ip: &str,
        kind: AttackType,
        window_secs: i64,
        threshold: usize,
        now: i64,
    ) -> bool {
        self.recent_count(ip, kind, window_secs, now) >= threshold
    }

    pub fn recent_count(&self, ip: &str, kind: AttackType, window_secs: i64, now: i64) -> usize {
        self.profiles
            .read()
            .get(ip)
            .map(|p| {
                p.history
                    .iter()
                    .filter(|e| e.attack_type == kind && now - e.timestamp < window_secs)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Distinct attack types observed inside the window.
    pub fn recent_distinct_types(&self, ip: &str, window_secs: i64, now: i64) -> BTreeSet<AttackType> {
        self.profiles
            .read()
            .get(ip)
            .map(|p| {
                p.history
                    .iter()
                    .filter(|e| now - e.timestamp < window_secs)
                    .map(|e| e.attack_type)
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── Block state ──────────────────────────────────────────────────────

    pub fn apply_block(&self, ip: &str, until: i64, now: i64) {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(ip.to_string())
            .or_insert_with(|| IdentityProfile::new(ip, now, self.history_capacity));
        profile.blocked = true;
        profile.block_expiry = Some(until);
        info!(ip = %ip, until, "IP blocked");
    }

    /// Whether the identity is under an active, unexpired block. Expired
    /// blocks are cleared lazily on the next check.
    pub fn is_blocked(&self, ip: &str, now: i64) -> bool {
        let expired = {
            let profiles = self.profiles.read();
            match profiles.get(ip) {
                Some(p) if p.blocked => match p.block_expiry {
                    Some(expiry) => now >= expiry,
                    None => false,
                },
                _ => return false,
            }
        };
        if expired {
            let mut profiles = self.profiles.write();
            if let Some(p) = profiles.get_mut(ip) {
                if p.block_expiry.map(|e| now >= e).unwrap_or(false) {
                    p.blocked = false;
                    p.block_expiry = None;
                    info!(ip = %ip, "Block expired");
                }
            }
            return false;
        }
        true
    }

    /// Set the one-time legal-warning flag. Returns true only the first
    /// time, so the warning is never re-sent.
    pub fn mark_legal_warned(&self, ip: &str) -> bool {
        let mut profiles = self.profiles.write();
        match profiles.get_mut(ip) {
            Some(p) if !p.legal_warned => {
                p.legal_warned = true;
                true
            }
            _ => false,
        }
    }

    pub fn set_geo(&self, ip: &str, geo: GeoInfo) {
        if let Some(p) = self.profiles.write().get_mut(ip) {
            p.geo = Some(geo);
        }
    }

    // ── Request / spam rate tracking ─────────────────────────────────────

    /// Record one inbound request; returns the count in the live
    /// one-minute window.
    pub fn record_request(&self, ip: &str, now: i64) -> u32 {
        let mut rates = self.request_rates.write();
        rates.entry(ip.to_string()).or_insert_with(|| RateWindow::new(60, now)).hit(now)
    }

    pub fn record_spam_comment(&self, ip: &str, now: i64) -> u32 {
        let mut rates = self.spam_rates.write();
        rates.entry(ip.to_string()).or_insert_with(|| RateWindow::new(3600, now)).hit(now)
    }

    pub fn spam_comments_last_hour(&self, ip: &str, now: i64) -> u32 {
        let mut rates = self.spam_rates.write();
        rates.get_mut(ip).map(|w| w.current(now)).unwrap_or(0)
    }

    // ── Login protection ─────────────────────────────────────────────────

    /// Record one failed login. Tripping the limit locks the identity out
    /// for the configured duration.
    pub fn record_login_failure(&self, ip: &str, now: i64) -> LoginFailureOutcome {
        let mut logins = self.logins.write();
        let record = logins.entry(ip.to_string()).or_insert_with(|| LoginRecord {
            failures: 0,
            hourly: RateWindow::new(3600, now),
            locked_until: None,
        });
        record.failures += 1;
        record.hourly.hit(now);
        let lock_active = record.locked_until.map(|u| u > now).unwrap_or(false);
        let locked = record.failures >= self.login_failure_limit && !lock_active;
        if locked {
            record.locked_until = Some(now + self.login_lockout_secs);
            warn!(ip = %ip, failures = record.failures, "Login lockout");
        }
        LoginFailureOutcome { failures: record.failures, locked }
    }

    pub fn record_login_success(&self, ip: &str) {
        if let Some(record) = self.logins.write().get_mut(ip) {
            record.failures = 0;
            record.locked_until = None;
        }
    }

    pub fn is_login_locked(&self, ip: &str, now: i64) -> bool {
        let mut logins = self.logins.write();
        match logins.get_mut(ip) {
            Some(record) => match record.locked_until {
                Some(until) if now >= until => {
                    record.locked_until = None;
                    record.failures = 0;
                    false
                }
                Some(_) => true,
                None => false,
            },
            None => false,
        }
    }

    pub fn login_failures_last_hour(&self, ip: &str, now: i64) -> u32 {
        let mut logins = self.logins.write();
        logins.get_mut(ip).map(|r| r.hourly.current(now)).unwrap_or(0)
    }

    // ── Retention sweep ──────────────────────────────────────────────────

    /// Evict profiles idle past the retention horizon and trim surviving
    /// histories to it. Idempotent; safe to re-run at any cadence.
    pub fn sweep(&self, retention_secs: i64, now: i64) -> usize {
        let mut profiles = self.profiles.write();
        let before = profiles.len();
        profiles.retain(|_, p| now - p.last_seen <= retention_secs);
        for p in profiles.values_mut() {
            p.history.retain(|e| now - e.timestamp <= retention_secs);
        }
        let evicted = before - profiles.len();
        drop(profiles);

        self.logins.write().retain(|_, r| {
            r.locked_until.map(|u| u > now).unwrap_or(false) || r.failures > 0
        });
        self.request_rates.write().retain(|_, w| w.reset_at > now);
        self.spam_rates.write().retain(|_, w| w.reset_at > now);

        if evicted > 0 {
            self.total_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            info!(evicted, "Ledger sweep evicted idle profiles");
        }
        evicted
    }

    // ── Snapshot / restore ───────────────────────────────────────────────

    pub fn snapshot(&self) -> PalisadeResult<Vec<u8>> {
        let profiles = self.profiles.read();
        Ok(serde_json::to_vec(&*profiles)?)
    }

    pub fn restore(&self, data: &[u8]) -> PalisadeResult<()> {
        let restored: HashMap<String, IdentityProfile> =
            serde_json::from_slice(data).map_err(PalisadeError::Serde)?;
        let count = restored.len();
        *self.profiles.write() = restored;
        info!(profiles = count, "Ledger state restored");
        Ok(())
    }

    // ── Read side ────────────────────────────────────────────────────────

    pub fn get(&self, ip: &str) -> Option<IdentityProfile> {
        self.profiles.read().get(ip).cloned()
    }

    /// All profiles, most recently active first.
    pub fn profiles(&self) -> Vec<IdentityProfile> {
        let mut all: Vec<_> = self.profiles.read().values().cloned().collect();
        all.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        all
    }

    pub fn stats(&self) -> LedgerStats {
        let profiles = self.profiles.read();
        let mut stats = LedgerStats { total_profiles: profiles.len() as u64, ..Default::default() };
        for p in profiles.values() {
            if p.blocked {
                stats.blocked_ips += 1;
            }
            stats.honeypot_hits += p.honeypot_hits;
            *stats.threat_levels.entry(p.threat_level).or_insert(0) += 1;
        }
        stats
    }

    pub fn total_recorded(&self) -> u64 {
        self.total_recorded.load(Ordering::Relaxed)
    }

    pub fn total_evicted(&self) -> u64 {
        self.total_evicted.load(Ordering::Relaxed)
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
            component: "threat_ledger".into(),
            title: title.into(),
            details: details.into(),
        });
    }
}

/// SHA-256 over the stable header tuple; survives IP rotation better than
/// the address itself.
pub fn request_fingerprint(req: &RequestView) -> String {
    let mut hasher = Sha256::new();
    for header in [
        "user-agent",
        "accept-language",
        "accept-encoding",
        "connection",
        "dnt",
        "upgrade-insecure-requests",
    ] {
        hasher.update(req.header(header).as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}
