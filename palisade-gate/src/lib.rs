//! # Palisade Gate — the request pipeline
//!
//! Wires the detection, threat, forensics, and moderation layers into the
//! flow the HTTP layer calls into:
//!
//! ```text
//! request → block check → honeypot check → signature matcher
//!         → per finding: ledger → counter-measures → evidence
//!         → behavior analysis → verdict
//! ```
//!
//! Comments run the parallel moderation path, feeding spam outcomes back
//! into the same per-IP ledger. Every engine is an explicit service object
//! constructed once here and shared by reference; there is no ambient
//! global state.

pub mod verdict;

pub use verdict::Verdict;

use palisade_core::store::BlobStore;
use palisade_core::{PalisadeConfig, DAY_SECS};
use palisade_forensics::report_generator::ReportGenerator;
use palisade_forensics::types::{AttackReport, ReportPeriod};
use palisade_forensics::EvidenceRecorder;
use palisade_moderation::types::{CommentView, CommenterView, ModerationOutcome};
use palisade_moderation::ModerationGate;
use palisade_threat::behavior::{BehaviorAnalyzer, BehaviorThresholds};
use palisade_threat::countermeasures::CounterMeasureEngine;
use palisade_threat::geo_tracker::{GeoTracker, IpApiResolver};
use palisade_threat::threat_ledger::ThreatLedger;
use palisade_threat::types::{AttackType, Finding, Measure, Severity};
use palisade_web::types::RequestView;
use palisade_web::{HoneypotRegistry, SignatureMatcher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub struct SecurityGate {
    config: PalisadeConfig,
    matcher: Arc<SignatureMatcher>,
    honeypots: HoneypotRegistry,
    ledger: ThreatLedger,
    measures: CounterMeasureEngine,
    behavior: BehaviorAnalyzer,
    evidence: EvidenceRecorder,
    reports: ReportGenerator,
    geo: GeoTracker,
    moderation: ModerationGate,
    store: Arc<dyn BlobStore>,
    total_requests: AtomicU64,
    total_rejected: AtomicU64,
    total_honeypot_served: AtomicU64,
}

impl SecurityGate {
    pub fn new(config: PalisadeConfig, store: Arc<dyn BlobStore>) -> Self {
        let matcher = Arc::new(SignatureMatcher::new());
        let moderation = ModerationGate::new(config.moderation.clone(), matcher.clone());
        Self {
            matcher,
            honeypots: HoneypotRegistry::new(),
            ledger: ThreatLedger::new(
                config.threat.history_capacity,
                config.threat.login_failure_limit,
                config.threat.login_lockout_secs,
            ),
            measures: CounterMeasureEngine::new(config.countermeasures.clone()),
            behavior: BehaviorAnalyzer::new(BehaviorThresholds::default()),
            evidence: EvidenceRecorder::new(store.clone(), config.evidence.index_capacity),
            reports: ReportGenerator::new(store.clone(), 100),
            geo: GeoTracker::new(Duration::from_secs(config.geo.cache_ttl_secs)),
            moderation,
            store,
            config,
            total_requests: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            total_honeypot_served: AtomicU64::new(0),
        }
    }

    /// Swap in a geolocation resolver (lookups stay off the hot path).
    pub fn with_geo_resolver(
        mut self,
        resolver: Box<dyn palisade_threat::geo_tracker::GeoResolver>,
    ) -> Self {
        self.geo = GeoTracker::new(Duration::from_secs(self.config.geo.cache_ttl_secs))
            .with_resolver(resolver);
        self
    }

    /// Attach the bundled ip-api.com resolver with the configured deadline.
    /// Degrades to location-less operation if the client cannot be built.
    pub fn with_ip_api_geo(self) -> Self {
        if !self.config.geo.enabled {
            return self;
        }
        match IpApiResolver::new(Duration::from_secs(self.config.geo.lookup_timeout_secs)) {
            Ok(resolver) => self.with_geo_resolver(Box::new(resolver)),
            Err(e) => {
                warn!(error = %e, "Geo resolver unavailable, continuing without location data");
                self
            }
        }
    }

    // ── Request path ─────────────────────────────────────────────────────

    /// Inspect one inbound request and return the verdict.
    pub fn inspect(&self, req: &RequestView) -> Verdict {
        self.inspect_at(req, chrono::Utc::now().timestamp())
    }

    /// Deterministic-time variant of [`inspect`](Self::inspect).
    pub fn inspect_at(&self, req: &RequestView, now: i64) -> Verdict {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let ip = req.remote_ip.as_str();
        let request_rate = self.ledger.record_request(ip, now);

        // 1. Standing block — rejected before any work happens.
        if self.ledger.is_blocked(ip, now) {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            info!(ip = %ip, "Rejected request from blocked identity");
            return Verdict::rejected();
        }

        // 2. Honeypot short-circuit.
        if self.config.detection.honeypots_enabled {
            if let Some(finding) = self.honeypots.record_hit(req.path(), ip, now) {
                self.process_finding(&finding, req, now);
                self.total_honeypot_served.fetch_add(1, Ordering::Relaxed);
                return Verdict::ServeHoneypot {
                    content: self.honeypots.decoy_content(req.path()),
                };
            }
        }

        // 3. Signature scan, then the full response chain per finding.
        let findings = if self.config.detection.enabled {
            self.matcher.match_request(req, now)
        } else {
            Vec::new()
        };
        for finding in &findings {
            self.process_finding(finding, req, now);
        }

        // 4. Frequency and mix anomalies, even for signature-clean traffic.
        if let Some(profile) = self.ledger.get(ip) {
            let threats = self.behavior.analyze(&self.ledger, &profile, request_rate, now);
            for threat in &threats {
                if threat.severity == Severity::Critical {
                    self.ledger.apply_block(
                        ip,
                        now + self.config.countermeasures.block_duration_secs,
                        now,
                    );
                }
            }
        }

        // 5. Verdict. A finding that just triggered BLOCK rejects the very
        // request that carried it.
        if self.ledger.is_blocked(ip, now) {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            return Verdict::rejected();
        }
        if !findings.is_empty() {
            return Verdict::AllowWithLogging;
        }
        Verdict::Allow
    }

    /// Ledger → counter-measures → evidence, in that order, for one finding.
    fn process_finding(&self, finding: &Finding, req: &RequestView, now: i64) {
        let profile = self.ledger.record(finding, Some(req));
        let applied = self.measures.execute(&self.ledger, &profile, finding, now);
        let blocked = applied.contains(&Measure::Block);
        let fingerprint = profile.fingerprint.as_deref().unwrap_or("");
        let _ = self.evidence.collect(finding, req, blocked, fingerprint);
    }

    // ── Login path ───────────────────────────────────────────────────────

    /// Report a login attempt. A lockout surfaces as a brute-force finding
    /// run through the normal response chain.
    pub fn record_login(&self, ip: &str, success: bool, now: i64) {
        if success {
            self.ledger.record_login_success(ip);
            return;
        }
        let outcome = self.ledger.record_login_failure(ip, now);
        if outcome.locked {
            let finding = Finding::new(
                ip,
                AttackType::BruteForce,
                "login:lockout",
                &format!("{} failed login attempts", outcome.failures),
                now,
            );
            let profile = self.ledger.record(&finding, None);
            self.measures.execute(&self.ledger, &profile, &finding, now);
        }
    }

    pub fn is_login_locked(&self, ip: &str, now: i64) -> bool {
        self.ledger.is_login_locked(ip, now)
    }

    // ── Comment path ─────────────────────────────────────────────────────

    /// Moderate one comment, feeding spam blocks back into the identity's
    /// threat state.
    pub fn handle_comment(
        &self,
        comment: &CommentView,
        commenter: &CommenterView,
        ip: &str,
        now: i64,
    ) -> ModerationOutcome {
        let outcome = self.moderation.moderate(comment, commenter, now);
        if outcome.blocked() && outcome.spam_score >= 70 {
            self.ledger.record_spam_comment(ip, now);
        }
        outcome
    }

    // ── Background sweeps ────────────────────────────────────────────────

    /// Retention, geolocation refresh, and state persistence. Runs on an
    /// independent timer; idempotent.
    pub fn sweep(&self, now: i64) {
        let retention = self.config.threat.retention_days * DAY_SECS;
        let evicted = self.ledger.sweep(retention, now);

        // Fill in locations for recently active identities, off the hot path.
        for profile in self.ledger.profiles().into_iter().take(100) {
            if profile.geo.is_none() {
                if let Some(geo) = self.geo.refresh(&profile.ip) {
                    self.ledger.set_geo(&profile.ip, geo);
                }
            }
        }

        match self.ledger.snapshot() {
            Ok(bytes) => {
                let date = palisade_core::store::utc_date(now);
                let id = format!("ledger-{}.json", now);
                if let Err(e) = self.store.put("state", &date, &id, &bytes) {
                    warn!(error = %e, "Ledger snapshot persistence failed");
                }
            }
            Err(e) => warn!(error = %e, "Ledger snapshot serialization failed"),
        }

        info!(evicted, "Gate sweep complete");
    }

    /// Periodic aggregate report over the current ledger state.
    pub fn report(&self, period: ReportPeriod, now: i64) -> AttackReport {
        self.reports
            .generate(&self.ledger.profiles(), self.evidence.total_collected(), period, now)
    }

    // ── Accessors for the read-only surfaces ─────────────────────────────

    pub fn ledger(&self) -> &ThreatLedger {
        &self.ledger
    }

    pub fn evidence(&self) -> &EvidenceRecorder {
        &self.evidence
    }

    pub fn moderation(&self) -> &ModerationGate {
        &self.moderation
    }

    pub fn honeypots(&self) -> &HoneypotRegistry {
        &self.honeypots
    }

    pub fn matcher(&self) -> &SignatureMatcher {
        &self.matcher
    }

    pub fn measures(&self) -> &CounterMeasureEngine {
        &self.measures
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_rejected(&self) -> u64 {
        self.total_rejected.load(Ordering::Relaxed)
    }

    pub fn total_honeypot_served(&self) -> u64 {
        self.total_honeypot_served.load(Ordering::Relaxed)
    }
}
