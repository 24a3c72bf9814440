//! Evidence Recorder — durable record of every detected finding.
//!
//! Each finding produces one append-only `EvidenceRecord` written to the
//! blob store under `evidence/<YYYY-MM-DD>/`, plus a rendered text report
//! under a sibling key. Storage failures are logged and swallowed: the
//! request verdict must never depend on whether evidence landed on disk.
//!
//! A bounded in-memory index keeps recent records retrievable by id without
//! touching the store.

use crate::types::*;
use palisade_core::store::{utc_date, BlobStore};
use palisade_web::types::{Finding, RequestView};
use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const ID_SUFFIX_LEN: usize = 9;

pub struct EvidenceRecorder {
    store: Arc<dyn BlobStore>,
    index: RwLock<HashMap<String, EvidenceRecord>>,
    index_order: RwLock<VecDeque<String>>,
    index_capacity: usize,
    by_type: RwLock<HashMap<String, u64>>,
    total_collected: AtomicU64,
    total_persist_failures: AtomicU64,
    enabled: bool,
}

impl EvidenceRecorder {
    pub fn new(store: Arc<dyn BlobStore>, index_capacity: usize) -> Self {
        Self {
            store,
            index: RwLock::new(HashMap::new()),
            index_order: RwLock::new(VecDeque::new()),
            index_capacity: index_capacity.max(1),
            by_type: RwLock::new(HashMap::new()),
            total_collected: AtomicU64::new(0),
            total_persist_failures: AtomicU64::new(0),
            enabled: true,
        }
    }

    /// Build, index, and persist the evidence for one finding. Always
    /// returns the record; persistence problems only show up in the
    /// failure counter and the log.
    pub fn collect(
        &self,
        finding: &Finding,
        req: &RequestView,
        blocked: bool,
        fingerprint: &str,
    ) -> Option<EvidenceRecord> {
        if !self.enabled {
            return None;
        }
        let record = self.build_record(finding, req, blocked, fingerprint);
        self.total_collected.fetch_add(1, Ordering::Relaxed);
        *self
            .by_type
            .write()
            .entry(finding.attack_type.as_str().to_string())
            .or_insert(0) += 1;

        self.index_record(&record);
        self.persist(&record);
        Some(record)
    }

    fn build_record(
        &self,
        finding: &Finding,
        req: &RequestView,
        blocked: bool,
        fingerprint: &str,
    ) -> EvidenceRecord {
        EvidenceRecord {
            id: evidence_id(&finding.source_ip, finding.timestamp),
            collected_at: finding.timestamp,
            attacker_ip: finding.source_ip.clone(),
            attack_type: finding.attack_type,
            severity: finding.severity,
            pattern: finding.pattern.clone(),
            payload_excerpt: finding.excerpt.clone(),
            request: RequestSnapshot {
                method: req.method.clone(),
                url: req.url.clone(),
                headers: req.headers.clone(),
                body: req.body.clone(),
            },
            forensics: ForensicHeaders {
                user_agent: req.user_agent().to_string(),
                referer: req.header("referer").to_string(),
                x_forwarded_for: req.header("x-forwarded-for").to_string(),
                x_real_ip: req.header("x-real-ip").to_string(),
                fingerprint: fingerprint.to_string(),
            },
            blocked,
            action: if blocked { "BLOCKED_AND_LOGGED".into() } else { "LOGGED".into() },
        }
    }

    fn index_record(&self, record: &EvidenceRecord) {
        let mut index = self.index.write();
        let mut order = self.index_order.write();
        if order.len() >= self.index_capacity {
            if let Some(oldest) = order.pop_front() {
                index.remove(&oldest);
            }
        }
        order.push_back(record.id.clone());
        index.insert(record.id.clone(), record.clone());
    }

    fn persist(&self, record: &EvidenceRecord) {
        let date = utc_date(record.collected_at);
        let json = match serde_json::to_vec_pretty(record) {
            Ok(json) => json,
            Err(e) => {
                self.total_persist_failures.fetch_add(1, Ordering::Relaxed);
                warn!(id = %record.id, error = %e, "Evidence serialization failed");
                return;
            }
        };
        if let Err(e) = self.store.put("evidence", &date, &format!("{}.json", record.id), &json) {
            self.total_persist_failures.fetch_add(1, Ordering::Relaxed);
            warn!(id = %record.id, error = %e, "Evidence persistence failed");
        }
        let report = render_report(record);
        if let Err(e) = self.store.put(
            "evidence",
            &date,
            &format!("{}_report.txt", record.id),
            report.as_bytes(),
        ) {
            self.total_persist_failures.fetch_add(1, Ordering::Relaxed);
            warn!(id = %record.id, error = %e, "Evidence report persistence failed");
        }
    }

    /// Look a record up in the in-memory index.
    pub fn get(&self, id: &str) -> Option<EvidenceRecord> {
        self.index.read().get(id).cloned()
    }

    /// Fetch a record back out of the durable store.
    pub fn fetch(&self, id: &str, collected_at: i64) -> Option<EvidenceRecord> {
        let date = utc_date(collected_at);
        let bytes = self.store.get("evidence", &date, &format!("{}.json", id)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn total_collected(&self) -> u64 {
        self.total_collected.load(Ordering::Relaxed)
    }

    pub fn total_persist_failures(&self) -> u64 {
        self.total_persist_failures.load(Ordering::Relaxed)
    }

    pub fn counts_by_type(&self) -> HashMap<String, u64> {
        self.by_type.read().clone()
    }

    pub fn set_enabled(&mut self, e: bool) {
        self.enabled = e;
    }
}

/// `<ip>_<timestamp>_<random>` — unique without coordination, and the
/// prefix keeps one attacker's records adjacent in listings.
pub fn evidence_id(ip: &str, timestamp: i64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{}_{}_{}", ip, timestamp, suffix)
}

/// Fixed human-readable template stored next to each JSON record.
pub fn render_report(record: &EvidenceRecord) -> String {
    let when = chrono::DateTime::from_timestamp(record.collected_at, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();
    let headers = record
        .request
        .headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "=== ATTACK EVIDENCE REPORT ===\n\
         Report id: {id}\n\
         Time: {when}\n\
         Attacker IP: {ip}\n\
         Attack type: {attack}\n\
         Severity: {severity:?}\n\
         \n\
         === REQUEST DETAIL ===\n\
         Method: {method}\n\
         URL: {url}\n\
         User agent: {ua}\n\
         Referer: {referer}\n\
         \n\
         === PAYLOAD ===\n\
         {payload}\n\
         \n\
         === HEADERS ===\n\
         {headers}\n\
         \n\
         === DIGITAL FINGERPRINT ===\n\
         {fingerprint}\n\
         \n\
         === RESPONSE ===\n\
         Action: {action}\n\
         Blocked: {blocked}\n\
         \n\
         === LEGAL NOTICE ===\n\
         This report documents an unauthorized access attempt against this\n\
         system. The recorded activity may constitute a criminal offense\n\
         under applicable law. This report is preserved as evidence and may\n\
         be used in legal proceedings.\n",
        id = record.id,
        when = when,
        ip = record.attacker_ip,
        attack = record.attack_type.as_str(),
        severity = record.severity,
        method = record.request.method,
        url = record.request.url,
        ua = if record.forensics.user_agent.is_empty() { "Unknown" } else { &record.forensics.user_agent },
        referer = if record.forensics.referer.is_empty() { "None" } else { &record.forensics.referer },
        payload = record.payload_excerpt,
        headers = headers,
        fingerprint = record.forensics.fingerprint,
        action = record.action,
        blocked = record.blocked,
    )
}
