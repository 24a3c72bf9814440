use crate::evidence_recorder::{evidence_id, render_report, EvidenceRecorder};
use crate::report_generator::ReportGenerator;
use crate::types::ReportPeriod;
use palisade_core::store::{utc_date, BlobStore, MemBlobStore};
use palisade_threat::threat_ledger::ThreatLedger;
use palisade_web::types::{AttackType, Finding, RequestView};
use std::sync::Arc;

const IP: &str = "203.0.113.80";

fn attack_request() -> RequestView {
    RequestView::new(
        "POST",
        "/comments",
        "<script>alert(1)</script>",
        &[("User-Agent", "sqlmap/1.7"), ("Referer", "http://evil.example")],
        IP,
    )
}

fn xss_finding(ts: i64) -> Finding {
    Finding::new(IP, AttackType::Xss, "xss:script_tag", "<script>alert(1)</script>", ts)
}

#[test]
fn collect_persists_json_and_report_to_day_partition() {
    let store = Arc::new(MemBlobStore::new());
    let recorder = EvidenceRecorder::new(store.clone(), 100);

    let record = recorder.collect(&xss_finding(1_700_000_000), &attack_request(), true, "fp").unwrap();
    let date = utc_date(1_700_000_000);
    let ids = store.list("evidence", &date).unwrap();
    assert!(ids.contains(&format!("{}.json", record.id)));
    assert!(ids.contains(&format!("{}_report.txt", record.id)));
    assert_eq!(recorder.total_collected(), 1);
    assert_eq!(recorder.total_persist_failures(), 0);
}

#[test]
fn records_are_retrievable_by_id() {
    let store = Arc::new(MemBlobStore::new());
    let recorder = EvidenceRecorder::new(store, 100);

    let record = recorder.collect(&xss_finding(1_700_000_000), &attack_request(), true, "fp").unwrap();
    let indexed = recorder.get(&record.id).unwrap();
    assert_eq!(indexed.attacker_ip, IP);
    assert!(indexed.blocked);

    let fetched = recorder.fetch(&record.id, record.collected_at).unwrap();
    assert_eq!(fetched.id, record.id);
    assert_eq!(fetched.attack_type, AttackType::Xss);
}

#[test]
fn evidence_ids_are_unique_per_collection() {
    let a = evidence_id(IP, 1_000);
    let b = evidence_id(IP, 1_000);
    assert_ne!(a, b);
    assert!(a.starts_with("203.0.113.80_1000_"));
}

#[test]
fn index_is_bounded() {
    let store = Arc::new(MemBlobStore::new());
    let recorder = EvidenceRecorder::new(store, 3);
    let mut first_id = None;
    for i in 0..5 {
        let rec = recorder.collect(&xss_finding(1_000 + i), &attack_request(), false, "fp").unwrap();
        if i == 0 {
            first_id = Some(rec.id);
        }
    }
    assert!(recorder.get(&first_id.unwrap()).is_none());
    assert_eq!(recorder.total_collected(), 5);
}

#[test]
fn report_template_carries_forensic_detail() {
    let store = Arc::new(MemBlobStore::new());
    let recorder = EvidenceRecorder::new(store, 10);
    let record = recorder
        .collect(&xss_finding(1_700_000_000), &attack_request(), true, "deadbeef")
        .unwrap();
    let text = render_report(&record);
    assert!(text.contains("ATTACK EVIDENCE REPORT"));
    assert!(text.contains(&record.id));
    assert!(text.contains("xss"));
    assert!(text.contains("deadbeef"));
    assert!(text.contains("BLOCKED_AND_LOGGED"));
    assert!(text.contains("LEGAL NOTICE"));
}

#[test]
fn unblocked_findings_are_still_collected() {
    let store = Arc::new(MemBlobStore::new());
    let recorder = EvidenceRecorder::new(store, 10);
    let scan = Finding::new(IP, AttackType::Scanning, "scan:path:/admin", "/admin", 1_000);
    let record = recorder.collect(&scan, &attack_request(), false, "fp").unwrap();
    assert!(!record.blocked);
    assert_eq!(record.action, "LOGGED");
    assert_eq!(recorder.counts_by_type()["scanning"], 1);
}

#[test]
fn generated_report_aggregates_profiles() {
    let ledger = ThreatLedger::new(100, 5, 1_800);
    for i in 0..4 {
        ledger.record(&xss_finding(1_000 + i), None);
    }
    let other = Finding::new("198.51.100.5", AttackType::HoneypotAccess, "honeypot:/.env", "/.env", 1_005);
    ledger.record(&other, None);
    ledger.apply_block("198.51.100.5", 90_000, 1_005);

    let store = Arc::new(MemBlobStore::new());
    let generator = ReportGenerator::new(store.clone(), 10);
    let report = generator.generate(&ledger.profiles(), 5, ReportPeriod::SixHourly, 1_010);

    assert_eq!(report.summary.total_attackers, 2);
    assert_eq!(report.summary.total_attacks, 5);
    assert_eq!(report.summary.blocked_ips, 1);
    assert_eq!(report.summary.honeypot_hits, 1);
    assert_eq!(report.summary.active_attackers, 2);
    assert_eq!(report.summary.evidence_collected, 5);
    assert_eq!(report.attack_types["xss"], 1);
    assert_eq!(report.top_attackers[0].ip, IP);
    assert!(!report.recommendations.is_empty());

    // Persisted alongside the in-memory feed.
    let ids = store.list("reports", &utc_date(1_010)).unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(generator.reports().len(), 1);
}

#[test]
fn report_feed_is_bounded() {
    let store = Arc::new(MemBlobStore::new());
    let generator = ReportGenerator::new(store, 2);
    for i in 0..4 {
        generator.generate(&[], 0, ReportPeriod::Hourly, 1_000 + i);
    }
    assert_eq!(generator.reports().len(), 2);
    assert_eq!(generator.latest().unwrap().generated_at, 1_003);
}
