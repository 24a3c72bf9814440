//! End-to-end pipeline scenarios across the workspace crates:
//! request inspection → ledger → counter-measures → evidence, the comment
//! moderation path, honeypots, login protection, sweeps, and reporting.

use palisade_core::config::PalisadeConfig;
use palisade_core::store::{utc_date, BlobStore, MemBlobStore};
use palisade_forensics::types::{EvidenceRecord, ReportPeriod};
use palisade_gate::{SecurityGate, Verdict};
use palisade_moderation::types::{CommentView, CommenterView, ModerationStatus};
use palisade_threat::types::AttackType;
use palisade_web::types::RequestView;
use std::sync::Arc;

const ATTACKER: &str = "203.0.113.200";
const READER: &str = "198.51.100.10";

fn gate_with_store() -> (SecurityGate, Arc<MemBlobStore>) {
    let store = Arc::new(MemBlobStore::new());
    (SecurityGate::new(PalisadeConfig::default(), store.clone()), store)
}

fn request(ip: &str, url: &str, body: &str) -> RequestView {
    RequestView::new("POST", url, body, &[("User-Agent", "Mozilla/5.0")], ip)
}

fn comment(id: &str, content: &str) -> CommentView {
    CommentView {
        id: id.into(),
        author: "reader".into(),
        email: Some("reader@example.com".into()),
        content: content.into(),
    }
}

// ── Request path ─────────────────────────────────────────────────────────

#[test]
fn clean_traffic_flows_through_untouched() {
    let (gate, _store) = gate_with_store();
    let verdict = gate.inspect_at(&request(READER, "/articles/1", ""), 1_000);
    assert_eq!(verdict, Verdict::Allow);
    assert_eq!(gate.total_requests(), 1);
    assert_eq!(gate.evidence().total_collected(), 0);
}

#[test]
fn first_xss_is_logged_third_gets_the_ip_blocked() {
    let (gate, _store) = gate_with_store();
    let attack = request(ATTACKER, "/comments", "<script>alert</script>");

    assert_eq!(gate.inspect_at(&attack, 1_000), Verdict::AllowWithLogging);
    assert_eq!(gate.inspect_at(&attack, 1_010), Verdict::AllowWithLogging);

    // Third finding crosses the attack-count threshold; the carrying
    // request itself is rejected.
    let third = gate.inspect_at(&attack, 1_020);
    assert_eq!(third, Verdict::rejected());

    // And the block outlives the triggering request.
    let followup = gate.inspect_at(&request(ATTACKER, "/articles/1", ""), 1_030);
    assert_eq!(followup, Verdict::rejected());

    let profile = gate.ledger().get(ATTACKER).unwrap();
    assert_eq!(profile.total_attack_count(), 3);
    assert!(profile.blocked);
}

#[test]
fn block_expires_after_24_hours() {
    let (gate, _store) = gate_with_store();
    let attack = request(ATTACKER, "/comments", "<script>alert</script>");
    for i in 0..3 {
        gate.inspect_at(&attack, 1_000 + i);
    }
    assert_eq!(gate.inspect_at(&request(ATTACKER, "/articles/1", ""), 2_000), Verdict::rejected());
    let after_expiry = 1_002 + 86_400 + 1;
    assert_eq!(
        gate.inspect_at(&request(ATTACKER, "/articles/1", ""), after_expiry),
        Verdict::Allow
    );
}

#[test]
fn honeypot_path_serves_decoy_and_blocks_the_visitor() {
    let (gate, store) = gate_with_store();
    let verdict = gate.inspect_at(&request(ATTACKER, "/.env", ""), 1_000);
    match &verdict {
        Verdict::ServeHoneypot { content } => assert!(content.contains("DB_PASSWORD")),
        other => panic!("expected honeypot verdict, got {:?}", other),
    }
    assert_eq!(gate.total_honeypot_served(), 1);

    // The hit is a finding like any other: profiled, countered, evidenced.
    let profile = gate.ledger().get(ATTACKER).unwrap();
    assert_eq!(profile.honeypot_hits, 1);
    assert!(profile.blocked);

    // Exactly one evidence record for the block-decided finding,
    // retrievable by its generated id.
    let ids = store.list("evidence", &utc_date(1_000)).unwrap();
    let json_ids: Vec<_> = ids.iter().filter(|i| i.ends_with(".json")).collect();
    assert_eq!(json_ids.len(), 1);
    let bytes = store.get("evidence", &utc_date(1_000), json_ids[0]).unwrap();
    let record: EvidenceRecord = serde_json::from_slice(&bytes).unwrap();
    assert!(record.blocked);
    assert_eq!(record.attack_type, AttackType::HoneypotAccess);
    assert_eq!(gate.evidence().get(&record.id).unwrap().id, record.id);

    // Follow-up requests from the same IP are rejected outright.
    assert_eq!(gate.inspect_at(&request(ATTACKER, "/articles/1", ""), 1_010), Verdict::rejected());
}

#[test]
fn mixing_attack_vectors_triggers_the_behavior_block() {
    let (gate, _store) = gate_with_store();
    let xss = gate.inspect_at(&request(ATTACKER, "/comments", "<script>x</script>"), 1_000);
    assert_eq!(xss, Verdict::AllowWithLogging);

    // Second vector within the hour: multi-vector behavior threat is
    // CRITICAL and blocks even though the attack count is only two.
    let sqli =
        gate.inspect_at(&request(ATTACKER, "/search", "1 union select password from users"), 1_100);
    assert_eq!(sqli, Verdict::rejected());
    assert!(gate.ledger().get(ATTACKER).unwrap().blocked);
}

#[test]
fn every_finding_is_evidenced_even_low_severity_scans() {
    let (gate, store) = gate_with_store();
    gate.inspect_at(&request(ATTACKER, "/wp-admin/setup.php", ""), 1_000);
    let ids = store.list("evidence", &utc_date(1_000)).unwrap();
    assert!(ids.iter().any(|i| i.ends_with(".json")));
    assert_eq!(gate.evidence().counts_by_type()["scanning"], 1);
}

// ── Login path ───────────────────────────────────────────────────────────

#[test]
fn login_lockout_produces_a_brute_force_finding() {
    let (gate, _store) = gate_with_store();
    for i in 0..5 {
        gate.record_login(ATTACKER, false, 1_000 + i);
    }
    assert!(gate.is_login_locked(ATTACKER, 1_010));

    let profile = gate.ledger().get(ATTACKER).unwrap();
    assert_eq!(profile.attack_counts[&AttackType::BruteForce], 1);

    // Success after the lockout window clears the slate.
    gate.record_login(ATTACKER, true, 1_000 + 1_800 + 1);
    assert!(!gate.is_login_locked(ATTACKER, 1_000 + 1_800 + 2));
}

// ── Comment path ─────────────────────────────────────────────────────────

#[test]
fn spam_comment_blocks_and_feeds_the_threat_ledger() {
    let (gate, _store) = gate_with_store();
    let content = format!(
        "{} spam@bulk.example {} http://bulk.example/win {}",
        "a".repeat(70),
        "a".repeat(70),
        "a".repeat(70),
    );
    let commenter = CommenterView { user_id: Some("u-1".into()), is_new: false };
    let outcome = gate.handle_comment(&comment("c1", &content), &commenter, READER, 1_000);
    assert_eq!(outcome.status, ModerationStatus::Blocked);
    assert_eq!(outcome.spam_score, 100);
    assert_eq!(gate.ledger().spam_comments_last_hour(READER, 1_001), 1);
}

#[test]
fn clean_comment_approval_depends_on_new_user_policy() {
    // Policy on (default): new users land in the review queue.
    let (gate, _store) = gate_with_store();
    let commenter = CommenterView { user_id: Some("u-2".into()), is_new: true };
    let outcome =
        gate.handle_comment(&comment("c1", "Great article, thanks!"), &commenter, READER, 1_000);
    assert_eq!(outcome.status, ModerationStatus::PendingReview);
    assert_eq!(gate.moderation().queue_len(), 1);

    // Policy off: the same comment is approved outright.
    let mut config = PalisadeConfig::default();
    config.moderation.require_approval_for_new_users = false;
    let gate2 = SecurityGate::new(config, Arc::new(MemBlobStore::new()));
    let outcome2 =
        gate2.handle_comment(&comment("c1", "Great article, thanks!"), &commenter, READER, 1_000);
    assert_eq!(outcome2.status, ModerationStatus::Approved);
}

#[test]
fn comment_rate_window_resets_after_sixty_seconds() {
    let mut config = PalisadeConfig::default();
    config.moderation.require_approval_for_new_users = false;
    let gate = SecurityGate::new(config, Arc::new(MemBlobStore::new()));
    let commenter = CommenterView { user_id: Some("u-3".into()), is_new: false };

    for i in 0..5 {
        let outcome = gate.handle_comment(
            &comment(&format!("c{}", i), "Great article, thanks!"),
            &commenter,
            READER,
            1_000 + i,
        );
        assert_eq!(outcome.status, ModerationStatus::Approved);
    }
    let sixth = gate.handle_comment(
        &comment("c5", "Great article, thanks!"),
        &commenter,
        READER,
        1_005,
    );
    assert_eq!(sixth.status, ModerationStatus::Blocked);
    assert!(sixth.reasons.iter().any(|r| r.contains("TOO_FAST")));

    let reset = gate.handle_comment(
        &comment("c6", "Great article, thanks!"),
        &commenter,
        READER,
        1_061,
    );
    assert_eq!(reset.status, ModerationStatus::Approved);
}

// ── Sweeps and reporting ─────────────────────────────────────────────────

#[test]
fn sweep_persists_ledger_state_and_evicts_idle_profiles() {
    let (gate, store) = gate_with_store();
    gate.inspect_at(&request(ATTACKER, "/comments", "<script>x</script>"), 1_000);

    let now = 1_000 + 31 * 86_400;
    gate.sweep(now);
    assert!(gate.ledger().get(ATTACKER).is_none());
    let snapshots = store.list("state", &utc_date(now)).unwrap();
    assert_eq!(snapshots.len(), 1);
}

#[test]
fn report_projects_ledger_and_evidence_counts() {
    let (gate, store) = gate_with_store();
    gate.inspect_at(&request(ATTACKER, "/comments", "<script>x</script>"), 1_000);
    gate.inspect_at(&request("203.0.113.201", "/.env", ""), 1_010);

    let report = gate.report(ReportPeriod::SixHourly, 1_020);
    assert_eq!(report.summary.total_attackers, 2);
    assert_eq!(report.summary.total_attacks, 2);
    assert_eq!(report.summary.honeypot_hits, 1);
    assert_eq!(report.summary.blocked_ips, 1);
    assert_eq!(report.summary.evidence_collected, 2);
    assert_eq!(report.summary.active_attackers, 2);
    assert!(!report.top_attackers.is_empty());

    let persisted = store.list("reports", &utc_date(1_020)).unwrap();
    assert_eq!(persisted.len(), 2);
}

#[test]
fn disabled_detection_still_enforces_existing_blocks() {
    let mut config = PalisadeConfig::default();
    config.detection.enabled = false;
    config.detection.honeypots_enabled = false;
    let gate = SecurityGate::new(config, Arc::new(MemBlobStore::new()));

    // Nothing is detected with the matcher off...
    let verdict = gate.inspect_at(&request(ATTACKER, "/comments", "<script>x</script>"), 1_000);
    assert_eq!(verdict, Verdict::Allow);

    // ...but an operator-applied block is still enforced.
    gate.ledger().apply_block(ATTACKER, 90_000, 1_000);
    assert_eq!(gate.inspect_at(&request(ATTACKER, "/articles/1", ""), 1_010), Verdict::rejected());
}
