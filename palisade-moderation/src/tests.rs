use crate::moderation_gate::{escape_html, ModerationGate};
use crate::spam_analyzer::{SpamAnalyzer, SpamContext};
use crate::types::*;
use palisade_core::config::ModerationConfig;
use palisade_web::SignatureMatcher;
use std::sync::Arc;

fn gate() -> ModerationGate {
    ModerationGate::new(ModerationConfig::default(), Arc::new(SignatureMatcher::new()))
}

fn gate_with(config: ModerationConfig) -> ModerationGate {
    ModerationGate::new(config, Arc::new(SignatureMatcher::new()))
}

fn comment(id: &str, content: &str) -> CommentView {
    CommentView {
        id: id.into(),
        author: "reader".into(),
        email: Some("reader@example.com".into()),
        content: content.into(),
    }
}

fn known_user() -> CommenterView {
    CommenterView { user_id: Some("u-100".into()), is_new: false }
}

fn new_user() -> CommenterView {
    CommenterView { user_id: Some("u-new".into()), is_new: true }
}

// ── Spam analyzer ────────────────────────────────────────────────────────

#[test]
fn spam_score_clamps_at_100_with_embedded_contacts() {
    let analyzer = SpamAnalyzer::new();
    // Three long repeated runs split by an email and a URL: 3*15 + 30 + 25.
    let content = format!(
        "{} spam@bulk.example {} http://bulk.example/win {}",
        "a".repeat(70),
        "a".repeat(70),
        "a".repeat(70),
    );
    let verdict = analyzer.detect(&content, SpamContext { reputation: 50, ..Default::default() });
    assert_eq!(verdict.score, 100);
    assert_eq!(verdict.confidence, SpamConfidence::VeryHigh);
    assert!(verdict.is_spam);
}

#[test]
fn benign_content_scores_low() {
    let analyzer = SpamAnalyzer::new();
    let verdict = analyzer.detect(
        "Great article, thanks for sharing your perspective.",
        SpamContext { reputation: 50, ..Default::default() },
    );
    assert!(!verdict.is_spam);
    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.confidence, SpamConfidence::VeryLow);
}

#[test]
fn reputation_and_newness_penalties_stack() {
    let analyzer = SpamAnalyzer::new();
    let verdict = analyzer.detect(
        "A reasonable looking comment with enough words.",
        SpamContext { reputation: 5, is_new_user: true, rate_limited: true },
    );
    // 25 (rep<20) + 40 (rep<10) + 15 (new) + 30 (rate limited).
    assert_eq!(verdict.score, 100);
}

#[test]
fn sensitive_severity_escalates_with_distinct_matches() {
    let analyzer = SpamAnalyzer::new();
    assert_eq!(analyzer.scan_sensitive("nothing to see").severity, SensitiveSeverity::None);
    assert_eq!(analyzer.scan_sensitive("win the lottery").severity, SensitiveSeverity::Medium);
    assert_eq!(
        analyzer.scan_sensitive("casino lottery night").severity,
        SensitiveSeverity::High
    );
    assert_eq!(
        analyzer.scan_sensitive("viagra casino lottery").severity,
        SensitiveSeverity::Critical
    );
}

#[test]
fn masking_preserves_length_and_case_insensitivity() {
    let analyzer = SpamAnalyzer::new();
    let masked = analyzer.mask_sensitive("Try VIAGRA today");
    assert_eq!(masked, "Try ****** today");
}

// ── Moderation state machine ─────────────────────────────────────────────

#[test]
fn clean_comment_from_known_user_is_approved() {
    let mut config = ModerationConfig::default();
    config.require_approval_for_new_users = false;
    let gate = gate_with(config);
    let outcome = gate.moderate(&comment("c1", "Great article, thanks!"), &known_user(), 1_000);
    assert_eq!(outcome.status, ModerationStatus::Approved);
    assert!(outcome.reasons.is_empty());
    // Approval bumps reputation.
    assert_eq!(gate.reputation().get(Some("u-100")), 52);
}

#[test]
fn new_user_policy_routes_clean_comment_to_review() {
    let gate = gate(); // policy enabled by default
    let outcome = gate.moderate(&comment("c1", "Great article, thanks!"), &new_user(), 1_000);
    assert_eq!(outcome.status, ModerationStatus::PendingReview);
    assert!(outcome.reasons.iter().any(|r| r.contains("new user")));
    assert_eq!(gate.queue_len(), 1);
}

#[test]
fn new_user_policy_disabled_approves_clean_comment() {
    let mut config = ModerationConfig::default();
    config.require_approval_for_new_users = false;
    let gate = gate_with(config);
    let outcome = gate.moderate(&comment("c1", "Great article, thanks!"), &new_user(), 1_000);
    assert_eq!(outcome.status, ModerationStatus::Approved);
}

#[test]
fn empty_author_and_short_content_block_with_itemized_reasons() {
    let gate = gate();
    let bad = CommentView {
        id: "c1".into(),
        author: "  ".into(),
        email: Some("not-an-email".into()),
        content: "x".into(),
    };
    let outcome = gate.moderate(&bad, &known_user(), 1_000);
    assert_eq!(outcome.status, ModerationStatus::Blocked);
    assert_eq!(outcome.reasons.len(), 3);
}

#[test]
fn xss_in_content_fails_structural_validation() {
    let gate = gate();
    let outcome = gate.moderate(
        &comment("c1", "nice post <script>document.cookie</script>"),
        &known_user(),
        1_000,
    );
    assert_eq!(outcome.status, ModerationStatus::Blocked);
    assert!(outcome.reasons.iter().any(|r| r.contains("script")));
}

#[test]
fn spam_with_very_high_confidence_is_blocked_terminally() {
    let gate = gate();
    let content = format!(
        "{} spam@bulk.example {} http://bulk.example/win {}",
        "a".repeat(70),
        "a".repeat(70),
        "a".repeat(70),
    );
    let outcome = gate.moderate(&comment("c1", &content), &known_user(), 1_000);
    assert_eq!(outcome.status, ModerationStatus::Blocked);
    assert_eq!(outcome.spam_score, 100);
    // Rejection costs reputation.
    assert_eq!(gate.reputation().get(Some("u-100")), 45);
}

#[test]
fn critical_sensitive_content_is_blocked_terminally() {
    let gate = gate();
    let outcome = gate.moderate(
        &comment("c1", "viagra casino lottery every day, what a life"),
        &known_user(),
        1_000,
    );
    assert_eq!(outcome.status, ModerationStatus::Blocked);
    assert!(outcome.reasons[0].contains("critical sensitive terms"));
}

#[test]
fn sixth_comment_in_window_is_rejected_too_fast() {
    let mut config = ModerationConfig::default();
    config.require_approval_for_new_users = false;
    let gate = gate_with(config);
    let user = known_user();

    for i in 0..5 {
        let outcome =
            gate.moderate(&comment(&format!("c{}", i), "Great article, thanks!"), &user, 1_000 + i);
        assert_eq!(outcome.status, ModerationStatus::Approved, "comment {} should pass", i);
    }
    let sixth = gate.moderate(&comment("c5", "Great article, thanks!"), &user, 1_005);
    assert_eq!(sixth.status, ModerationStatus::Blocked);
    assert!(sixth.reasons.iter().any(|r| r.contains("TOO_FAST")));

    // Window elapses: the first post-reset comment goes through again.
    let after = gate.moderate(&comment("c6", "Great article, thanks!"), &user, 1_061);
    assert_eq!(after.status, ModerationStatus::Approved);
}

#[test]
fn queue_orders_by_priority_descending() {
    let gate = gate();
    // New user only: priority 10.
    gate.moderate(&comment("low", "Great article, thanks!"), &new_user(), 1_000);
    // Sensitive words + new user: priority 60.
    gate.moderate(
        &comment("high", "win the lottery my friends, it is great"),
        &CommenterView { user_id: Some("u-2".into()), is_new: true },
        1_001,
    );
    let queue = gate.queue(10);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].comment.id, "high");
    assert!(queue[0].priority > queue[1].priority);
}

#[test]
fn resolving_queue_items_moves_reputation_and_empties_queue() {
    let gate = gate();
    gate.moderate(&comment("c1", "Great article, thanks!"), &new_user(), 1_000);
    assert_eq!(gate.queue_len(), 1);

    let item = gate.resolve("c1", ModerationAction::Reject, "mod-7", 2_000).unwrap();
    assert_eq!(item.status, ModerationStatus::Blocked);
    assert_eq!(item.moderated_by.as_deref(), Some("mod-7"));
    assert_eq!(gate.queue_len(), 0);
    assert_eq!(gate.reputation().get(Some("u-new")), 45);

    // Unknown ids resolve to nothing.
    assert!(gate.resolve("missing", ModerationAction::Approve, "mod-7", 2_001).is_none());
}

#[test]
fn low_reputation_routes_to_review() {
    let mut config = ModerationConfig::default();
    config.require_approval_for_new_users = false;
    let gate = gate_with(config);
    let user = known_user();
    // Drive reputation below the review threshold with rejections.
    for i in 0..5 {
        gate.moderate(&comment(&format!("bad{}", i), "<script>x</script>"), &user, 1_000 + i);
    }
    assert_eq!(gate.reputation().get(Some("u-100")), 25);

    let outcome = gate.moderate(&comment("c9", "Honest question about the article"), &user, 2_000);
    assert_eq!(outcome.status, ModerationStatus::PendingReview);
    assert!(outcome.reasons.iter().any(|r| r.contains("low reputation")));
}

#[test]
fn sanitize_escapes_collapses_and_bounds() {
    let gate = gate();
    let cleaned = gate.sanitize("  <b>hello</b>   world  ");
    assert_eq!(cleaned, "&lt;b&gt;hello&lt;&#x2F;b&gt; world");

    let long = "word ".repeat(400);
    let bounded = gate.sanitize(&long);
    assert!(bounded.ends_with("..."));
    assert!(bounded.chars().count() <= 1_003);
}

#[test]
fn escape_html_covers_the_entity_map() {
    assert_eq!(escape_html("&<>\"'/`="), "&amp;&lt;&gt;&quot;&#x27;&#x2F;&#x60;&#x3D;");
}
