use crate::honeypot_registry::HoneypotRegistry;
use crate::signature_matcher::SignatureMatcher;
use crate::types::*;

fn request(url: &str, body: &str, ua: &str) -> RequestView {
    RequestView::new("POST", url, body, &[("User-Agent", ua)], "203.0.113.7")
}

#[test]
fn script_tag_in_body_yields_exactly_one_xss_finding() {
    let matcher = SignatureMatcher::new();
    let req = request("/comments", "<script>alert(1)</script>", "Mozilla/5.0");
    let findings = matcher.match_request(&req, 1_000);
    let xss: Vec<_> =
        findings.iter().filter(|f| f.attack_type == AttackType::Xss).collect();
    assert_eq!(xss.len(), 1);
    assert_eq!(xss[0].severity, Severity::High);
    assert_eq!(xss[0].pattern, "xss:script_tag");
}

#[test]
fn clean_request_yields_no_findings() {
    let matcher = SignatureMatcher::new();
    let req = request("/articles/42", "thanks for the writeup", "Mozilla/5.0");
    assert!(matcher.match_request(&req, 1_000).is_empty());
    assert_eq!(matcher.total_inspected(), 1);
    assert_eq!(matcher.total_findings(), 0);
}

#[test]
fn multiple_groups_fire_on_one_request() {
    let matcher = SignatureMatcher::new();
    // Tautology plus a traversal in the URL: two distinct groups.
    let req = request("/files/..%2f..%2fetc/passwd", "x' or 1=1", "Mozilla/5.0");
    let findings = matcher.match_request(&req, 1_000);
    let types: Vec<_> = findings.iter().map(|f| f.attack_type).collect();
    assert!(types.contains(&AttackType::SqlInjection));
    assert!(types.contains(&AttackType::PathTraversal));
}

#[test]
fn one_finding_per_group_even_with_many_pattern_hits() {
    let matcher = SignatureMatcher::new();
    let body = "<script>x</script> javascript:void(0) eval(document.cookie)";
    let req = request("/comments", body, "Mozilla/5.0");
    let findings = matcher.match_request(&req, 1_000);
    assert_eq!(
        findings.iter().filter(|f| f.attack_type == AttackType::Xss).count(),
        1
    );
}

#[test]
fn scanner_user_agent_is_flagged_as_scanning() {
    let matcher = SignatureMatcher::new();
    let req = request("/articles", "", "sqlmap/1.7-dev");
    let findings = matcher.match_request(&req, 1_000);
    assert!(findings
        .iter()
        .any(|f| f.attack_type == AttackType::Scanning && f.pattern == "scan:user_agent"));
}

#[test]
fn suspicious_path_is_flagged_as_scanning() {
    let matcher = SignatureMatcher::new();
    let req = request("/wp-admin/setup.php", "", "Mozilla/5.0");
    let findings = matcher.match_request(&req, 1_000);
    assert!(findings.iter().any(|f| f.attack_type == AttackType::Scanning));
    // Scanning is a low-severity signal.
    assert!(findings.iter().all(|f| f.attack_type != AttackType::Scanning
        || f.severity == Severity::Low));
}

#[test]
fn excerpt_is_bounded_and_starts_at_match() {
    let matcher = SignatureMatcher::new();
    let padding = "x".repeat(500);
    let body = format!("{}<script>alert(1)</script>", padding);
    let req = request("/comments", &body, "Mozilla/5.0");
    let findings = matcher.match_request(&req, 1_000);
    let xss = findings.iter().find(|f| f.attack_type == AttackType::Xss).unwrap();
    assert!(xss.excerpt.len() <= EXCERPT_MAX_LEN);
    assert!(xss.excerpt.starts_with("<script>"));
}

#[test]
fn content_matches_helper_checks_single_groups() {
    let matcher = SignatureMatcher::new();
    assert!(matcher.content_matches(AttackType::Xss, "<iframe src=\"http://evil\">"));
    assert!(matcher.content_matches(AttackType::SqlInjection, "1; drop table users"));
    assert!(!matcher.content_matches(AttackType::Xss, "a perfectly nice comment"));
}

#[test]
fn severity_table_is_fixed() {
    assert_eq!(AttackType::SqlInjection.severity(), Severity::Critical);
    assert_eq!(AttackType::CommandInjection.severity(), Severity::Critical);
    assert_eq!(AttackType::HoneypotAccess.severity(), Severity::Critical);
    assert_eq!(AttackType::Xss.severity(), Severity::High);
    assert_eq!(AttackType::PathTraversal.severity(), Severity::High);
    assert_eq!(AttackType::BruteForce.severity(), Severity::Medium);
    assert_eq!(AttackType::Scanning.severity(), Severity::Low);
}

#[test]
fn honeypot_hit_yields_max_confidence_finding() {
    let registry = HoneypotRegistry::new();
    assert!(registry.is_decoy("/.env"));
    let finding = registry.record_hit("/.env", "198.51.100.9", 2_000).unwrap();
    assert_eq!(finding.attack_type, AttackType::HoneypotAccess);
    assert_eq!(finding.severity, Severity::Critical);
    assert_eq!(registry.total_hits(), 1);
}

#[test]
fn honeypot_tracks_hits_and_visitors() {
    let registry = HoneypotRegistry::new();
    registry.record_hit("/backup.sql", "198.51.100.9", 1_000);
    registry.record_hit("/backup.sql", "198.51.100.10", 1_001);
    registry.record_hit("/backup.sql", "198.51.100.9", 1_002);
    let decoy = registry
        .decoys()
        .into_iter()
        .find(|d| d.path == "/backup.sql")
        .unwrap();
    assert_eq!(decoy.hits, 3);
    assert_eq!(decoy.visitors.len(), 2);
    assert_eq!(decoy.last_hit, Some(1_002));
}

#[test]
fn non_decoy_path_records_nothing() {
    let registry = HoneypotRegistry::new();
    assert!(!registry.is_decoy("/articles"));
    assert!(registry.record_hit("/articles", "198.51.100.9", 1_000).is_none());
}

#[test]
fn decoy_content_is_believable() {
    let registry = HoneypotRegistry::new();
    assert!(registry.decoy_content("/.env").contains("DB_PASSWORD"));
    assert!(registry.decoy_content("/admin/login.php").contains("<form"));
    assert!(registry.decoy_content("/unknown").contains("Access Denied"));
}
