//! Signature Matcher — classifies requests against known attack signatures.
//!
//! Each attack type is a declarative group: a list of compiled regexes and
//! the request surfaces they apply to, checked in priority order URL → body
//! → header. The first pattern that fires within a group emits one finding
//! and stops scanning that group, so a request yields at most one finding
//! per attack type while distinct groups may all fire.
//!
//! The scanning group is table-driven differently: a suspicious-path list
//! plus scanner-tool User-Agent fingerprints.

use crate::types::*;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const MAX_ALERTS: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTarget {
    Url,
    Body,
    UserAgent,
}

/// One named pattern inside a group.
struct SignaturePattern {
    label: &'static str,
    regex: Regex,
}

/// A group of signatures sharing one attack type.
pub struct SignatureGroup {
    attack_type: AttackType,
    patterns: Vec<SignaturePattern>,
    targets: Vec<MatchTarget>,
    hit_count: AtomicU64,
}

impl SignatureGroup {
    fn new(
        attack_type: AttackType,
        targets: Vec<MatchTarget>,
        defs: &[(&'static str, &str)],
    ) -> Self {
        let patterns = defs
            .iter()
            .filter_map(|&(label, pattern)| {
                Regex::new(pattern).ok().map(|regex| SignaturePattern { label, regex })
            })
            .collect();
        Self { attack_type, patterns, targets, hit_count: AtomicU64::new(0) }
    }

    pub fn attack_type(&self) -> AttackType {
        self.attack_type
    }

    pub fn hits(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }
}

/// Paths that only probes and scanners request.
const SUSPICIOUS_PATHS: &[&str] = &[
    "/admin",
    "/wp-admin",
    "/phpmyadmin",
    "/.env",
    "/config",
    "/backup",
    "/test",
    "/debug",
];

/// Known attack-tool User-Agent fingerprints.
const SCANNER_UA_PATTERNS: &[&str] = &[
    r"(?i)hydra",
    r"(?i)nmap",
    r"(?i)sqlmap",
    r"(?i)nikto",
    r"(?i)burp",
    r"(?i)\bzap\b",
];

pub struct SignatureMatcher {
    groups: Vec<SignatureGroup>,
    scanner_ua: Vec<Regex>,
    alerts: RwLock<Vec<DetectionAlert>>,
    total_inspected: AtomicU64,
    total_findings: AtomicU64,
    enabled: bool,
}

impl Default for SignatureMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureMatcher {
    pub fn new() -> Self {
        let url_body = vec![MatchTarget::Url, MatchTarget::Body];
        let groups = vec![
            SignatureGroup::new(
                AttackType::Xss,
                url_body.clone(),
                &[
                    ("xss:script_tag", r"(?i)<\s*script[^>]*>"),
                    ("xss:javascript_uri", r"(?i)javascript\s*:"),
                    ("xss:event_handler", r"(?i)\bon\w+\s*="),
                    ("xss:iframe_src", r"(?i)<\s*iframe[^>]*src\s*="),
                    ("xss:eval_call", r"(?i)\beval\s*\("),
                    ("xss:cookie_access", r"(?i)document\s*\.\s*cookie"),
                ],
            ),
            SignatureGroup::new(
                AttackType::SqlInjection,
                url_body.clone(),
                &[
                    (
                        "sqli:keyword",
                        r"(?i)\b(union|select|insert|update|delete|drop|create|alter)\s+",
                    ),
                    ("sqli:tautology", r"(?i)(\s|^)(or|and)\s+\d+\s*=\s*\d+"),
                    ("sqli:quoted_clause", r#"(?i)['";]\s*(or|and)\s+['"]?\w+['"]?\s*="#),
                    ("sqli:exec", r"(?i)\b(exec|execute|sp_)\w*"),
                    ("sqli:comment_tail", r"--\s*$"),
                    ("sqli:block_comment", r"(?s)/\*.*?\*/"),
                ],
            ),
            SignatureGroup::new(
                AttackType::PathTraversal,
                vec![MatchTarget::Url],
                &[
                    ("trav:dotdot", r"\.\.[/\\]"),
                    ("trav:encoded_slash", r"(?i)\.\.%2f"),
                    ("trav:encoded_backslash", r"(?i)\.\.%5c"),
                    ("trav:double_encoded", r"(?i)%2e%2e%2f"),
                    ("trav:double_encoded_bs", r"(?i)%2e%2e%5c"),
                ],
            ),
            SignatureGroup::new(
                AttackType::CommandInjection,
                url_body,
                &[
                    ("cmd:metachar", r"[;&|`$(){}\[\]]"),
                    (
                        "cmd:recon_binary",
                        r"(?i)\b(cat|ls|pwd|whoami|id|uname|wget|curl|nc|netcat)\b",
                    ),
                    ("cmd:file_destruction", r"(?i)\b(rm|mv|cp|chmod|chown)\s+"),
                    ("cmd:piped_shell", r"(?i)\|\s*(nc|netcat|bash|sh|cmd)"),
                ],
            ),
        ];

        let scanner_ua =
            SCANNER_UA_PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect();

        Self {
            groups,
            scanner_ua,
            alerts: RwLock::new(Vec::new()),
            total_inspected: AtomicU64::new(0),
            total_findings: AtomicU64::new(0),
            enabled: true,
        }
    }

    /// Inspect a request against every signature group. Empty result means
    /// nothing matched — that is the normal case, not an error.
    pub fn match_request(&self, req: &RequestView, now: i64) -> Vec<Finding> {
        if !self.enabled {
            return Vec::new();
        }
        self.total_inspected.fetch_add(1, Ordering::Relaxed);

        let mut findings = Vec::new();

        for group in &self.groups {
            if let Some(finding) = self.match_group(group, req, now) {
                findings.push(finding);
            }
        }

        if let Some(finding) = self.match_scanning(req, now) {
            findings.push(finding);
        }

        if !findings.is_empty() {
            self.total_findings.fetch_add(findings.len() as u64, Ordering::Relaxed);
            for f in &findings {
                warn!(
                    ip = %f.source_ip,
                    attack = f.attack_type.as_str(),
                    pattern = %f.pattern,
                    "Signature match"
                );
                self.add_alert(now, f.severity, "Signature match", &format!(
                    "{} from {} via {}",
                    f.attack_type.as_str(),
                    f.source_ip,
                    f.pattern
                ));
            }
        }

        findings
    }

    fn match_group(&self, group: &SignatureGroup, req: &RequestView, now: i64) -> Option<Finding> {
        for target in &group.targets {
            let text = match target {
                MatchTarget::Url => req.url.as_str(),
                MatchTarget::Body => req.body.as_str(),
                MatchTarget::UserAgent => req.user_agent(),
            };
            if text.is_empty() {
                continue;
            }
            for pattern in &group.patterns {
                if let Some(m) = pattern.regex.find(text) {
                    group.hit_count.fetch_add(1, Ordering::Relaxed);
                    return Some(Finding::new(
                        req.remote_ip.clone(),
                        group.attack_type,
                        pattern.label,
                        excerpt_around(text, m.start()),
                        now,
                    ));
                }
            }
        }
        None
    }

    fn match_scanning(&self, req: &RequestView, now: i64) -> Option<Finding> {
        let path = req.path();
        if let Some(hit) = SUSPICIOUS_PATHS.iter().find(|p| path.starts_with(*p)) {
            return Some(Finding::new(
                req.remote_ip.clone(),
                AttackType::Scanning,
                format!("scan:path:{}", hit),
                path,
                now,
            ));
        }
        let ua = req.user_agent();
        if !ua.is_empty() {
            for re in &self.scanner_ua {
                if re.is_match(ua) {
                    return Some(Finding::new(
                        req.remote_ip.clone(),
                        AttackType::Scanning,
                        "scan:user_agent",
                        ua,
                        now,
                    ));
                }
            }
        }
        None
    }

    /// Whether a free-standing piece of content matches any pattern of the
    /// given attack type. Used by the comment gate for structural checks.
    pub fn content_matches(&self, attack_type: AttackType, content: &str) -> bool {
        self.groups
            .iter()
            .find(|g| g.attack_type == attack_type)
            .map(|g| g.patterns.iter().any(|p| p.regex.is_match(content)))
            .unwrap_or(false)
    }

    pub fn group_hits(&self) -> Vec<(AttackType, u64)> {
        self.groups.iter().map(|g| (g.attack_type, g.hits())).collect()
    }

    fn add_alert(&self, ts: i64, sev: Severity, title: &str, details: &str) {
        let mut a = self.alerts.write();
        if a.len() >= MAX_ALERTS {
            a.remove(0);
        }
        a.push(DetectionAlert {
            timestamp: ts,
            severity: sev,
            component: "signature_matcher".into(),
            title: title.into(),
            details: details.into(),
        });
    }

    pub fn total_inspected(&self) -> u64 {
        self.total_inspected.load(Ordering::Relaxed)
    }

    pub fn total_findings(&self) -> u64 {
        self.total_findings.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> Vec<DetectionAlert> {
        self.alerts.read().clone()
    }

    pub fn set_enabled(&mut self, e: bool) {
        self.enabled = e;
    }
}

/// Excerpt starting at the match, so the offending payload is front and
/// center rather than buried at the end of a long body.
fn excerpt_around(text: &str, start: usize) -> &str {
    let mut from = start;
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    &text[from..]
}
