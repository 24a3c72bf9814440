//! Spam Analyzer — weighted content scoring and the sensitive-word lexicon.
//!
//! The score is a clamped sum of independent signals; each contributing
//! signal also produces a human-readable reason so moderators see why a
//! comment scored the way it did. Repeated-character runs are detected by a
//! linear scan rather than a backreference pattern.

use crate::types::*;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Context about the commenter fed into the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpamContext {
    pub reputation: i32,
    pub is_new_user: bool,
    pub rate_limited: bool,
}

/// Starter lexicon; deployments extend it via `add_sensitive_words`.
const DEFAULT_LEXICON: &[&str] = &[
    "viagra",
    "casino",
    "lottery",
    "jackpot",
    "free money",
    "click here",
    "buy now",
    "limited offer",
    "cheap loans",
    "crypto giveaway",
    "pyramid scheme",
    "get rich quick",
    "work from home",
    "miracle cure",
];

pub struct SpamAnalyzer {
    lexicon: RwLock<BTreeSet<String>>,
    url_re: Regex,
    email_re: Regex,
    phone_re: Regex,
    special_re: Regex,
    total_scanned: AtomicU64,
    total_spam: AtomicU64,
}

impl Default for SpamAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpamAnalyzer {
    pub fn new() -> Self {
        Self {
            lexicon: RwLock::new(DEFAULT_LEXICON.iter().map(|w| w.to_string()).collect()),
            url_re: Regex::new(r"https?://[^\s]+").expect("static regex"),
            email_re: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("static regex"),
            phone_re: Regex::new(r"\d{11}").expect("static regex"),
            special_re: Regex::new(r"[!@#$%^&*()_+=\[\]{}|;:,.<>?]").expect("static regex"),
            total_scanned: AtomicU64::new(0),
            total_spam: AtomicU64::new(0),
        }
    }

    // ── Sensitive words ──────────────────────────────────────────────────

    pub fn add_sensitive_words<I: IntoIterator<Item = String>>(&self, words: I) {
        let mut lexicon = self.lexicon.write();
        for w in words {
            lexicon.insert(w.to_lowercase());
        }
    }

    /// Scan for lexicon hits. Severity escalates with distinct matches:
    /// one is medium, two high, three or more critical.
    pub fn scan_sensitive(&self, content: &str) -> SensitiveScan {
        let lower = content.to_lowercase();
        let words: Vec<String> = self
            .lexicon
            .read()
            .iter()
            .filter(|w| lower.contains(w.as_str()))
            .cloned()
            .collect();
        let severity = match words.len() {
            0 => SensitiveSeverity::None,
            1 => SensitiveSeverity::Medium,
            2 => SensitiveSeverity::High,
            _ => SensitiveSeverity::Critical,
        };
        SensitiveScan { words, severity }
    }

    /// Replace each lexicon hit with an equal-length run of `*`.
    pub fn mask_sensitive(&self, content: &str) -> String {
        let mut chars: Vec<char> = content.chars().collect();
        for word in self.lexicon.read().iter() {
            let w: Vec<char> = word.chars().collect();
            let n = w.len();
            if n == 0 || chars.len() < n {
                continue;
            }
            let mut i = 0;
            while i + n <= chars.len() {
                let hit = chars[i..i + n]
                    .iter()
                    .zip(&w)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b));
                if hit {
                    for c in &mut chars[i..i + n] {
                        *c = '*';
                    }
                    i += n;
                } else {
                    i += 1;
                }
            }
        }
        chars.into_iter().collect()
    }

    // ── Spam scoring ─────────────────────────────────────────────────────

    /// Score a comment 0–100 against the weighted signal table.
    pub fn detect(&self, content: &str, ctx: SpamContext) -> SpamVerdict {
        self.total_scanned.fetch_add(1, Ordering::Relaxed);
        let mut score: u32 = 0;
        let mut reasons = Vec::new();

        if content.len() < 5 {
            score += 20;
            reasons.push("content too short".to_string());
        }
        if content.len() > 500 {
            score += 10;
            reasons.push("content unusually long".to_string());
        }

        let runs = repeated_runs(content);
        if runs > 0 {
            score += runs as u32 * 15;
            reasons.push(format!("{} repeated-character runs", runs));
        }

        let urls = self.url_re.find_iter(content).count();
        if urls > 0 {
            score += urls as u32 * 25;
            reasons.push(format!("{} links", urls));
        }

        let emails = self.email_re.find_iter(content).count();
        if emails > 0 {
            score += emails as u32 * 30;
            reasons.push(format!("{} email addresses", emails));
        }

        let phones = self.phone_re.find_iter(content).count();
        if phones > 0 {
            score += phones as u32 * 35;
            reasons.push(format!("{} phone numbers", phones));
        }

        if content.len() > 10
            && content == content.to_uppercase()
            && content.chars().any(|c| c.is_alphabetic())
        {
            score += 15;
            reasons.push("all uppercase".to_string());
        }

        let specials = self.special_re.find_iter(content).count();
        if !content.is_empty() && specials as f64 > content.chars().count() as f64 * 0.3 {
            score += 20;
            reasons.push("high special-character density".to_string());
        }

        if ctx.reputation < 20 {
            score += 25;
            reasons.push(format!("low reputation ({})", ctx.reputation));
        }
        if ctx.reputation < 10 {
            score += 40;
            reasons.push("very low reputation".to_string());
        }
        if ctx.is_new_user {
            score += 15;
            reasons.push("new user".to_string());
        }
        if ctx.rate_limited {
            score += 30;
            reasons.push("commenting too fast".to_string());
        }

        let score = score.min(100) as u8;
        let is_spam = score >= 70;
        if is_spam {
            self.total_spam.fetch_add(1, Ordering::Relaxed);
        }

        SpamVerdict { is_spam, score, confidence: confidence_for(score), reasons }
    }

    pub fn total_scanned(&self) -> u64 {
        self.total_scanned.load(Ordering::Relaxed)
    }

    pub fn total_spam(&self) -> u64 {
        self.total_spam.load(Ordering::Relaxed)
    }
}

fn confidence_for(score: u8) -> SpamConfidence {
    if score >= 90 {
        SpamConfidence::VeryHigh
    } else if score >= 70 {
        SpamConfidence::High
    } else if score >= 50 {
        SpamConfidence::Medium
    } else if score >= 30 {
        SpamConfidence::Low
    } else {
        SpamConfidence::VeryLow
    }
}

/// Count maximal runs of four or more identical characters.
fn repeated_runs(content: &str) -> usize {
    let mut runs = 0;
    let mut prev: Option<char> = None;
    let mut run_len = 0;
    for c in content.chars() {
        if Some(c) == prev {
            run_len += 1;
        } else {
            if run_len >= 4 {
                runs += 1;
            }
            prev = Some(c);
            run_len = 1;
        }
    }
    if run_len >= 4 {
        runs += 1;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_run_counting() {
        assert_eq!(repeated_runs("aaaa"), 1);
        assert_eq!(repeated_runs("aaa"), 0);
        assert_eq!(repeated_runs("aaaabbbbccc"), 2);
        assert_eq!(repeated_runs("aaaa x bbbb"), 2);
        assert_eq!(repeated_runs(""), 0);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(confidence_for(95), SpamConfidence::VeryHigh);
        assert_eq!(confidence_for(70), SpamConfidence::High);
        assert_eq!(confidence_for(50), SpamConfidence::Medium);
        assert_eq!(confidence_for(30), SpamConfidence::Low);
        assert_eq!(confidence_for(10), SpamConfidence::VeryLow);
    }
}
