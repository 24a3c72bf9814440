//! Moderation Gate — the comment state machine and review queue.
//!
//! Each comment runs NEW → {BLOCKED | APPROVED | PENDING_REVIEW} through a
//! fixed sequence of checks: structural validation, sensitive words, spam
//! score, rate limit, new-user policy, reputation. Blocking checks are
//! terminal; flagging checks accumulate and land the comment in the
//! priority-ordered review queue.
//!
//! Every terminal outcome feeds the commenter's reputation: +2 on approve,
//! -5 on reject, recorded with the reason.

use crate::reputation::ReputationTracker;
use crate::spam_analyzer::{SpamAnalyzer, SpamContext};
use crate::types::*;
use palisade_core::config::ModerationConfig;
use palisade_core::window::RateWindow;
use palisade_web::types::AttackType;
use palisade_web::SignatureMatcher;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

const APPROVE_DELTA: i32 = 2;
const REJECT_DELTA: i32 = -5;

pub struct ModerationGate {
    config: ModerationConfig,
    analyzer: SpamAnalyzer,
    reputation: ReputationTracker,
    matcher: Arc<SignatureMatcher>,
    rates: RwLock<HashMap<String, RateWindow>>,
    queue: RwLock<Vec<ModerationItem>>,
    email_re: Regex,
    total_moderated: AtomicU64,
    total_blocked: AtomicU64,
    total_approved: AtomicU64,
    total_queued: AtomicU64,
}

impl ModerationGate {
    pub fn new(config: ModerationConfig, matcher: Arc<SignatureMatcher>) -> Self {
        Self {
            config,
            analyzer: SpamAnalyzer::new(),
            reputation: ReputationTracker::new(),
            matcher,
            rates: RwLock::new(HashMap::new()),
            queue: RwLock::new(Vec::new()),
            email_re: Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
                .expect("static regex"),
            total_moderated: AtomicU64::new(0),
            total_blocked: AtomicU64::new(0),
            total_approved: AtomicU64::new(0),
            total_queued: AtomicU64::new(0),
        }
    }

    // ── State machine ────────────────────────────────────────────────────

    pub fn moderate(
        &self,
        comment: &CommentView,
        commenter: &CommenterView,
        now: i64,
    ) -> ModerationOutcome {
        self.total_moderated.fetch_add(1, Ordering::Relaxed);
        let user_id = commenter.user_id.as_deref();

        // 1. Structural validation — terminal on any failure.
        let errors = self.validate(comment);
        if !errors.is_empty() {
            return self.block(comment, user_id, errors, "validation failed", now);
        }

        let mut reasons: Vec<String> = Vec::new();
        let mut triggers: Vec<TriggerKind> = Vec::new();

        // 2. Sensitive words — critical is terminal, lesser flags review.
        let sensitive = self.analyzer.scan_sensitive(&comment.content);
        match sensitive.severity {
            SensitiveSeverity::Critical => {
                return self.block(
                    comment,
                    user_id,
                    vec![format!("critical sensitive terms: {}", sensitive.words.join(", "))],
                    "sensitive content",
                    now,
                );
            }
            SensitiveSeverity::None => {}
            _ => {
                reasons.push(format!("sensitive terms: {}", sensitive.words.join(", ")));
                triggers.push(TriggerKind::SensitiveWords);
            }
        }

        // 3. Spam score — very-high confidence is terminal.
        let rate_limited = self.is_rate_limited(user_id, now);
        let ctx = SpamContext {
            reputation: self.reputation.get(user_id),
            is_new_user: commenter.is_new,
            rate_limited,
        };
        let spam = self.analyzer.detect(&comment.content, ctx);
        if spam.is_spam {
            let detail = format!("spam score {}: {}", spam.score, spam.reasons.join(", "));
            if spam.confidence == SpamConfidence::VeryHigh {
                let mut all = vec![detail];
                all.extend(reasons);
                return self.block_with_score(comment, user_id, all, "spam", spam.score, now);
            }
            reasons.push(format!("suspected {}", detail));
            triggers.push(TriggerKind::Spam);
        }

        // 4. Rate limit — terminal.
        if rate_limited {
            return self.block_with_score(
                comment,
                user_id,
                vec!["TOO_FAST: commenting too fast, slow down".into()],
                "rate limited",
                spam.score,
                now,
            );
        }

        // 5. New-user policy.
        if commenter.is_new && self.config.require_approval_for_new_users {
            reasons.push("new user requires review".into());
            triggers.push(TriggerKind::NewUser);
        }

        // 6. Reputation gate.
        let reputation = self.reputation.get(user_id);
        if reputation < self.config.review_reputation_threshold {
            reasons.push(format!("low reputation ({})", reputation));
            triggers.push(TriggerKind::LowReputation);
        }

        // 7. Nothing flagged — approved.
        self.record_comment(user_id, now);
        if reasons.is_empty() {
            self.total_approved.fetch_add(1, Ordering::Relaxed);
            self.reputation.adjust(user_id, APPROVE_DELTA, "comment approved", now);
            info!(comment = %comment.id, "Comment approved");
            return ModerationOutcome {
                status: ModerationStatus::Approved,
                reasons,
                spam_score: spam.score,
            };
        }

        self.enqueue(comment, commenter, &reasons, &triggers, now);
        ModerationOutcome {
            status: ModerationStatus::PendingReview,
            reasons,
            spam_score: spam.score,
        }
    }

    fn block(
        &self,
        comment: &CommentView,
        user_id: Option<&str>,
        reasons: Vec<String>,
        why: &str,
        now: i64,
    ) -> ModerationOutcome {
        self.block_with_score(comment, user_id, reasons, why, 0, now)
    }

    fn block_with_score(
        &self,
        comment: &CommentView,
        user_id: Option<&str>,
        reasons: Vec<String>,
        why: &str,
        spam_score: u8,
        now: i64,
    ) -> ModerationOutcome {
        self.total_blocked.fetch_add(1, Ordering::Relaxed);
        self.reputation.adjust(
            user_id,
            REJECT_DELTA,
            &format!("comment rejected: {}", why),
            now,
        );
        warn!(comment = %comment.id, why, reasons = %reasons.join("; "), "Comment blocked");
        ModerationOutcome { status: ModerationStatus::Blocked, reasons, spam_score }
    }

    // ── Structural validation ────────────────────────────────────────────

    fn validate(&self, comment: &CommentView) -> Vec<String> {
        let mut errors = Vec::new();
        let content = comment.content.trim();

        if comment.author.trim().is_empty() {
            errors.push("author must not be empty".to_string());
        }
        if content.is_empty() {
            errors.push("content must not be empty".to_string());
        } else {
            let len = content.chars().count();
            if len < self.config.min_length {
                errors.push(format!("content too short, minimum {} characters", self.config.min_length));
            }
            if len > self.config.max_length {
                errors.push(format!("content too long, maximum {} characters", self.config.max_length));
            }
            if self.matcher.content_matches(AttackType::Xss, content) {
                errors.push("content contains a dangerous script pattern".to_string());
            }
            if self.matcher.content_matches(AttackType::SqlInjection, content) {
                errors.push("content contains a dangerous SQL pattern".to_string());
            }
        }
        if let Some(email) = &comment.email {
            if !self.email_re.is_match(email) {
                errors.push("invalid email format".to_string());
            }
        }
        errors
    }

    // ── Rate tracking ────────────────────────────────────────────────────

    fn is_rate_limited(&self, user_id: Option<&str>, now: i64) -> bool {
        let Some(id) = user_id else { return false };
        let mut rates = self.rates.write();
        match rates.get_mut(id) {
            Some(window) => window.over_limit(self.config.rate_limit, now),
            None => false,
        }
    }

    fn record_comment(&self, user_id: Option<&str>, now: i64) {
        let Some(id) = user_id else { return };
        let mut rates = self.rates.write();
        rates
            .entry(id.to_string())
            .or_insert_with(|| RateWindow::new(self.config.rate_window_secs, now))
            .hit(now);
    }

    pub fn remaining_comments(&self, user_id: &str, now: i64) -> u32 {
        let mut rates = self.rates.write();
        match rates.get_mut(user_id) {
            Some(window) => window.remaining(self.config.rate_limit, now),
            None => self.config.rate_limit,
        }
    }

    // ── Review queue ─────────────────────────────────────────────────────

    fn enqueue(
        &self,
        comment: &CommentView,
        commenter: &CommenterView,
        reasons: &[String],
        triggers: &[TriggerKind],
        now: i64,
    ) {
        self.total_queued.fetch_add(1, Ordering::Relaxed);
        let priority = triggers.iter().map(|t| t.priority()).sum();
        let item = ModerationItem {
            comment: comment.clone(),
            commenter: commenter.clone(),
            reasons: reasons.to_vec(),
            triggers: triggers.to_vec(),
            priority,
            status: ModerationStatus::PendingReview,
            added_at: now,
            moderated_by: None,
            moderated_at: None,
        };
        let mut queue = self.queue.write();
        queue.push(item);
        queue.sort_by(|a, b| b.priority.cmp(&a.priority));
        info!(comment = %comment.id, priority, "Comment queued for review");
    }

    /// Highest-priority pending items first.
    pub fn queue(&self, limit: usize) -> Vec<ModerationItem> {
        self.queue.read().iter().take(limit).cloned().collect()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.read().len()
    }

    /// Apply a moderator's decision: the item leaves the queue and the
    /// commenter's reputation moves with the outcome.
    pub fn resolve(
        &self,
        comment_id: &str,
        action: ModerationAction,
        moderator: &str,
        now: i64,
    ) -> Option<ModerationItem> {
        let mut queue = self.queue.write();
        let idx = queue.iter().position(|item| item.comment.id == comment_id)?;
        let mut item = queue.remove(idx);
        drop(queue);

        item.status = match action {
            ModerationAction::Approve => ModerationStatus::Approved,
            ModerationAction::Reject => ModerationStatus::Blocked,
        };
        item.moderated_by = Some(moderator.to_string());
        item.moderated_at = Some(now);

        let user_id = item.commenter.user_id.as_deref();
        match action {
            ModerationAction::Approve => {
                self.total_approved.fetch_add(1, Ordering::Relaxed);
                self.reputation.adjust(user_id, APPROVE_DELTA, "review approved", now);
            }
            ModerationAction::Reject => {
                self.total_blocked.fetch_add(1, Ordering::Relaxed);
                self.reputation.adjust(user_id, REJECT_DELTA, "review rejected", now);
            }
        }
        info!(comment = %comment_id, action = ?action, moderator, "Moderation resolved");
        Some(item)
    }

    // ── Content cleanup ──────────────────────────────────────────────────

    /// Escape, collapse whitespace, and bound the content for storage.
    pub fn sanitize(&self, content: &str) -> String {
        let escaped = escape_html(content);
        let collapsed = escaped.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() > self.config.max_length {
            let truncated: String = collapsed.chars().take(self.config.max_length).collect();
            format!("{}...", truncated)
        } else {
            collapsed
        }
    }

    pub fn mask_sensitive(&self, content: &str) -> String {
        self.analyzer.mask_sensitive(content)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn analyzer(&self) -> &SpamAnalyzer {
        &self.analyzer
    }

    pub fn reputation(&self) -> &ReputationTracker {
        &self.reputation
    }

    pub fn total_moderated(&self) -> u64 {
        self.total_moderated.load(Ordering::Relaxed)
    }

    pub fn total_blocked(&self) -> u64 {
        self.total_blocked.load(Ordering::Relaxed)
    }

    pub fn total_approved(&self) -> u64 {
        self.total_approved.load(Ordering::Relaxed)
    }

    pub fn total_queued(&self) -> u64 {
        self.total_queued.load(Ordering::Relaxed)
    }
}

/// HTML-entity escape for everything the comment renderer must never see.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}
