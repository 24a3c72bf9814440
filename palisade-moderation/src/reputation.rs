//! Reputation Tracker — per-commenter standing, 0–100.
//!
//! New identities start at 50. Every adjustment carries a reason and lands
//! in a bounded per-identity history so moderators can see how a score got
//! where it is.

use palisade_core::ring::RingHistory;
use parking_lot::RwLock;
use std::collections::HashMap;

pub const DEFAULT_REPUTATION: i32 = 50;
const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReputationDelta {
    pub change: i32,
    pub reason: String,
    pub timestamp: i64,
    pub new_score: i32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReputationRecord {
    pub score: i32,
    pub history: RingHistory<ReputationDelta>,
}

#[derive(Default)]
pub struct ReputationTracker {
    records: RwLock<HashMap<String, ReputationRecord>>,
}

impl ReputationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score; unknown identities sit at the default.
    pub fn get(&self, user_id: Option<&str>) -> i32 {
        match user_id {
            Some(id) => self
                .records
                .read()
                .get(id)
                .map(|r| r.score)
                .unwrap_or(DEFAULT_REPUTATION),
            None => DEFAULT_REPUTATION,
        }
    }

    /// Apply a delta, clamped to [0, 100], recording the reason.
    pub fn adjust(&self, user_id: Option<&str>, change: i32, reason: &str, now: i64) {
        let Some(id) = user_id else { return };
        let mut records = self.records.write();
        let record = records.entry(id.to_string()).or_insert_with(|| ReputationRecord {
            score: DEFAULT_REPUTATION,
            history: RingHistory::new(HISTORY_CAPACITY),
        });
        record.score = (record.score + change).clamp(0, 100);
        record.history.push(ReputationDelta {
            change,
            reason: reason.to_string(),
            timestamp: now,
            new_score: record.score,
        });
    }

    pub fn history(&self, user_id: &str) -> Vec<ReputationDelta> {
        self.records
            .read()
            .get(user_id)
            .map(|r| r.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn tracked_users(&self) -> usize {
        self.records.read().len()
    }

    pub fn average(&self) -> i32 {
        let records = self.records.read();
        if records.is_empty() {
            return DEFAULT_REPUTATION;
        }
        let total: i64 = records.values().map(|r| r.score as i64).sum();
        (total / records.len() as i64) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_users_sit_at_default() {
        let tracker = ReputationTracker::new();
        assert_eq!(tracker.get(Some("nobody")), 50);
        assert_eq!(tracker.get(None), 50);
    }

    #[test]
    fn adjust_clamps_and_records() {
        let tracker = ReputationTracker::new();
        tracker.adjust(Some("u1"), -60, "comment rejected", 1_000);
        assert_eq!(tracker.get(Some("u1")), 0);
        tracker.adjust(Some("u1"), 200, "manual reset", 1_001);
        assert_eq!(tracker.get(Some("u1")), 100);
        let history = tracker.history("u1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new_score, 0);
        assert_eq!(history[1].reason, "manual reset");
    }

    #[test]
    fn history_is_bounded_to_fifty() {
        let tracker = ReputationTracker::new();
        for i in 0..60 {
            tracker.adjust(Some("u1"), 1, "approved", 1_000 + i);
        }
        assert_eq!(tracker.history("u1").len(), 50);
    }

    #[test]
    fn anonymous_adjustments_are_dropped() {
        let tracker = ReputationTracker::new();
        tracker.adjust(None, -5, "rejected", 1_000);
        assert_eq!(tracker.tracked_users(), 0);
    }
}
