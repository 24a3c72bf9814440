//! Threat Scorer — pure counters → (level, score) classification.
//!
//! Recomputed synchronously on every ledger update so the stored level can
//! never go stale. Calling it twice on the same profile state yields the
//! same result; the inputs only ever grow, so the level never drops.

use crate::threat_ledger::IdentityProfile;
use crate::types::{AttackType, ThreatLevel};

/// Weight added once per distinct attack type ever observed.
const TYPE_WEIGHTS: &[(AttackType, u32)] = &[
    (AttackType::SqlInjection, 20),
    (AttackType::CommandInjection, 25),
    (AttackType::Xss, 15),
    (AttackType::PathTraversal, 15),
    (AttackType::BruteForce, 10),
    (AttackType::Scanning, 5),
];

/// Weight for attack types outside the table.
const DEFAULT_TYPE_WEIGHT: u32 = 5;

/// Max contribution of the raw attack count.
const COUNT_CAP: u32 = 50;

/// Bonus when a fresh identity racks up attacks fast.
const BURST_BONUS: u32 = 20;
const BURST_WINDOW_SECS: i64 = 24 * 60 * 60;
const BURST_MIN_ATTACKS: u64 = 10;

fn type_weight(t: AttackType) -> u32 {
    TYPE_WEIGHTS
        .iter()
        .find(|(ty, _)| *ty == t)
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_TYPE_WEIGHT)
}

/// Score a profile's current counters.
pub fn score(profile: &IdentityProfile, now: i64) -> (ThreatLevel, u8) {
    let total = profile.total_attack_count();

    let mut score = (total.saturating_mul(2)).min(COUNT_CAP as u64) as u32;

    for t in &profile.distinct_types {
        score += type_weight(*t);
    }

    score += (profile.honeypot_hits as u32).saturating_mul(10);

    let recent = now - profile.first_seen < BURST_WINDOW_SECS;
    if recent && total > BURST_MIN_ATTACKS {
        score += BURST_BONUS;
    }

    let score = score.min(100) as u8;
    (level_for(score), score)
}

pub fn level_for(score: u8) -> ThreatLevel {
    if score >= 80 {
        ThreatLevel::Critical
    } else if score >= 60 {
        ThreatLevel::High
    } else if score >= 40 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}
