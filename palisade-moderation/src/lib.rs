//! # Palisade Moderation — Comment gate
//!
//! The comment-side twin of the request pipeline:
//! - **Spam Analyzer** — weighted content scoring with confidence bands,
//!   plus the sensitive-word lexicon
//! - **Reputation Tracker** — 0–100 per-commenter score with bounded
//!   delta history
//! - **Moderation Gate** — the NEW → {BLOCKED | APPROVED | PENDING_REVIEW}
//!   state machine and the priority-ordered review queue

pub mod moderation_gate;
pub mod reputation;
pub mod spam_analyzer;
pub mod types;

pub use moderation_gate::ModerationGate;
pub use reputation::ReputationTracker;
pub use spam_analyzer::SpamAnalyzer;
pub use types::{CommentView, CommenterView, ModerationOutcome, ModerationStatus};

#[cfg(test)]
mod tests;
