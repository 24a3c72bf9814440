//! Shared types for the moderation layer.

pub use palisade_web::types::Severity;

/// An incoming comment, as handed over by the comment store.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommentView {
    pub id: String,
    pub author: String,
    pub email: Option<String>,
    pub content: String,
}

/// What the platform knows about the commenting identity.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CommenterView {
    pub user_id: Option<String>,
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Approved,
    Blocked,
    PendingReview,
}

/// Terminal result of the moderation state machine for one comment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModerationOutcome {
    pub status: ModerationStatus,
    pub reasons: Vec<String>,
    pub spam_score: u8,
}

impl ModerationOutcome {
    pub fn approved(&self) -> bool {
        self.status == ModerationStatus::Approved
    }

    pub fn blocked(&self) -> bool {
        self.status == ModerationStatus::Blocked
    }
}

/// Why a comment was flagged; drives queue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    SensitiveWords,
    Spam,
    LowReputation,
    NewUser,
}

impl TriggerKind {
    /// Queue priority contribution per category.
    pub fn priority(self) -> u32 {
        match self {
            TriggerKind::SensitiveWords => 50,
            TriggerKind::Spam => 30,
            TriggerKind::LowReputation => 20,
            TriggerKind::NewUser => 10,
        }
    }
}

/// Resolution applied by a moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
}

/// Queue entry wrapping a comment pending manual review.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModerationItem {
    pub comment: CommentView,
    pub commenter: CommenterView,
    pub reasons: Vec<String>,
    pub triggers: Vec<TriggerKind>,
    pub priority: u32,
    pub status: ModerationStatus,
    pub added_at: i64,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<i64>,
}

/// Confidence band for a spam verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpamConfidence {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpamVerdict {
    pub is_spam: bool,
    pub score: u8,
    pub confidence: SpamConfidence,
    pub reasons: Vec<String>,
}

/// Severity of a sensitive-word scan, escalating with distinct matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveSeverity {
    None,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SensitiveScan {
    pub words: Vec<String>,
    pub severity: SensitiveSeverity,
}
