//! The pipeline's answer to the HTTP layer.

use serde::{Deserialize, Serialize};

/// What the external HTTP layer should do with the request. The pipeline
/// never writes responses itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing suspicious; serve normally.
    Allow,
    /// Findings were recorded but no block applies; serve and log.
    AllowWithLogging,
    /// Identity is blocked; reject with the given status and error body.
    Reject { status: u16, error: String, code: String },
    /// Decoy path hit; serve the fake content instead of the real resource.
    ServeHoneypot { content: String },
}

impl Verdict {
    pub fn rejected() -> Self {
        Verdict::Reject {
            status: 429,
            error: "Access temporarily blocked due to suspicious activity".into(),
            code: "IP_BLOCKED".into(),
        }
    }

    pub fn allows(&self) -> bool {
        matches!(self, Verdict::Allow | Verdict::AllowWithLogging)
    }
}
