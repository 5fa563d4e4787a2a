// Harness error taxonomy
//
// Assertion failures (Mismatch) are kept apart from harness defects (InvalidState)

use cdp_client::CdpError;
use serde_json::Value;
use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The harness itself was misused: a second waiter for the same event, a lifecycle
    /// notification nobody waits for, a lookup that setup should have populated.
    #[error("Invalid internal state: {0}")]
    InvalidState(String),

    #[error("Remote exception: {0}")]
    RemoteException(Value),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("{method} failed with {error} (request: {request})")]
    Protocol {
        method: String,
        request: Value,
        error: Value,
    },

    #[error("[{label}] {what}\nExpected: {expected}\nActual:   {actual}")]
    Mismatch {
        label: String,
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Malformed {what}: {detail}")]
    Malformed { what: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] CdpError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn mismatch(
        label: impl Into<String>,
        what: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::Mismatch {
            label: label.into(),
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn malformed(what: impl Into<String>, detail: impl ToString) -> Self {
        Self::Malformed {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    /// True for failures the debuggee is responsible for, false for harness defects
    pub fn is_assertion_failure(&self) -> bool {
        matches!(
            self,
            Self::Mismatch { .. } | Self::RemoteException(_) | Self::Protocol { .. }
        )
    }

    /// Breadcrumb of a mismatch
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Mismatch { label, .. } => Some(label),
            _ => None,
        }
    }
}
