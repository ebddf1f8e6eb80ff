//! Verdicts and their presentation labels.

use serde::{Deserialize, Serialize};

/// Detail used when a terminal verdict arrives without any text.
pub const EMPTY_DETAIL: &str = "No details reported.";

/// Status of one report row.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Pass,
    Flagged,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Pending)
    }

    /// Label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Pass => "Clear",
            Status::Flagged => "Flagged",
        }
    }

    /// CSS class of the status icon.
    pub fn css_class(self) -> &'static str {
        match self {
            Status::Pending => "status-pending",
            Status::Pass => "status-pass",
            Status::Flagged => "status-flagged",
        }
    }
}

/// A judgement with human-readable evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    status: Status,
    detail: String,
}

impl Verdict {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self::terminal(Status::Pass, detail.into())
    }

    pub fn flagged(detail: impl Into<String>) -> Self {
        Self::terminal(Status::Flagged, detail.into())
    }

    /// Pass unless `flag` is set.
    pub fn from_flag(flag: bool, detail: impl Into<String>) -> Self {
        if flag {
            Self::flagged(detail)
        } else {
            Self::pass(detail)
        }
    }

    pub fn pending() -> Self {
        Self {
            status: Status::Pending,
            detail: "Awaiting data...".to_string(),
        }
    }

    fn terminal(status: Status, detail: String) -> Self {
        let detail = if detail.trim().is_empty() {
            EMPTY_DETAIL.to_string()
        } else {
            detail
        };
        Self { status, detail }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
