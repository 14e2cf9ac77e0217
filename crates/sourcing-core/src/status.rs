//! Lifecycle states for a registration queue item.
//!
//! The happy path is `pending -> analyzing -> priced -> registering -> registered`
//! and is driven by the registration workflow. This module only certifies which
//! moves are legal. `error -> pending` is deliberately absent from
//! [`QueueStatus::can_transition_to`]: the only route back from a failure is
//! [`crate::QueueItem::recover_for_retry`], which enforces the retry bound.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueueStatus {
    Pending,
    Analyzing,
    Priced,
    Registering,
    Registered,
    Error,
    ErrorPermanent,
    SkipInvalid,
    Deleted,
    /// A status string written by some other tool (e.g. `approved`, `denied`).
    /// Preserved on save, never swept.
    Other(String),
}

impl QueueStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Analyzing => "analyzing",
            QueueStatus::Priced => "priced",
            QueueStatus::Registering => "registering",
            QueueStatus::Registered => "registered",
            QueueStatus::Error => "error",
            QueueStatus::ErrorPermanent => "error_permanent",
            QueueStatus::SkipInvalid => "skip_invalid",
            QueueStatus::Deleted => "deleted",
            QueueStatus::Other(s) => s.as_str(),
        }
    }

    /// States still moving through the registration workflow.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            QueueStatus::Pending
                | QueueStatus::Analyzing
                | QueueStatus::Priced
                | QueueStatus::Registering
        )
    }

    /// States excluded from every automated sweep.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Registered
                | QueueStatus::Deleted
                | QueueStatus::SkipInvalid
                | QueueStatus::ErrorPermanent
        )
    }

    /// Whether the batch repricer may touch an item in this state.
    #[must_use]
    pub fn is_repriceable(&self) -> bool {
        !self.is_terminal() && !matches!(self, QueueStatus::Other(_))
    }

    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: &QueueStatus) -> bool {
        use QueueStatus::{
            Analyzing, Deleted, Error, ErrorPermanent, Pending, Priced, Registered, Registering,
            SkipInvalid,
        };

        match (self, next) {
            (Pending, Analyzing)
            | (Analyzing, Priced)
            | (Priced, Registering)
            | (Registering, Registered)
            | (Error, ErrorPermanent) => true,
            (Pending | Analyzing | Priced, SkipInvalid) => true,
            (from, Error) if from.is_active() => true,
            (Deleted, _) => false,
            (_, Deleted) => true,
            _ => false,
        }
    }
}

impl From<String> for QueueStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => QueueStatus::Pending,
            "analyzing" => QueueStatus::Analyzing,
            "priced" => QueueStatus::Priced,
            "registering" => QueueStatus::Registering,
            "registered" => QueueStatus::Registered,
            "error" => QueueStatus::Error,
            "error_permanent" => QueueStatus::ErrorPermanent,
            "skip_invalid" => QueueStatus::SkipInvalid,
            "deleted" => QueueStatus::Deleted,
            _ => QueueStatus::Other(value),
        }
    }
}

impl From<&str> for QueueStatus {
    fn from(value: &str) -> Self {
        QueueStatus::from(value.to_owned())
    }
}

impl From<QueueStatus> for String {
    fn from(value: QueueStatus) -> Self {
        match value {
            QueueStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
