//! Error types for candidate selection

use thiserror::Error;

/// Result type for selection operations
pub type SelectResult<T> = Result<T, SelectError>;

/// Selection failures.
///
/// The empty-stage variants are routine per-tick outcomes: the caller logs
/// them and skips the account until its next due tick. `OwnerMismatch` is
/// different in kind; it means the pipeline produced a candidate belonging
/// to another account, which is a data or logic defect rather than an
/// empty backlog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// The backlog holds no candidates owned by this account
    #[error("no candidates for account {account}")]
    NoneForAccount { account: String },

    /// Every owned candidate was published inside the staleness window
    #[error("no candidates past the staleness threshold for account {account}")]
    NoneFresh { account: String },

    /// The final pick had nothing to choose from
    #[error("no candidates left at final pick for account {account}")]
    NoneRemaining { account: String },

    /// The picked candidate belongs to a different account
    #[error("picked row {row} belongs to {candidate_account}, not {account}")]
    OwnerMismatch {
        account: String,
        candidate_account: String,
        row: u64,
    },
}

impl SelectError {
    pub fn none_for_account(account: impl Into<String>) -> Self {
        Self::NoneForAccount {
            account: account.into(),
        }
    }

    pub fn none_fresh(account: impl Into<String>) -> Self {
        Self::NoneFresh {
            account: account.into(),
        }
    }

    pub fn none_remaining(account: impl Into<String>) -> Self {
        Self::NoneRemaining {
            account: account.into(),
        }
    }

    /// True for the variants that indicate a defect rather than an empty set
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::OwnerMismatch { .. })
    }
}
