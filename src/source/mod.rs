//! Roster and backlog collaborator seams
//!
//! The engine does not own account or candidate records; an external store
//! does. These traits are the boundary: the store hands the engine typed
//! records (one fresh backlog snapshot per tick) and accepts write-back of
//! exactly the trailing fields of one record, never any other column.

pub mod file;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Account, Candidate};

/// Result type for store operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Store failures
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// I/O failure against the backing store
    #[error("store i/o failure during {operation}: {reason}")]
    Io { operation: String, reason: String },

    /// A record could not be decoded
    #[error("malformed record in {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// The account points at a backlog the store does not know
    #[error("unknown backlog reference {reference}")]
    UnknownReference { reference: String },

    /// The targeted row is missing from the backlog
    #[error("row {row} not found in backlog {reference}")]
    RowNotFound { reference: String, row: u64 },
}

impl SourceError {
    pub fn io(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// The fields a successful publish writes back; always the trailing
/// columns of the record and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingFields {
    /// New publish count
    pub publish_count: u64,

    /// Post reference when the transport returned one; `None` (the
    /// interactive path) leaves the stored reference untouched
    pub post_ref: Option<String>,

    /// Publish instant in the stored civil-time representation
    pub last_published: String,
}

/// Provides the account roster
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn accounts(&self) -> SourceResult<Vec<Account>>;
}

/// Provides one account's backlog as a read-only snapshot
#[async_trait]
pub trait BacklogSource: Send + Sync {
    async fn backlog(&self, account: &Account) -> SourceResult<Vec<Candidate>>;
}

/// Accepts post-publish write-back of one record's trailing fields
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn write_trailing_fields(
        &self,
        account: &Account,
        row: u64,
        fields: TrailingFields,
    ) -> SourceResult<()>;
}
