//! JSON-file-backed roster and backlog store
//!
//! The reference store implementation: one JSON file for the roster, one
//! JSON file per backlog under a common directory. Rows keep the sheet
//! conventions of the operator-edited originals: clock sets are comma
//! strings parsed leniently at this boundary, so the engine only ever sees
//! typed records. Writes go to a temp file first and rename into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{parse_clock_set, Account, Candidate, Credentials, MAX_ATTACHMENTS};

use super::{
    BacklogSource, ResultSink, RosterSource, SourceError, SourceResult, TrailingFields,
};

/// One roster row as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub active: bool,

    /// Comma-separated hours, e.g. `"9,21"`
    pub hours: String,

    /// Comma-separated minutes, e.g. `"0,30"`
    pub minutes: String,

    #[serde(default)]
    pub term_days: Option<i64>,

    /// Backlog file name under the backlog directory
    pub backlog: String,

    #[serde(default)]
    pub credentials: Credentials,
}

impl AccountRecord {
    /// Convert to the typed record the engine consumes.
    ///
    /// Clock-set parsing is lenient here: malformed tokens vanish rather
    /// than failing the roster load.
    pub fn into_account(self) -> Account {
        Account {
            hours: parse_clock_set(&self.hours, 23),
            minutes: parse_clock_set(&self.minutes, 59),
            id: self.id,
            name: self.name,
            active: self.active,
            term_days: self.term_days,
            backlog_ref: self.backlog,
            credentials: self.credentials,
        }
    }
}

/// One backlog row as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub row: u64,
    pub account_id: String,
    pub text: String,

    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub attachments_required: bool,
    #[serde(default)]
    pub reviewed: bool,
    #[serde(default)]
    pub priority: i64,

    // Trailing fields, the only ones the engine ever writes
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub post_ref: Option<String>,
    #[serde(default)]
    pub last_published: Option<String>,
}

impl CandidateRecord {
    pub fn into_candidate(self) -> Candidate {
        let mut attachments = self.attachments;
        attachments.truncate(MAX_ATTACHMENTS);

        Candidate {
            row: self.row,
            account_id: self.account_id,
            text: self.text,
            attachments,
            attachments_required: self.attachments_required,
            reviewed: self.reviewed,
            priority: self.priority,
            publish_count: self.count,
            // An empty cell means never published
            last_published: self.last_published.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// File-backed store implementing all three collaborator seams
pub struct JsonStore {
    accounts_path: PathBuf,
    backlog_dir: PathBuf,
}

impl JsonStore {
    pub fn new(accounts_path: impl Into<PathBuf>, backlog_dir: impl Into<PathBuf>) -> Self {
        Self {
            accounts_path: accounts_path.into(),
            backlog_dir: backlog_dir.into(),
        }
    }

    fn backlog_path(&self, reference: &str) -> PathBuf {
        self.backlog_dir.join(reference)
    }

    async fn read_records(&self, path: &Path) -> SourceResult<Vec<CandidateRecord>> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::io("read_backlog", e.to_string()))?;

        serde_json::from_str(&raw)
            .map_err(|e| SourceError::malformed(path.display().to_string(), e.to_string()))
    }

    async fn write_records(&self, path: &Path, records: &[CandidateRecord]) -> SourceResult<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| SourceError::io("encode_backlog", e.to_string()))?;

        // Write-then-rename keeps a crash from truncating the backlog
        let temp = path.with_extension("tmp");
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| SourceError::io("write_backlog", e.to_string()))?;
        tokio::fs::rename(&temp, path)
            .await
            .map_err(|e| SourceError::io("rename_backlog", e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl RosterSource for JsonStore {
    async fn accounts(&self) -> SourceResult<Vec<Account>> {
        let raw = tokio::fs::read_to_string(&self.accounts_path)
            .await
            .map_err(|e| SourceError::io("read_roster", e.to_string()))?;

        let records: Vec<AccountRecord> = serde_json::from_str(&raw).map_err(|e| {
            SourceError::malformed(self.accounts_path.display().to_string(), e.to_string())
        })?;

        Ok(records.into_iter().map(AccountRecord::into_account).collect())
    }
}

#[async_trait]
impl BacklogSource for JsonStore {
    async fn backlog(&self, account: &Account) -> SourceResult<Vec<Candidate>> {
        let path = self.backlog_path(&account.backlog_ref);
        if !path.exists() {
            return Err(SourceError::UnknownReference {
                reference: account.backlog_ref.clone(),
            });
        }

        let records = self.read_records(&path).await?;
        Ok(records.into_iter().map(CandidateRecord::into_candidate).collect())
    }
}

#[async_trait]
impl ResultSink for JsonStore {
    async fn write_trailing_fields(
        &self,
        account: &Account,
        row: u64,
        fields: TrailingFields,
    ) -> SourceResult<()> {
        let path = self.backlog_path(&account.backlog_ref);
        let mut records = self.read_records(&path).await?;

        let record = records
            .iter_mut()
            .find(|r| r.row == row)
            .ok_or_else(|| SourceError::RowNotFound {
                reference: account.backlog_ref.clone(),
                row,
            })?;

        // Trailing fields only; every other column belongs to the operator
        record.count = fields.publish_count;
        record.last_published = Some(fields.last_published);
        if let Some(post_ref) = fields.post_ref {
            record.post_ref = Some(post_ref);
        }

        self.write_records(&path, &records).await
    }
}
