// Core data structures for the publishing engine

use serde::{Deserialize, Serialize};

/// Maximum number of attachment references a candidate may carry
pub const MAX_ATTACHMENTS: usize = 4;

/// Opaque platform credentials for one account
///
/// The engine never inspects these; they are threaded through to the
/// publish transports unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub bearer_token: String,
    /// Password for the interactive (browser-driven) publish path
    #[serde(default)]
    pub password: String,
}

/// One publishing account from the roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Platform handle; owner key for every candidate in this account's backlog
    pub id: String,

    /// Display name
    pub name: String,

    /// Activation flag; an inactive account is never due
    pub active: bool,

    /// Hours of the day (0-23) at which this account publishes
    pub hours: Vec<u8>,

    /// Minutes (0-59) within a due hour at which this account publishes
    pub minutes: Vec<u8>,

    /// Staleness window in days; falls back to the configured default when unset
    pub term_days: Option<i64>,

    /// Reference to this account's backlog in the external store
    pub backlog_ref: String,

    pub credentials: Credentials,
}

impl Account {
    /// Effective staleness window for this account
    pub fn effective_term_days(&self, default_days: i64) -> i64 {
        self.term_days.unwrap_or(default_days)
    }
}

/// One backlog item eligible for publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable row identifier, unique within the account's backlog
    pub row: u64,

    /// Owning account identifier; must match the account under selection
    pub account_id: String,

    /// Textual payload
    pub text: String,

    /// Up to four attachment references
    pub attachments: Vec<String>,

    /// When set, a publish without all attachments is a failure
    pub attachments_required: bool,

    /// Editorial review flag
    pub reviewed: bool,

    /// Selection priority; higher wins
    pub priority: i64,

    /// Successful publish count, incremented once per publish
    pub publish_count: u64,

    /// Last successful publish as a stored civil-time string; `None` means never
    pub last_published: Option<String>,
}

impl Candidate {
    /// Whether this candidate has never been published
    pub fn never_published(&self) -> bool {
        self.last_published.is_none()
    }

    /// Record a successful publish: bump the count and stamp the civil time
    pub fn mark_published(&mut self, stamp: String) {
        self.publish_count += 1;
        self.last_published = Some(stamp);
    }

    /// Payload length in characters, the unit the transport threshold uses
    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Parse a comma-separated clock set ("9, 21") into sorted unique values.
///
/// Non-numeric tokens and values above `max` are dropped silently; the
/// store is hand-edited and a stray token must not fail the whole roster.
pub fn parse_clock_set(raw: &str, max: u8) -> Vec<u8> {
    let mut values: Vec<u8> = raw
        .split(',')
        .filter_map(|token| token.trim().parse::<u8>().ok())
        .filter(|v| *v <= max)
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}
