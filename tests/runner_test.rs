//! End-to-end tick execution over the file-backed store
//!
//! Drives `execute_tick` against a temp-dir `JsonStore` and a recording
//! transport, then inspects the store for the trailing-field write-back.

use std::sync::Arc;

use async_trait::async_trait;
use autopost::models::Account;
use autopost::publisher::{PublishError, PublishResult, PublishRouter, StructuredTransport};
use autopost::runner::{execute_tick, TickContext};
use autopost::source::file::{AccountRecord, CandidateRecord, JsonStore};
use chrono::{NaiveDate, Utc};
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Structured transport that records calls and returns a fixed post id
struct RecordingTransport {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingTransport {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl StructuredTransport for RecordingTransport {
    async fn publish(
        &self,
        account: &Account,
        text: &str,
        _attachments: &[String],
    ) -> PublishResult<String> {
        self.calls
            .lock()
            .await
            .push((account.id.clone(), text.to_string()));

        if self.fail {
            Err(PublishError::Rejected(503))
        } else {
            Ok("777".to_string())
        }
    }
}

struct Fixture {
    _dir: TempDir,
    transport: Arc<RecordingTransport>,
    ctx: Arc<TickContext>,
    backlog_path: std::path::PathBuf,
}

fn account_record(id: &str, hours: &str, minutes: &str) -> AccountRecord {
    AccountRecord {
        id: id.to_string(),
        name: id.to_string(),
        active: true,
        hours: hours.to_string(),
        minutes: minutes.to_string(),
        term_days: None,
        backlog: format!("{id}.json"),
        credentials: Default::default(),
    }
}

fn candidate_record(row: u64, account_id: &str, count: u64) -> CandidateRecord {
    CandidateRecord {
        row,
        account_id: account_id.to_string(),
        text: format!("post {row}"),
        attachments: vec![],
        attachments_required: false,
        reviewed: true,
        priority: 0,
        count,
        post_ref: None,
        last_published: None,
    }
}

fn fixture(roster: Vec<AccountRecord>, backlog: Vec<CandidateRecord>, fail: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let accounts_path = dir.path().join("accounts.json");
    let backlog_dir = dir.path().join("backlogs");
    std::fs::create_dir_all(&backlog_dir).unwrap();

    let backlog_file = roster
        .first()
        .map(|r| r.backlog.clone())
        .unwrap_or_else(|| "alpha.json".to_string());
    std::fs::write(&accounts_path, serde_json::to_string(&roster).unwrap()).unwrap();
    let backlog_path = backlog_dir.join(&backlog_file);
    std::fs::write(&backlog_path, serde_json::to_string(&backlog).unwrap()).unwrap();

    let store = Arc::new(JsonStore::new(&accounts_path, &backlog_dir));
    let transport = Arc::new(if fail {
        RecordingTransport::failing()
    } else {
        RecordingTransport::new()
    });
    let router = Arc::new(PublishRouter::new(transport.clone(), None, 140));

    let ctx = Arc::new(TickContext {
        default_term_days: 1,
        max_jitter_secs: 0,
        roster: store.clone(),
        backlog: store.clone(),
        sink: store,
        router,
    });

    Fixture {
        _dir: dir,
        transport,
        ctx,
        backlog_path,
    }
}

fn wall(hour: u32, minute: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn read_backlog(path: &std::path::Path) -> Vec<CandidateRecord> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_due_account_publishes_and_records() {
    let f = fixture(
        vec![account_record("alpha", "9", "0,30")],
        vec![
            candidate_record(1, "alpha", 2),
            candidate_record(2, "alpha", 0),
        ],
        false,
    );

    execute_tick(f.ctx.clone(), wall(9, 30), Utc::now()).await;

    // The lower-count row was selected and published
    let calls = f.transport.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ("alpha".to_string(), "post 2".to_string()));

    // Exactly the trailing fields were written back
    let stored = read_backlog(&f.backlog_path);
    let updated = stored.iter().find(|r| r.row == 2).unwrap();
    assert_eq!(updated.count, 1);
    assert_eq!(
        updated.post_ref.as_deref(),
        Some("https://twitter.com/i/web/status/777")
    );
    assert!(updated.last_published.is_some());

    let untouched = stored.iter().find(|r| r.row == 1).unwrap();
    assert_eq!(untouched.count, 2);
    assert!(untouched.last_published.is_none());
}

#[tokio::test]
async fn test_not_due_account_is_left_alone() {
    let f = fixture(
        vec![account_record("alpha", "9", "0")],
        vec![candidate_record(1, "alpha", 0)],
        false,
    );

    execute_tick(f.ctx.clone(), wall(9, 1), Utc::now()).await;

    assert!(f.transport.calls.lock().await.is_empty());
    let stored = read_backlog(&f.backlog_path);
    assert_eq!(stored[0].count, 0);
}

// ============================================================================
// Failure Isolation
// ============================================================================

#[tokio::test]
async fn test_transport_failure_leaves_store_untouched() {
    let f = fixture(
        vec![account_record("alpha", "9", "0")],
        vec![candidate_record(1, "alpha", 0)],
        true,
    );

    execute_tick(f.ctx.clone(), wall(9, 0), Utc::now()).await;

    // The attempt happened, but no partial state was written
    assert_eq!(f.transport.calls.lock().await.len(), 1);
    let stored = read_backlog(&f.backlog_path);
    assert_eq!(stored[0].count, 0);
    assert!(stored[0].last_published.is_none());
}

#[tokio::test]
async fn test_one_failing_account_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    let accounts_path = dir.path().join("accounts.json");
    let backlog_dir = dir.path().join("backlogs");
    std::fs::create_dir_all(&backlog_dir).unwrap();

    // Two due accounts; the first's backlog file is missing entirely
    let roster = vec![
        account_record("broken", "9", "0"),
        account_record("alpha", "9", "0"),
    ];
    std::fs::write(&accounts_path, serde_json::to_string(&roster).unwrap()).unwrap();
    std::fs::write(
        backlog_dir.join("alpha.json"),
        serde_json::to_string(&vec![candidate_record(1, "alpha", 0)]).unwrap(),
    )
    .unwrap();

    let store = Arc::new(JsonStore::new(&accounts_path, &backlog_dir));
    let transport = Arc::new(RecordingTransport::new());
    let router = Arc::new(PublishRouter::new(transport.clone(), None, 140));
    let ctx = Arc::new(TickContext {
        default_term_days: 1,
        max_jitter_secs: 0,
        roster: store.clone(),
        backlog: store.clone(),
        sink: store,
        router,
    });

    execute_tick(ctx, wall(9, 0), Utc::now()).await;

    // The healthy account still published
    let calls = transport.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "alpha");
}

#[tokio::test]
async fn test_empty_backlog_is_a_quiet_skip() {
    let f = fixture(
        vec![account_record("alpha", "9", "0")],
        vec![],
        false,
    );

    execute_tick(f.ctx.clone(), wall(9, 0), Utc::now()).await;
    assert!(f.transport.calls.lock().await.is_empty());
}
