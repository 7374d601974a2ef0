//! Integration tests for the candidate filtering pipeline
//!
//! Exercises the full five-stage narrowing through the public `select`
//! entry point, including the publish round-trip interaction with the
//! count stage.

use autopost::models::{Account, Candidate, Credentials};
use autopost::schedule::civil;
use autopost::selector::{CandidatePipeline, SelectError};
use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn account(id: &str, term_days: i64) -> Account {
    Account {
        id: id.to_string(),
        name: id.to_string(),
        active: true,
        hours: vec![9],
        minutes: vec![0],
        term_days: Some(term_days),
        backlog_ref: format!("{id}.json"),
        credentials: Credentials::default(),
    }
}

fn candidate(row: u64, account_id: &str) -> Candidate {
    Candidate {
        row,
        account_id: account_id.to_string(),
        text: format!("post {row}"),
        attachments: vec![],
        attachments_required: false,
        reviewed: true,
        priority: 0,
        publish_count: 0,
        last_published: None,
    }
}

fn pipeline(seed: u64) -> CandidatePipeline<ChaCha8Rng> {
    CandidatePipeline::with_rng(ChaCha8Rng::seed_from_u64(seed), 1)
}

// ============================================================================
// Stage Ordering and Narrowing
// ============================================================================

#[test]
fn test_full_narrowing_to_single_candidate() {
    let account = account("alpha", 1);

    let mut recent = candidate(1, "alpha");
    recent.last_published = Some("2024/05/31 23:00:00".to_string());
    let mut unreviewed = candidate(2, "alpha");
    unreviewed.reviewed = false;
    let mut low_priority = candidate(3, "alpha");
    low_priority.priority = 1;
    let mut repeated = candidate(4, "alpha");
    repeated.priority = 5;
    repeated.publish_count = 3;
    let mut winner = candidate(5, "alpha");
    winner.priority = 5;
    winner.publish_count = 1;
    let foreign = candidate(6, "beta");

    let backlog = vec![recent, unreviewed, low_priority, repeated, winner, foreign];
    let now = civil::to_instant("2024/06/01 09:00:00").unwrap();

    // Ownership drops row 6, staleness drops row 1 (ten hours old inside a
    // one-day window), review drops row 2, priority keeps rows 4 and 5,
    // count keeps row 5 alone.
    let picked = pipeline(1).select(&account, &backlog, now).unwrap();
    assert_eq!(picked.row, 5);
}

#[test]
fn test_priority_ties_survive_to_count_stage() {
    // Priorities {5, 5, 3}: both fives reach the count stage regardless of
    // their counts; the lower count then wins
    let account = account("alpha", 1);

    let mut a = candidate(1, "alpha");
    a.priority = 5;
    a.publish_count = 9;
    let mut b = candidate(2, "alpha");
    b.priority = 5;
    b.publish_count = 2;
    let mut c = candidate(3, "alpha");
    c.priority = 3;
    c.publish_count = 0;

    let picked = pipeline(1)
        .select(&account, &[a, b, c], Utc::now())
        .unwrap();
    assert_eq!(picked.row, 2);
}

#[test]
fn test_survivor_set_is_stable_across_runs() {
    // Deterministic through stage five: with the count stage resolving the
    // tie, every run picks the same row no matter the seed
    let account = account("alpha", 1);

    let mut a = candidate(1, "alpha");
    a.priority = 5;
    a.publish_count = 1;
    let mut b = candidate(2, "alpha");
    b.priority = 5;
    b.publish_count = 0;
    let backlog = vec![a, b];

    for seed in 0..10 {
        let picked = pipeline(seed).select(&account, &backlog, Utc::now()).unwrap();
        assert_eq!(picked.row, 2);
    }
}

#[test]
fn test_random_pick_stays_inside_survivor_set() {
    let account = account("alpha", 1);
    let backlog = vec![
        candidate(1, "alpha"),
        candidate(2, "alpha"),
        candidate(3, "alpha"),
    ];

    for seed in 0..20 {
        let picked = pipeline(seed).select(&account, &backlog, Utc::now()).unwrap();
        assert!(backlog.iter().any(|c| c.row == picked.row));
    }
}

#[test]
fn test_seeded_pick_is_reproducible() {
    let account = account("alpha", 1);
    let backlog = vec![
        candidate(1, "alpha"),
        candidate(2, "alpha"),
        candidate(3, "alpha"),
    ];
    let now = Utc::now();

    let first = pipeline(7).select(&account, &backlog, now).unwrap();
    let second = pipeline(7).select(&account, &backlog, now).unwrap();
    assert_eq!(first.row, second.row);
}

// ============================================================================
// Staleness Window
// ============================================================================

#[test]
fn test_staleness_boundaries() {
    let account = account("alpha", 1);
    let mut c = candidate(1, "alpha");
    c.last_published = Some("2024/01/01 00:00:00".to_string());
    let backlog = vec![c];

    // Two civil days later: passes
    let now = civil::to_instant("2024/01/03 00:00:00").unwrap();
    assert!(pipeline(1).select(&account, &backlog, now).is_ok());

    // Half a day later: blocked
    let now = civil::to_instant("2024/01/01 12:00:00").unwrap();
    assert_eq!(
        pipeline(1).select(&account, &backlog, now).unwrap_err(),
        SelectError::NoneFresh {
            account: "alpha".to_string()
        }
    );
}

#[test]
fn test_account_term_days_override_the_default() {
    // Pipeline default is one day; the account stretches it to seven
    let account = account("alpha", 7);
    let mut c = candidate(1, "alpha");
    c.last_published = Some("2024/01/01 00:00:00".to_string());
    let backlog = vec![c];

    let now = civil::to_instant("2024/01/03 00:00:00").unwrap();
    assert!(pipeline(1).select(&account, &backlog, now).is_err());

    let now = civil::to_instant("2024/01/09 00:00:00").unwrap();
    assert!(pipeline(1).select(&account, &backlog, now).is_ok());
}

// ============================================================================
// Publish Round-Trip
// ============================================================================

#[test]
fn test_published_candidate_not_reselected_from_same_snapshot() {
    let account = account("alpha", 1);
    let mut backlog = vec![candidate(1, "alpha"), candidate(2, "alpha")];

    let now = Utc::now();
    let picked = pipeline(3).select(&account, &backlog, now).unwrap();
    let picked_row = picked.row;

    // Mirror what the runner does after a successful publish
    let slot = backlog.iter_mut().find(|c| c.row == picked_row).unwrap();
    let before = slot.publish_count;
    slot.mark_published(civil::format_instant(now));
    assert_eq!(slot.publish_count, before + 1);

    // On the unchanged snapshot the other candidate now has the strictly
    // lower count and must win
    let reselected = pipeline(3).select(&account, &backlog, now).unwrap();
    assert_ne!(reselected.row, picked_row);
}

// ============================================================================
// Termination Outcomes
// ============================================================================

#[test]
fn test_foreign_only_backlog_reports_no_candidates() {
    let account = account("alpha", 1);
    let backlog = vec![candidate(1, "beta"), candidate(2, "gamma")];

    assert_eq!(
        pipeline(1).select(&account, &backlog, Utc::now()).unwrap_err(),
        SelectError::NoneForAccount {
            account: "alpha".to_string()
        }
    );
}

#[test]
fn test_unreviewed_only_backlog_still_selects() {
    let account = account("alpha", 1);
    let mut a = candidate(1, "alpha");
    a.reviewed = false;
    let mut b = candidate(2, "alpha");
    b.reviewed = false;
    b.publish_count = 1;

    let picked = pipeline(1).select(&account, &[a, b], Utc::now()).unwrap();
    assert_eq!(picked.row, 1);
}
