//! Candidate filtering pipeline
//!
//! Narrows an account's backlog to exactly one publishable candidate
//! through five ordered stages:
//!
//! 1. ownership: keep candidates owned by the account
//! 2. staleness: keep candidates last published before the cutoff
//! 3. review: keep reviewed candidates, pass everything through if none
//! 4. priority: keep the maximum-priority candidates, ties kept
//! 5. count: keep the minimum-publish-count candidates, ties kept
//!
//! Later stages assume the narrowing done by earlier ones, so the order is
//! fixed. Stages 1 and 2 terminate the pipeline when they empty the set;
//! stage 3 falls back to its input instead. If more than one candidate
//! survives all five stages the final pick is uniform random, through an
//! injected RNG so tests can pin the outcome.

pub mod error;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Account, Candidate};
use crate::schedule::civil;

pub use error::{SelectError, SelectResult};

/// Five-stage candidate selection with an injected randomness source
pub struct CandidatePipeline<R: Rng> {
    rng: R,

    /// Staleness window applied when an account has none of its own
    default_term_days: i64,
}

impl CandidatePipeline<StdRng> {
    /// Create a pipeline seeded from OS entropy
    pub fn new(default_term_days: i64) -> Self {
        Self::with_rng(StdRng::from_entropy(), default_term_days)
    }
}

impl<R: Rng> CandidatePipeline<R> {
    /// Create a pipeline with an explicit randomness source
    pub fn with_rng(rng: R, default_term_days: i64) -> Self {
        Self {
            rng,
            default_term_days,
        }
    }

    /// Narrow `backlog` to one candidate for `account`, evaluated at `now`.
    ///
    /// Deterministic through stage 5 for a fixed backlog; only the final
    /// pick among tied survivors consults the RNG.
    pub fn select(
        &mut self,
        account: &Account,
        backlog: &[Candidate],
        now: DateTime<Utc>,
    ) -> SelectResult<Candidate> {
        let survivors = by_owner(account, backlog)?;
        tracing::debug!(account = %account.id, survivors = survivors.len(), "ownership stage");

        let cutoff = now - Duration::days(account.effective_term_days(self.default_term_days));
        let survivors = by_staleness(account, survivors, cutoff)?;
        tracing::debug!(account = %account.id, survivors = survivors.len(), "staleness stage");

        let survivors = by_reviewed(survivors);
        let survivors = by_priority(survivors);
        let survivors = by_count(survivors);
        tracing::debug!(account = %account.id, survivors = survivors.len(), "tie-break stages");

        let picked = self.pick_one(account, survivors)?;
        verify_owner(account, picked)?;

        Ok(picked.clone())
    }

    /// Final pick: sole survivor directly, uniform random otherwise
    fn pick_one<'a>(
        &mut self,
        account: &Account,
        survivors: Vec<&'a Candidate>,
    ) -> SelectResult<&'a Candidate> {
        match survivors.len() {
            0 => Err(SelectError::none_remaining(&account.id)),
            1 => Ok(survivors[0]),
            n => Ok(survivors[self.rng.gen_range(0..n)]),
        }
    }
}

/// Stage 1: keep candidates owned by the account.
fn by_owner<'a>(account: &Account, backlog: &'a [Candidate]) -> SelectResult<Vec<&'a Candidate>> {
    let survivors: Vec<&Candidate> = backlog
        .iter()
        .filter(|c| c.account_id == account.id)
        .collect();

    if survivors.is_empty() {
        return Err(SelectError::none_for_account(&account.id));
    }
    Ok(survivors)
}

/// Stage 2: keep candidates last published strictly before `cutoff`.
///
/// A candidate that was never published always passes. A non-empty
/// timestamp that fails civil-time parsing drops the candidate for this
/// tick with a warning; the row needs operator attention, not an abort.
fn by_staleness<'a>(
    account: &Account,
    input: Vec<&'a Candidate>,
    cutoff: DateTime<Utc>,
) -> SelectResult<Vec<&'a Candidate>> {
    let mut survivors = Vec::with_capacity(input.len());

    for candidate in input {
        match candidate.last_published.as_deref() {
            None => survivors.push(candidate),
            Some(stored) => match civil::to_instant(stored) {
                Ok(published_at) if published_at < cutoff => survivors.push(candidate),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        account = %account.id,
                        row = candidate.row,
                        stored = %stored,
                        error = %err,
                        "unparseable last-published timestamp, candidate dropped"
                    );
                }
            },
        }
    }

    if survivors.is_empty() {
        return Err(SelectError::none_fresh(&account.id));
    }
    Ok(survivors)
}

/// Stage 3: keep reviewed candidates, or pass the input through when that
/// would empty the set. Review narrows when it can but never terminates.
fn by_reviewed(input: Vec<&Candidate>) -> Vec<&Candidate> {
    let reviewed: Vec<&Candidate> = input.iter().copied().filter(|c| c.reviewed).collect();

    if reviewed.is_empty() {
        input
    } else {
        reviewed
    }
}

/// Stage 4: keep the maximum-priority candidates, ties kept.
fn by_priority(input: Vec<&Candidate>) -> Vec<&Candidate> {
    if input.len() <= 1 {
        return input;
    }

    let top = input.iter().map(|c| c.priority).max().unwrap_or_default();
    input.into_iter().filter(|c| c.priority == top).collect()
}

/// Stage 5: keep the minimum-publish-count candidates, ties kept.
///
/// Biases selection toward the least-repeated content.
fn by_count(input: Vec<&Candidate>) -> Vec<&Candidate> {
    if input.len() <= 1 {
        return input;
    }

    let low = input
        .iter()
        .map(|c| c.publish_count)
        .min()
        .unwrap_or_default();
    input.into_iter().filter(|c| c.publish_count == low).collect()
}

/// Post-selection consistency check: the pick must belong to the account.
fn verify_owner(account: &Account, picked: &Candidate) -> SelectResult<()> {
    if picked.account_id != account.id {
        return Err(SelectError::OwnerMismatch {
            account: account.id.clone(),
            candidate_account: picked.account_id.clone(),
            row: picked.row,
        });
    }
    Ok(())
}
