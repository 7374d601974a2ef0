//! Periodic tick driver and per-tick execution
//!
//! A fixed-cadence driver, aligned so the first fire lands on an interval
//! boundary. Each fire dispatches the tick body onto its own task, so a
//! slow tick never delays the next fire; missed ticks are skipped, never
//! replayed. Within a tick, each due account is processed independently:
//! a filter miss, a throttle, or a transport failure for one account is
//! logged and the rest continue.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use rand::Rng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::models::Account;
use crate::publisher::{PostRef, PublishError, PublishRouter};
use crate::schedule::{self, civil};
use crate::selector::CandidatePipeline;
use crate::source::{BacklogSource, ResultSink, RosterSource, TrailingFields};

/// Everything one tick needs, shared by reference with spawned tick tasks
pub struct TickContext {
    /// Staleness window for accounts without their own
    pub default_term_days: i64,

    /// Upper bound of the random pre-publish delay; zero disables it
    pub max_jitter_secs: u64,

    pub roster: Arc<dyn RosterSource>,
    pub backlog: Arc<dyn BacklogSource>,
    pub sink: Arc<dyn ResultSink>,
    pub router: Arc<PublishRouter>,
}

/// The periodic driver
pub struct TickRunner {
    ctx: Arc<TickContext>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TickRunner {
    pub fn new(interval: Duration, ctx: Arc<TickContext>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        Self {
            ctx,
            interval,
            shutdown,
            shutdown_rx,
        }
    }

    /// Signal the driver to stop after the current fire
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run until stopped. Fires every interval; tick work is spawned and
    /// allowed to run to completion even when the next fire arrives.
    pub async fn run(&self) -> Result<()> {
        let initial_wait = alignment_wait(Local::now().timestamp_millis(), self.interval);
        tracing::info!(wait_ms = initial_wait.as_millis() as u64, "waiting for interval boundary");

        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(initial_wait) => {}
            _ = shutdown_rx.changed() => return Ok(()),
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let ctx = self.ctx.clone();
                    let wall = Local::now().naive_local();
                    let instant = Utc::now();
                    tokio::spawn(async move {
                        execute_tick(ctx, wall, instant).await;
                    });
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("tick driver shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Milliseconds to sleep so the next fire lands on an interval boundary
fn alignment_wait(now_millis: i64, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis() as i64;
    if interval_ms == 0 {
        return Duration::ZERO;
    }
    let into = now_millis.rem_euclid(interval_ms);
    Duration::from_millis((interval_ms - into) as u64)
}

/// One tick: match the roster, then publish for each due account.
///
/// `wall` drives due-matching, `instant` anchors the staleness cutoff.
pub async fn execute_tick(ctx: Arc<TickContext>, wall: NaiveDateTime, instant: DateTime<Utc>) {
    let accounts = match ctx.roster.accounts().await {
        Ok(accounts) => accounts,
        Err(err) => {
            tracing::error!(error = %err, "failed to load roster, tick skipped");
            return;
        }
    };

    let due = schedule::due_accounts(&wall, &accounts);
    if due.is_empty() {
        tracing::trace!("no accounts due");
        return;
    }
    tracing::info!(due = due.len(), "tick processing due accounts");

    // Accounts carry no shared mutable state besides the gate, which
    // serializes itself; their publishes can overlap freely
    let ctx = &ctx;
    let attempts = due
        .iter()
        .map(|account| async move { (*account, publish_for_account(ctx, account, instant).await) });

    for (account, result) in futures::future::join_all(attempts).await {
        match result {
            Ok(Some(post)) => {
                tracing::info!(account = %account.id, post = %post.0, "published");
            }
            Ok(None) => {
                tracing::info!(account = %account.id, "published via interactive path");
            }
            Err(err) => log_account_failure(account, &err),
        }
    }
}

/// Select, publish, and record for one due account.
pub async fn publish_for_account(
    ctx: &TickContext,
    account: &Account,
    now: DateTime<Utc>,
) -> Result<Option<PostRef>> {
    let backlog = ctx.backlog.backlog(account).await?;

    let mut pipeline = CandidatePipeline::new(ctx.default_term_days);
    let mut candidate = pipeline.select(account, &backlog, now)?;
    tracing::debug!(account = %account.id, row = candidate.row, "candidate selected");

    jitter_wait(ctx.max_jitter_secs).await;

    let post = ctx.router.publish(account, &candidate).await?;

    let stamp = civil::format_instant(Utc::now());
    candidate.mark_published(stamp.clone());

    let fields = TrailingFields {
        publish_count: candidate.publish_count,
        post_ref: post.as_ref().map(|p| p.0.clone()),
        last_published: stamp,
    };
    if let Err(err) = ctx
        .sink
        .write_trailing_fields(account, candidate.row, fields)
        .await
    {
        // The publish itself succeeded; the store is now behind. Surfaced
        // for the operator, never retried within the tick.
        tracing::warn!(
            account = %account.id,
            row = candidate.row,
            error = %err,
            "published but write-back failed"
        );
    }

    Ok(post)
}

/// Random delay before publishing, de-correlating accounts that share a
/// due minute.
async fn jitter_wait(max_secs: u64) {
    if max_secs == 0 {
        return;
    }
    let millis = rand::thread_rng().gen_range(0..max_secs * 1000);
    tracing::debug!(wait_ms = millis, "pre-publish jitter");
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

fn log_account_failure(account: &Account, err: &Error) {
    match err {
        Error::Select(sel) if sel.is_defect() => {
            tracing::error!(account = %account.id, error = %sel, "selection consistency defect");
        }
        Error::Select(sel) => {
            tracing::info!(account = %account.id, reason = %sel, "no candidate this tick");
        }
        Error::Publish(PublishError::Throttled(t)) => {
            tracing::info!(account = %account.id, reason = %t, "throttled, deferred to next due tick");
        }
        Error::Publish(PublishError::DryRun) => {
            tracing::info!(account = %account.id, "dry run, nothing published");
        }
        other => {
            tracing::warn!(account = %account.id, error = %other, "publish attempt failed");
        }
    }
}
