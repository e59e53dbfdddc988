//! Background sweep scheduler.
//!
//! [`run_scheduler`] wakes on a fixed interval and runs [`run_sweep`], which
//! updates every farmer in turn. The same per-user routine also runs on
//! foreground reads, so a sweep that overlaps a read is harmless.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::store::FarmStore;
use crate::tick::Engine;

/// Totals for one sweep over every farmer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Farmers whose update completed.
    pub users_updated: u32,
    /// Farmers whose update failed outright.
    pub users_failed: u32,
    /// Plots whose stage advanced.
    pub stages_advanced: u32,
    /// Fruit spawned.
    pub fruit_spawned: u32,
    /// Plots or fruit skipped after a failure.
    pub skipped: u32,
}

/// Why the scheduler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEnd {
    /// The shutdown future resolved.
    Shutdown,
    /// The configured sweep limit was reached.
    MaxSweeps,
}

/// Result of a scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerResult {
    /// Why the scheduler stopped.
    pub end: SchedulerEnd,
    /// Sweeps completed.
    pub sweeps: u64,
}

/// Update every farmer once at `now`.
///
/// A farmer whose update fails is logged and counted; the sweep carries on
/// with the next one. If the farmer list itself cannot be read the sweep
/// does nothing.
pub async fn run_sweep<S: FarmStore>(engine: &Engine<S>, now: DateTime<Utc>) -> SweepSummary {
    let mut summary = SweepSummary::default();
    let users = match engine.store().list_user_ids().await {
        Ok(users) => users,
        Err(err) => {
            warn!(%err, "Could not list farmers, skipping sweep");
            return summary;
        }
    };

    for user in users {
        match engine.update_user(user, now).await {
            Ok(update) => {
                summary.users_updated = summary.users_updated.saturating_add(1);
                summary.stages_advanced = summary.stages_advanced.saturating_add(update.stages_advanced);
                summary.fruit_spawned = summary.fruit_spawned.saturating_add(update.fruit_spawned);
                summary.skipped = summary.skipped.saturating_add(update.skipped);
            }
            Err(err) => {
                warn!(%user, %err, "Farmer update failed");
                summary.users_failed = summary.users_failed.saturating_add(1);
            }
        }
    }

    info!(
        users_updated = summary.users_updated,
        users_failed = summary.users_failed,
        stages_advanced = summary.stages_advanced,
        fruit_spawned = summary.fruit_spawned,
        skipped = summary.skipped,
        "Sweep complete"
    );
    summary
}

/// Run sweeps every `interval` until `shutdown` resolves or `max_sweeps`
/// sweeps have run.
///
/// The first sweep runs immediately. Ticks missed while a slow sweep is
/// running are dropped rather than replayed.
pub async fn run_scheduler<S, F>(
    engine: &Engine<S>,
    interval: Duration,
    max_sweeps: Option<u64>,
    shutdown: F,
) -> SchedulerResult
where
    S: FarmStore,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut sweeps: u64 = 0;
    info!(interval_ms = interval.as_millis(), ?max_sweeps, "Scheduler starting");

    let end = loop {
        if max_sweeps.is_some_and(|max| sweeps >= max) {
            break SchedulerEnd::MaxSweeps;
        }
        tokio::select! {
            () = &mut shutdown => break SchedulerEnd::Shutdown,
            _ = ticker.tick() => {
                let _ = run_sweep(engine, Utc::now()).await;
                sweeps = sweeps.saturating_add(1);
            }
        }
    };

    info!(sweeps, ?end, "Scheduler stopped");
    SchedulerResult { end, sweeps }
}
