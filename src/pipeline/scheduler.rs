// src/pipeline/scheduler.rs

//! Tick scheduling.
//!
//! One ticker drives the ingest pipeline; a gate keeps ticks inside
//! business hours, non-reentrant, and backed off after failures. Two
//! peripheral chores share the loop: a 5-minute durable-view snapshot
//! and a daily 02:00 cleanup placeholder.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Timelike, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::{CourtSnapshot, TickReport};
use crate::pipeline::tick::TickRunner;
use crate::storage::CourtStore;

/// Upper bound on a tick's runtime; reentry is locked out this long.
pub const MAX_EXPECTED_RUNTIME_SECS: i64 = 25;

/// How long to stand down after a failed tick.
pub const ERROR_BACKOFF_SECS: i64 = 120;

/// Local hours during which the board is scraped (inclusive).
pub const BUSINESS_HOURS: std::ops::RangeInclusive<u32> = 10..=17;

/// Interval between durable-view snapshots.
pub const SNAPSHOT_INTERVAL_SECS: u64 = 300;

/// Whether the local hour falls inside scraping hours.
pub fn within_business_hours(hour: u32) -> bool {
    BUSINESS_HOURS.contains(&hour)
}

/// Reentrancy lock and error backoff, evaluated at ticker fire time.
#[derive(Debug, Default)]
pub struct TickGate {
    lock_until: Option<DateTime<Utc>>,
    backoff_until: Option<DateTime<Utc>>,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three gate conditions: business hours, not locked, not in
    /// backoff.
    pub fn should_run(&self, now: DateTime<Utc>, local_hour: u32) -> bool {
        within_business_hours(local_hour)
            && self.lock_until.map_or(true, |until| now >= until)
            && self.backoff_until.map_or(true, |until| now >= until)
    }

    /// Take the lock before running a tick.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.lock_until = Some(now + Duration::seconds(MAX_EXPECTED_RUNTIME_SECS));
    }

    /// Release the lock; a failed tick also arms the backoff.
    pub fn complete(&mut self, now: DateTime<Utc>, ok: bool) {
        if !ok {
            self.backoff_until = Some(now + Duration::seconds(ERROR_BACKOFF_SECS));
        }
        self.lock_until = None;
    }
}

/// Time until the next 02:00 local cleanup run.
fn next_cleanup_delay(now: DateTime<Local>) -> std::time::Duration {
    let today = now
        .date_naive()
        .and_hms_opt(2, 0, 0)
        .expect("02:00 is a valid time");
    let next = if now.naive_local() < today {
        today
    } else {
        today + Duration::days(1)
    };
    (next - now.naive_local())
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60))
}

/// Drives the tick runner on a fixed interval until cancelled.
pub struct Scheduler {
    runner: TickRunner,
    courts: Arc<dyn CourtStore>,
    gate: TickGate,
    interval: std::time::Duration,
}

impl Scheduler {
    pub fn new(
        runner: TickRunner,
        courts: Arc<dyn CourtStore>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            runner,
            courts,
            gate: TickGate::new(),
            interval,
        }
    }

    /// Run until the token is cancelled. An in-flight tick finishes
    /// before the loop exits; the caller bounds the drain.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut snapshot = tokio::time::interval(std::time::Duration::from_secs(
            SNAPSHOT_INTERVAL_SECS,
        ));
        snapshot.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let cleanup = tokio::time::sleep(next_cleanup_delay(Local::now()));
        tokio::pin!(cleanup);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.fire().await,
                _ = snapshot.tick() => self.write_snapshot().await,
                () = &mut cleanup => {
                    run_cleanup();
                    cleanup
                        .as_mut()
                        .reset(tokio::time::Instant::now() + next_cleanup_delay(Local::now()));
                }
                _ = cancel.cancelled() => {
                    log::info!("scheduler shutting down");
                    break;
                }
            }
        }
    }

    async fn fire(&mut self) {
        let now = Utc::now();
        let hour = Local::now().hour();
        if !self.gate.should_run(now, hour) {
            log::debug!("tick gated (hour {hour})");
            return;
        }

        self.gate.begin(now);
        let result = self.runner.run_tick().await;
        match &result {
            Ok(TickReport::Skipped) => log::debug!("tick skipped (not modified)"),
            Ok(TickReport::Completed(_)) => {}
            Err(e) => log::error!(
                "tick failed: {e}; backing off {ERROR_BACKOFF_SECS}s"
            ),
        }
        self.gate.complete(Utc::now(), result.is_ok());
    }

    async fn write_snapshot(&self) {
        let now = Utc::now();
        match self.courts.load_records().await {
            Ok(courts) => {
                if courts.is_empty() {
                    return;
                }
                let snapshot = CourtSnapshot {
                    captured_at: now,
                    courts,
                };
                if let Err(e) = self.courts.write_snapshot(snapshot).await {
                    log::warn!("snapshot write failed: {e}");
                }
            }
            Err(e) => log::warn!("snapshot read failed: {e}"),
        }
    }
}

/// Daily cleanup. Row expiry is handled by store-side TTL indexes.
fn run_cleanup() {
    log::info!("daily cleanup: nothing to do (TTL indexes handle expiry)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const WORK_HOUR: u32 = 12;

    #[test]
    fn test_business_hours_boundaries() {
        assert!(!within_business_hours(9));
        assert!(within_business_hours(10));
        assert!(within_business_hours(17));
        assert!(!within_business_hours(18));
        assert!(!within_business_hours(2));
    }

    #[test]
    fn test_gate_blocks_outside_business_hours() {
        let gate = TickGate::new();
        assert!(!gate.should_run(Utc::now(), 9));
        assert!(gate.should_run(Utc::now(), WORK_HOUR));
    }

    #[test]
    fn test_lock_prevents_reentry_until_cleared() {
        let mut gate = TickGate::new();
        let t0 = Utc::now();
        gate.begin(t0);
        // A second fire during the expected runtime is gated.
        assert!(!gate.should_run(t0 + Duration::seconds(5), WORK_HOUR));
        // Even a deadlocked tick frees the lock after the bound.
        assert!(gate.should_run(
            t0 + Duration::seconds(MAX_EXPECTED_RUNTIME_SECS),
            WORK_HOUR
        ));
        // Normal completion clears it immediately.
        gate.complete(t0 + Duration::seconds(3), true);
        assert!(gate.should_run(t0 + Duration::seconds(4), WORK_HOUR));
    }

    #[test]
    fn test_failure_arms_two_minute_backoff() {
        let mut gate = TickGate::new();
        let t0 = Utc::now();
        gate.begin(t0);
        gate.complete(t0 + Duration::seconds(1), false);

        // Fire opportunities within the backoff window are skipped.
        assert!(!gate.should_run(t0 + Duration::seconds(31), WORK_HOUR));
        assert!(!gate.should_run(t0 + Duration::seconds(91), WORK_HOUR));
        // The first opportunity at or past two minutes runs.
        assert!(gate.should_run(
            t0 + Duration::seconds(1 + ERROR_BACKOFF_SECS),
            WORK_HOUR
        ));
    }

    #[test]
    fn test_success_does_not_arm_backoff() {
        let mut gate = TickGate::new();
        let t0 = Utc::now();
        gate.begin(t0);
        gate.complete(t0 + Duration::seconds(1), true);
        assert!(gate.should_run(t0 + Duration::seconds(2), WORK_HOUR));
    }

    #[test]
    fn test_next_cleanup_delay() {
        let before = Local.with_ymd_and_hms(2026, 8, 2, 1, 0, 0).unwrap();
        assert_eq!(
            next_cleanup_delay(before),
            std::time::Duration::from_secs(3600)
        );
        let after = Local.with_ymd_and_hms(2026, 8, 2, 3, 0, 0).unwrap();
        assert_eq!(
            next_cleanup_delay(after),
            std::time::Duration::from_secs(23 * 3600)
        );
    }
}
