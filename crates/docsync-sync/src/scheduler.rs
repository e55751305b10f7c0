//! Sync scheduler - periodic runs of the [`LinkRunner`]
//!
//! Two modes:
//!
//! - [`Schedule::Interval`]: run, then wait the interval, repeat.
//! - [`Schedule::Daily`]: wait until the next occurrence of a local time of
//!   day, then run, repeat.
//!
//! The [`CancellationToken`] interrupts a wait immediately. During a run it
//! is checked by the runner between links only, so an in-progress link
//! always completes its walk.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use docsync_core::config::{parse_time_of_day, ScheduleConfig};

use crate::runner::LinkRunner;
use crate::SyncError;

/// When periodic runs happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Interval(Duration),
    Daily(NaiveTime),
}

impl Schedule {
    /// Builds a schedule from the `schedule` configuration section
    ///
    /// # Errors
    ///
    /// `SyncError::InvalidSchedule` for an unknown mode, a zero interval or
    /// an unparsable `daily_at`.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, SyncError> {
        match config.mode.as_str() {
            "interval" => {
                if config.interval_secs == 0 {
                    return Err(SyncError::InvalidSchedule(
                        "interval_secs must be greater than zero".to_string(),
                    ));
                }
                Ok(Schedule::Interval(Duration::from_secs(config.interval_secs)))
            }
            "daily" => parse_time_of_day(&config.daily_at)
                .map(Schedule::Daily)
                .ok_or_else(|| {
                    SyncError::InvalidSchedule(format!(
                        "daily_at must be HH:MM, got '{}'",
                        config.daily_at
                    ))
                }),
            other => Err(SyncError::InvalidSchedule(format!(
                "unknown schedule mode '{other}'"
            ))),
        }
    }

    /// Time from `now` until the next `at`; a time already passed today means tomorrow
    pub fn delay_until(now: NaiveDateTime, at: NaiveTime) -> Duration {
        let today = now.date().and_time(at);
        let target = if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        };
        (target - now).to_std().unwrap_or(Duration::ZERO)
    }

    fn delay_before_run(&self) -> Option<Duration> {
        match self {
            Schedule::Interval(_) => None,
            Schedule::Daily(at) => Some(Self::delay_until(Local::now().naive_local(), *at)),
        }
    }

    fn delay_after_run(&self) -> Option<Duration> {
        match self {
            Schedule::Interval(every) => Some(*every),
            Schedule::Daily(_) => None,
        }
    }
}

/// Drives a [`LinkRunner`] on a [`Schedule`] until cancelled
pub struct SyncScheduler {
    runner: Arc<LinkRunner>,
    schedule: Schedule,
    cancel: CancellationToken,
}

impl SyncScheduler {
    pub fn new(runner: Arc<LinkRunner>, schedule: Schedule, cancel: CancellationToken) -> Self {
        info!(?schedule, "Creating sync scheduler");
        Self {
            runner,
            schedule,
            cancel,
        }
    }

    /// Token that stops the scheduler
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until cancelled; returns the number of runs started
    pub async fn run(&self) -> usize {
        info!("Sync scheduler starting");
        let mut runs = 0;

        loop {
            if let Some(delay) = self.schedule.delay_before_run() {
                if !self.wait(delay).await {
                    break;
                }
            }
            if self.cancel.is_cancelled() {
                break;
            }

            runs += 1;
            match self.runner.run(&self.cancel).await {
                Ok(run) => info!(run = runs, summary = %run.summary(), "Scheduled run complete"),
                Err(e) => error!(run = runs, error = %e, "Scheduled run failed"),
            }

            if let Some(delay) = self.schedule.delay_after_run() {
                if !self.wait(delay).await {
                    break;
                }
            }
        }

        info!(runs, "Sync scheduler stopped");
        runs
    }

    /// Sleeps for `delay`; false when cancelled first
    async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
