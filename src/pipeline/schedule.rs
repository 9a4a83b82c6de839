// src/pipeline/schedule.rs

//! Daily trigger for the archival cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::utils::Clock;

use super::archive::Archiver;

/// A fixed wall-clock time each day in a named timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    /// The archival schedule: 00:05 every day.
    pub fn nightly(tz: Tz) -> Self {
        Self {
            at: NaiveTime::default() + TimeDelta::minutes(5),
            tz,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = now.with_timezone(&self.tz).date_naive();
        loop {
            if let Some(run) = self.run_on(date).filter(|run| *run > now) {
                return run;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => return now + TimeDelta::days(1),
            }
        }
    }

    /// Scheduled instant on a local date. A time skipped by a DST jump
    /// runs an hour later; a repeated time runs at its first occurrence.
    fn run_on(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(self.at);
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| self.tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
            .map(|run| run.with_timezone(&Utc))
    }
}

/// Run one cycle now, then one at every scheduled time, forever.
///
/// Failures are logged and never stop the loop; the next scheduled run is
/// the only retry.
pub fn spawn_scheduler(
    archiver: Arc<Archiver>,
    schedule: DailySchedule,
    clock: Arc<dyn Clock>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = archiver.run_cycle().await {
            log::error!("[startup] Initial snapshot failed: {}", e);
        }

        loop {
            let now = clock.now();
            let next = schedule.next_run_after(now);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            log::info!(
                "Next archival cycle at {}",
                next.with_timezone(&schedule.timezone()).to_rfc3339()
            );
            tokio::time::sleep(wait).await;

            if let Err(e) = archiver.run_cycle().await {
                log::error!("Scheduled archival cycle failed: {}", e);
            }
        }
    })
}
