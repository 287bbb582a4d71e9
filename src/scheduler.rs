// =============================================================================
// Scheduler — activity-windowed, interval-driven job table
// =============================================================================
//
// A data-driven schedule table instead of hardcoded per-job loops. A schedule
// cannot have two concurrent executions; an in-flight run coalesces further
// due ticks until it completes.
// =============================================================================

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, Utc, Weekday};
use chrono_tz::Europe::Warsaw;
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Calendar;
use crate::types::{ScheduleExecution, ScheduleKind};

/// Monday = bit 0 .. Sunday = bit 6.
pub type ActiveDays = u8;
pub const ALL_DAYS: ActiveDays = 0b0111_1111;
pub const WEEKDAYS: ActiveDays = 0b0001_1111;

fn day_bit(weekday: Weekday) -> u8 {
    1 << weekday.num_days_from_monday()
}

pub struct ScheduleConfig {
    pub kind: ScheduleKind,
    pub interval_minutes: u32,
    pub active_hours: Option<(NaiveTime, NaiveTime)>,
    pub active_days: ActiveDays,
    pub respect_holidays: bool,
}

struct ScheduleState {
    config: ScheduleConfig,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: DateTime<Utc>,
    running: bool,
}

pub struct Scheduler {
    schedules: Mutex<Vec<ScheduleState>>,
    calendar: Calendar,
}

/// A permit for one schedule's execution window. Dropping it without calling
/// `complete` leaves the schedule marked running forever, so callers must
/// always pair `due()` with `complete()`.
pub struct RunPermit {
    pub index: usize,
    pub kind: ScheduleKind,
    pub started_at: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(calendar: Calendar, configs: Vec<ScheduleConfig>, now: DateTime<Utc>) -> Self {
        let schedules = configs
            .into_iter()
            .map(|config| ScheduleState {
                next_run_at: now,
                config,
                last_run_at: None,
                running: false,
            })
            .collect();

        Self {
            schedules: Mutex::new(schedules),
            calendar,
        }
    }

    /// Reports each schedule's kind, last run (if any), and next scheduled
    /// run, for operator visibility without mutating any state.
    pub fn statuses(&self) -> Vec<(ScheduleKind, Option<DateTime<Utc>>, DateTime<Utc>)> {
        self.schedules
            .lock()
            .iter()
            .map(|s| (s.config.kind, s.last_run_at, s.next_run_at))
            .collect()
    }

    /// Returns the set of schedules due to run at `now`, marking each
    /// returned schedule as running so a concurrent tick cannot double-fire
    /// it. Failure of one schedule never affects this selection for others.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<RunPermit> {
        let mut schedules = self.schedules.lock();
        let mut permits = Vec::new();

        for (index, state) in schedules.iter_mut().enumerate() {
            if state.running {
                continue;
            }
            if state.next_run_at <= now {
                state.running = true;
                permits.push(RunPermit { index, kind: state.config.kind, started_at: now });
            }
        }

        permits
    }

    /// Records the outcome of a run and advances `nextRunAt` to the next
    /// active-window boundary.
    pub fn complete(
        &self,
        permit: RunPermit,
        finished_at: DateTime<Utc>,
        items_processed: usize,
        error: Option<(String, String)>,
    ) -> ScheduleExecution {
        let mut schedules = self.schedules.lock();
        let state = &mut schedules[permit.index];

        let duration_ms = (finished_at - permit.started_at).num_milliseconds().max(0) as u64;
        state.last_run_at = Some(finished_at);
        state.next_run_at = next_run_after(
            finished_at,
            state.config.interval_minutes,
            state.config.active_hours,
            state.config.active_days,
            state.config.respect_holidays,
            &self.calendar,
        );
        state.running = false;

        let (error_message, error_kind) = match error {
            Some((msg, kind)) => (Some(msg), Some(kind)),
            None => (None, None),
        };

        if error_message.is_some() {
            warn!(kind = ?permit.kind, error = ?error_message, "schedule run failed");
        } else {
            info!(kind = ?permit.kind, items_processed, duration_ms, "schedule run complete");
        }

        ScheduleExecution {
            id: Uuid::new_v4().to_string(),
            kind: permit.kind,
            started_at: permit.started_at,
            duration_ms,
            items_processed,
            error: error_message,
            error_kind,
        }
    }
}

/// Advances from `after` by `interval_minutes`, then skips forward in
/// `interval_minutes` steps until the candidate instant's Warsaw-local time
/// falls within `active_days`/`active_hours` and (if `respect_holidays`) on a
/// trading day. Bounded to two weeks of steps to guarantee termination even
/// for a degenerate all-holiday configuration.
fn next_run_after(
    after: DateTime<Utc>,
    interval_minutes: u32,
    active_hours: Option<(NaiveTime, NaiveTime)>,
    active_days: ActiveDays,
    respect_holidays: bool,
    calendar: &Calendar,
) -> DateTime<Utc> {
    let step = ChronoDuration::minutes(interval_minutes.max(1) as i64);
    let mut candidate = after + step;
    let max_steps = (14 * 24 * 60) / interval_minutes.max(1) as i64;

    for _ in 0..max_steps {
        let local = candidate.with_timezone(&Warsaw);
        let date = local.date_naive();
        let day_ok = active_days & day_bit(local.weekday()) != 0;
        let hours_ok = active_hours.map_or(true, |(open, close)| {
            let t = local.time();
            t >= open && t <= close
        });
        let holiday_ok = !respect_holidays || calendar.is_trading_day(date);

        if day_ok && hours_ok && holiday_ok {
            return candidate;
        }
        candidate += step;
    }

    candidate
}
