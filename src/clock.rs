// =============================================================================
// Clock & Calendar — Warsaw session time and the GPW holiday table
// =============================================================================
//
// All persisted timestamps are UTC. Scheduling and session-boundary decisions
// are made in Europe/Warsaw local time via this module.
// =============================================================================

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Europe::Warsaw;

use crate::types::Session;

pub const SESSION_OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
pub const SESSION_CLOSE: NaiveTime = NaiveTime::from_hms_opt(17, 0, 0).unwrap();

/// Abstraction over wall-clock time so tests can pin `now()`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for deterministic session-boundary tests.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: std::sync::Arc<parking_lot::RwLock<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn at(t: DateTime<Utc>) -> Self {
        Self {
            inner: std::sync::Arc::new(parking_lot::RwLock::new(t)),
        }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.inner.write() = t;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.read()
    }
}

/// Warsaw trading calendar: session windows plus the Polish public-holiday
/// table. Easter-derived holidays are computed algorithmically so the table
/// never needs a per-year maintenance pass.
#[derive(Clone)]
pub struct Calendar {
    open_local: NaiveTime,
    close_local: NaiveTime,
    extra_holidays: Vec<NaiveDate>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            open_local: SESSION_OPEN,
            close_local: SESSION_CLOSE,
            extra_holidays: Vec::new(),
        }
    }
}

impl Calendar {
    pub fn new(open_local: NaiveTime, close_local: NaiveTime, extra_holidays: Vec<NaiveDate>) -> Self {
        Self {
            open_local,
            close_local,
            extra_holidays,
        }
    }

    pub fn local_now(&self, clock: &dyn Clock) -> chrono::DateTime<chrono_tz::Tz> {
        clock.now().with_timezone(&Warsaw)
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        if self.extra_holidays.contains(&date) {
            return false;
        }
        !polish_holidays(date.year()).contains(&date)
    }

    pub fn current_session(&self, clock: &dyn Clock) -> Session {
        let local = self.local_now(clock);
        let date = local.date_naive();
        Session {
            date,
            open_local: self.open_local,
            close_local: self.close_local,
            is_trading_day: self.is_trading_day(date),
        }
    }

    pub fn is_in_session(&self, clock: &dyn Clock) -> bool {
        let local = self.local_now(clock);
        let date = local.date_naive();
        if !self.is_trading_day(date) {
            return false;
        }
        let t = local.time();
        t >= self.open_local && t <= self.close_local
    }

    /// UTC instant of a given local session date's close, used by the
    /// outcome tracker to recognise the last bar of a session.
    pub fn session_close_utc(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local_close = Warsaw.from_local_datetime(&date.and_time(self.close_local)).single()?;
        Some(local_close.with_timezone(&Utc))
    }
}

/// Anonymous Gregorian Easter algorithm (Meeus/Jones/Butcher). Returns the
/// Gregorian date of Easter Sunday for `year`.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).expect("valid easter date")
}

/// Fixed and Easter-derived Polish public holidays observed as GPW closures.
pub fn polish_holidays(year: i32) -> Vec<NaiveDate> {
    let easter = easter_sunday(year);
    let mut holidays = vec![
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(year, 1, 6).unwrap(),
        easter + chrono::Duration::days(1),
        NaiveDate::from_ymd_opt(year, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(year, 5, 3).unwrap(),
        easter + chrono::Duration::days(60),
        NaiveDate::from_ymd_opt(year, 8, 15).unwrap(),
        NaiveDate::from_ymd_opt(year, 11, 1).unwrap(),
        NaiveDate::from_ymd_opt(year, 11, 11).unwrap(),
        NaiveDate::from_ymd_opt(year, 12, 25).unwrap(),
        NaiveDate::from_ymd_opt(year, 12, 26).unwrap(),
    ];
    holidays.sort();
    holidays
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn easter_2026_is_april_5() {
        assert_eq!(easter_sunday(2026), NaiveDate::from_ymd_opt(2026, 4, 5).unwrap());
    }

    #[test]
    fn weekend_is_not_a_trading_day() {
        let cal = Calendar::default();
        let saturday = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert!(!cal.is_trading_day(saturday));
    }

    #[test]
    fn christmas_is_not_a_trading_day() {
        let cal = Calendar::default();
        assert!(!cal.is_trading_day(NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()));
    }

    #[test]
    fn ordinary_weekday_is_a_trading_day() {
        let cal = Calendar::default();
        assert!(cal.is_trading_day(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
    }

    #[test]
    fn extra_holiday_overrides_default_table() {
        let extra = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let cal = Calendar::new(SESSION_OPEN, SESSION_CLOSE, vec![extra]);
        assert!(!cal.is_trading_day(extra));
    }

    #[test]
    fn is_in_session_respects_fake_clock() {
        let cal = Calendar::default();
        let noon = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap(); // 11:30 Warsaw (CET+1 in winter / CEST+2 summer)
        let clock = FakeClock::at(noon);
        // Regardless of DST offset this instant falls inside 09:00-17:00 Warsaw.
        assert!(cal.is_in_session(&clock));

        let midnight = Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap();
        clock.set(midnight);
        assert!(!cal.is_in_session(&clock));
    }

    #[test]
    fn session_close_utc_resolves() {
        let cal = Calendar::default();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(cal.session_close_utc(date).is_some());
    }
}
