// Pure scheduling rules: timer windows and the once-per-day start/stop decision.

use crate::models::Timer;
use chrono::{Datelike, NaiveDateTime, TimeDelta};

/// True if `now` (wall-clock time in the scheduler's timezone) falls inside the
/// timer's window anchored on today or on yesterday. Windows whose stop time is
/// not after the start time end on the following day.
pub fn is_timer_active_now(timer: &Timer, now: NaiveDateTime) -> bool {
    let Some((start, stop)) = timer.window() else {
        return false;
    };
    let today = now.date();
    [Some(today), today.pred_opt()]
        .into_iter()
        .flatten()
        .any(|anchor| {
            if !timer.runs_on(anchor.weekday().num_days_from_sunday()) {
                return false;
            }
            let start_at = anchor.and_time(start);
            let mut stop_at = anchor.and_time(stop);
            if stop_at <= start_at {
                stop_at += TimeDelta::days(1);
            }
            start_at <= now && now < stop_at
        })
}

/// Per-container record of which decisions were already made on a given day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayFlags {
    pub started_day: Option<String>,
    pub stopped_day: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start if not running, then record today's start decision.
    EnsureStarted,
    /// Stop if running, then record today's stop decision.
    EnsureStopped,
    Nothing,
}

/// Stop decisions only follow a start decision made the same day, so a container
/// started by hand before the scheduler claimed it is left alone.
pub fn decide(should_run: bool, flags: &DayFlags, today: &str) -> Decision {
    let started_today = flags.started_day.as_deref() == Some(today);
    let stopped_today = flags.stopped_day.as_deref() == Some(today);
    match (should_run, started_today, stopped_today) {
        (true, false, _) => Decision::EnsureStarted,
        (true, true, _) => Decision::Nothing,
        (false, false, _) => Decision::Nothing,
        (false, true, false) => Decision::EnsureStopped,
        (false, true, true) => Decision::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timer(start: &str, stop: &str, days: &[u8]) -> Timer {
        Timer {
            start_time: start.into(),
            stop_time: stop.into(),
            days: days.iter().map(|d| i64::from(*d)).collect(),
            active: Some(true),
        }
    }

    // 2024-01-01 is a Monday.
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn same_day_window_is_half_open() {
        let t = timer("09:00", "17:00", &[1]);
        assert!(!is_timer_active_now(&t, at(1, 8, 59)));
        assert!(is_timer_active_now(&t, at(1, 9, 0)));
        assert!(is_timer_active_now(&t, at(1, 16, 59)));
        assert!(!is_timer_active_now(&t, at(1, 17, 0)));
    }

    #[test]
    fn window_only_on_listed_days() {
        let t = timer("09:00", "17:00", &[1]);
        assert!(!is_timer_active_now(&t, at(2, 10, 0)));
    }

    #[test]
    fn cross_midnight_window_started_yesterday() {
        let t = timer("22:00", "06:00", &[1]);
        assert!(is_timer_active_now(&t, at(1, 23, 0)));
        // Tuesday 02:00 belongs to Monday's window.
        assert!(is_timer_active_now(&t, at(2, 2, 0)));
        assert!(!is_timer_active_now(&t, at(2, 6, 0)));
        // Tuesday is not listed, so Tuesday evening stays off.
        assert!(!is_timer_active_now(&t, at(2, 23, 0)));
    }

    #[test]
    fn equal_start_and_stop_spans_a_full_day() {
        let t = timer("08:00", "08:00", &[1]);
        assert!(is_timer_active_now(&t, at(1, 8, 0)));
        assert!(is_timer_active_now(&t, at(2, 7, 59)));
        assert!(!is_timer_active_now(&t, at(2, 8, 0)));
    }

    #[test]
    fn malformed_times_never_match() {
        let t = timer("nine", "17:00", &[0, 1, 2, 3, 4, 5, 6]);
        assert!(!is_timer_active_now(&t, at(1, 10, 0)));
    }

    #[test]
    fn decide_follows_day_flags() {
        let today = "2024-01-01";
        let fresh = DayFlags::default();
        assert_eq!(decide(true, &fresh, today), Decision::EnsureStarted);
        assert_eq!(decide(false, &fresh, today), Decision::Nothing);

        let started = DayFlags {
            started_day: Some(today.into()),
            stopped_day: None,
        };
        assert_eq!(decide(true, &started, today), Decision::Nothing);
        assert_eq!(decide(false, &started, today), Decision::EnsureStopped);

        let both = DayFlags {
            started_day: Some(today.into()),
            stopped_day: Some(today.into()),
        };
        assert_eq!(decide(false, &both, today), Decision::Nothing);

        let yesterday = DayFlags {
            started_day: Some("2023-12-31".into()),
            stopped_day: Some("2023-12-31".into()),
        };
        assert_eq!(decide(true, &yesterday, today), Decision::EnsureStarted);
        assert_eq!(decide(false, &yesterday, today), Decision::Nothing);
    }
}
