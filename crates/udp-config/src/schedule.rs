use chrono::{DateTime, Datelike, Timelike, Utc};

/// The run-schedule for a daemon's poll loop. Evaluation is pure: callers
/// ask `should_run` whether `now` is a tick worth acting on and sleep
/// themselves; this type never blocks.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub poll_frequency: Option<std::time::Duration>,
    pub daily_at: Vec<(u32, u32)>,
    pub hourly_at: Vec<u32>,
    pub skip_hours_of_day: Vec<u32>,
    pub skip_days_of_week: Vec<u32>,
    pub skip_days_of_month: Vec<u32>,
    pub skip_days_of_year: Vec<u32>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_skipped(&self, now: DateTime<Utc>) -> bool {
        self.skip_hours_of_day.contains(&now.hour())
            || self.skip_days_of_week.contains(&now.weekday().num_days_from_monday())
            || self.skip_days_of_month.contains(&now.day())
            || self.skip_days_of_year.contains(&now.ordinal())
    }

    /// Whether a poll tick at `now` (given the tick immediately before it
    /// was at `last_run`, or `None` if this is the first tick) should
    /// trigger work.
    pub fn should_run(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if self.is_skipped(now) {
            return false;
        }

        if !self.daily_at.is_empty() {
            return self
                .daily_at
                .iter()
                .any(|&(hour, minute)| crossed_time_of_day(last_run, now, hour, minute));
        }

        if !self.hourly_at.is_empty() {
            return self
                .hourly_at
                .iter()
                .any(|&minute| crossed_minute_of_hour(last_run, now, minute));
        }

        match (&self.poll_frequency, last_run) {
            (Some(frequency), Some(last)) => now.signed_duration_since(last).to_std().unwrap_or_default() >= *frequency,
            (Some(_), None) => true,
            (None, _) => true,
        }
    }
}

fn crossed_time_of_day(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>, hour: u32, minute: u32) -> bool {
    let today_target = now.date_naive().and_hms_opt(hour, minute, 0).unwrap().and_utc();
    match last_run {
        None => now >= today_target,
        Some(last) => last < today_target && now >= today_target,
    }
}

fn crossed_minute_of_hour(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>, minute: u32) -> bool {
    let hour_target = now
        .date_naive()
        .and_hms_opt(now.hour(), minute, 0)
        .unwrap()
        .and_utc();
    match last_run {
        None => now >= hour_target,
        Some(last) => last < hour_target && now >= hour_target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(s: &str) -> DateTime<Utc> {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap().and_utc()
    }

    #[test]
    fn first_tick_with_poll_frequency_always_runs() {
        let schedule = Schedule {
            poll_frequency: Some(std::time::Duration::from_secs(60)),
            ..Schedule::new()
        };
        assert!(schedule.should_run(None, dt("2024-01-01 00:00:00")));
    }

    #[test]
    fn poll_frequency_waits_until_elapsed() {
        let schedule = Schedule {
            poll_frequency: Some(std::time::Duration::from_secs(60)),
            ..Schedule::new()
        };
        let last = dt("2024-01-01 00:00:00");
        assert!(!schedule.should_run(Some(last), dt("2024-01-01 00:00:30")));
        assert!(schedule.should_run(Some(last), dt("2024-01-01 00:01:00")));
    }

    #[test]
    fn daily_at_fires_once_per_crossing() {
        let schedule = Schedule {
            daily_at: vec![(9, 0)],
            ..Schedule::new()
        };
        let last = dt("2024-01-01 08:59:00");
        assert!(schedule.should_run(Some(last), dt("2024-01-01 09:00:30")));
        assert!(!schedule.should_run(Some(dt("2024-01-01 09:00:30")), dt("2024-01-01 09:05:00")));
    }

    #[test]
    fn skip_day_of_week_suppresses_any_trigger() {
        let schedule = Schedule {
            poll_frequency: Some(std::time::Duration::from_secs(1)),
            skip_days_of_week: vec![5, 6],
            ..Schedule::new()
        };
        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap();
        assert!(!schedule.should_run(None, saturday));
    }
}
