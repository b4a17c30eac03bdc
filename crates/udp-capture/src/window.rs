use chrono::{DateTime, Duration, Utc};

/// The safety margin subtracted from the source database's clock so the
/// window never reaches rows from a transaction that was still in flight
/// when we read `current_timestamp`.
const STEP_BACK: Duration = Duration::seconds(60);

/// Derives this job's CDC window end from the source database's own clock:
/// step back 60 seconds, then truncate to an integer second boundary.
pub fn current_timestamp(source_now: DateTime<Utc>) -> DateTime<Utc> {
    let stepped_back = source_now - STEP_BACK;
    stepped_back - Duration::nanoseconds(stepped_back.timestamp_subsec_nanos() as i64)
}

/// Accelerated catch-up: when a project configures `fast_forward_increment`
/// and the watermark is further behind the real window than one increment,
/// advances by `increment` instead of jumping straight to `real_current` so
/// a badly lagging namespace processes its backlog in bounded steps rather
/// than one very large window. A no-op (returns `real_current` unchanged)
/// when no increment is configured, matching `capture.py`'s
/// `fast_forward_timestamp`, which the original marks incomplete.
pub fn apply_fast_forward(
    real_current: DateTime<Utc>,
    reference: DateTime<Utc>,
    fast_forward_increment: Option<Duration>,
) -> DateTime<Utc> {
    match fast_forward_increment {
        Some(increment) if increment > Duration::zero() => {
            let candidate = reference + increment;
            candidate.min(real_current)
        }
        _ => real_current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn steps_back_sixty_seconds_and_truncates_to_integer_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 1, 30).unwrap() + Duration::milliseconds(500);
        let window_end = current_timestamp(now);
        assert_eq!(window_end, Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 30).unwrap());
        assert_eq!(window_end.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn fast_forward_is_a_noop_when_unconfigured() {
        let real = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let reference = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(apply_fast_forward(real, reference, None), real);
    }

    #[test]
    fn fast_forward_steps_by_increment_when_behind() {
        let real = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let reference = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stepped = apply_fast_forward(real, reference, Some(Duration::days(7)));
        assert_eq!(stepped, reference + Duration::days(7));
    }

    #[test]
    fn fast_forward_never_exceeds_real_current() {
        let real = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let reference = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stepped = apply_fast_forward(real, reference, Some(Duration::days(30)));
        assert_eq!(stepped, real);
    }
}
