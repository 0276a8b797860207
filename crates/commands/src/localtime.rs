//! Local-time resolution and duration formatting.
//!
//! Times of day are ambiguous without knowing where the user is. A stored
//! UTC offset shifts "now" into the user's local frame; all arithmetic here
//! is plain unix-seconds math so it stays trivially testable.

const DAY_SECONDS: i64 = 86_400;

/// Resolve a parsed seconds-of-day value to a concrete unix instant.
///
/// `delta_seconds` is the user's offset from UTC. If the requested time of
/// day is strictly earlier than the current local time of day, the due date
/// rolls to the next calendar day; a time equal to now resolves to now.
pub fn resolve_time_of_day(seconds_of_day: u32, now_utc: i64, delta_seconds: i64) -> i64 {
    let target = i64::from(seconds_of_day);
    let local_now = now_utc + delta_seconds;
    let local_time_of_day = local_now.rem_euclid(DAY_SECONDS);
    let local_midnight = local_now - local_time_of_day;

    let mut due_local = local_midnight + target;
    if target < local_time_of_day {
        due_local += DAY_SECONDS;
    }

    due_local - delta_seconds
}

/// Format a duration in seconds as `H:MM:SS`, with a day count prefix past
/// 24 hours: `0:05:00`, `2:30:00`, `3 days, 1:00:00`.
pub fn format_delta(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / DAY_SECONDS;
    let rest = seconds % DAY_SECONDS;
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, secs) = (rest / 60, rest % 60);

    match days {
        0 => format!("{hours}:{minutes:02}:{secs:02}"),
        1 => format!("1 day, {hours}:{minutes:02}:{secs:02}"),
        _ => format!("{days} days, {hours}:{minutes:02}:{secs:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2023-11-14 22:13:20 UTC; 10:00:00 local midnights below are built
    // from this by hand.
    const MIDNIGHT_UTC: i64 = 1_700_000_000 - (1_700_000_000 % DAY_SECONDS);

    #[test]
    fn test_resolves_to_today_when_still_ahead() {
        // Now is 10:00, asking for 17:00 today.
        let now = MIDNIGHT_UTC + 10 * 3_600;
        let due = resolve_time_of_day(17 * 3_600, now, 0);
        assert_eq!(due, MIDNIGHT_UTC + 17 * 3_600);
    }

    #[test]
    fn test_rolls_to_tomorrow_when_already_past() {
        // Now is 18:00, asking for 17:00 rolls to tomorrow.
        let now = MIDNIGHT_UTC + 18 * 3_600;
        let due = resolve_time_of_day(17 * 3_600, now, 0);
        assert_eq!(due, MIDNIGHT_UTC + DAY_SECONDS + 17 * 3_600);
    }

    #[test]
    fn test_equal_time_resolves_to_now() {
        let now = MIDNIGHT_UTC + 17 * 3_600;
        let due = resolve_time_of_day(17 * 3_600, now, 0);
        assert_eq!(due, now);
    }

    #[test]
    fn test_offset_shifts_the_local_frame() {
        // 22:00 UTC at +3h is 01:00 local, so "2am" is an hour away.
        let now = MIDNIGHT_UTC + 22 * 3_600;
        let due = resolve_time_of_day(2 * 3_600, now, 3 * 3_600);
        assert_eq!(due, now + 3_600);

        // At UTC itself, "2am" already passed and rolls to tomorrow.
        let due = resolve_time_of_day(2 * 3_600, now, 0);
        assert_eq!(due, MIDNIGHT_UTC + DAY_SECONDS + 2 * 3_600);
    }

    #[test]
    fn test_negative_offset() {
        // 01:00 UTC at -5h is 20:00 local the previous day; "9pm" is an
        // hour away and lands on the same UTC day.
        let now = MIDNIGHT_UTC + 3_600;
        let due = resolve_time_of_day(21 * 3_600, now, -5 * 3_600);
        assert_eq!(due, now + 3_600);
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(300), "0:05:00");
        assert_eq!(format_delta(9_000), "2:30:00");
        assert_eq!(format_delta(90_061), "1 day, 1:01:01");
        assert_eq!(format_delta(3 * DAY_SECONDS + 3_600), "3 days, 1:00:00");
        assert_eq!(format_delta(-5), "0:00:00");
    }
}
