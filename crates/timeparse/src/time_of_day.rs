//! The absolute time-of-day grammar ("remind me *at* ...").

use crate::error::ParseError;
use crate::scan::{at_word_boundary, digits, keyword, skip_ws};

/// Half a day, added when a `pm` marker is present.
const PM_SHIFT: u64 = 43_200;

/// A successful time-of-day match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayMatch {
    /// Seconds since local midnight.
    pub seconds_of_day: u32,
    /// Byte offset just past the matched expression.
    pub end: usize,
}

/// Parses a time of day anchored at the start of `input`.
///
/// Matches `H[:M[:S]]`, read **left-to-right** as hours, minutes, seconds
/// (the opposite of the relative grammar), optionally followed by a
/// word-bounded `am` or `pm`. Only `pm` changes the value (+12h); `am` is
/// accepted purely to disambiguate the boundary.
///
/// Minutes and seconds renormalize through the seconds-of-day computation
/// (`5:75` is 6:15), but a result of 24 hours or more is reported as
/// [`ParseError::OutOfBounds`] rather than wrapping into the next day.
pub fn parse_time_of_day(input: &str) -> Result<TimeOfDayMatch, ParseError> {
    let mut groups: Vec<(u64, usize)> = Vec::new();
    let mut end = digits(input, 0).ok_or(ParseError::NoMatch)?;
    groups.push((parse_group(&input[..end])?, end));

    while groups.len() < 3 {
        let Some(colon) = keyword(input, end, ":") else {
            break;
        };
        let Some(group_end) = digits(input, colon) else {
            break;
        };
        groups.push((parse_group(&input[colon..group_end])?, group_end));
        end = group_end;
    }

    // Longest prefix of groups that ends acceptably wins; `17:30abc` falls
    // back to hour 17 with ":30abc" left as free text.
    for take in (1..=groups.len()).rev() {
        let (_, group_end) = groups[take - 1];
        let (shift, match_end) = match meridiem(input, group_end) {
            Some((shift, meridiem_end)) => (shift, meridiem_end),
            None if at_word_boundary(input, group_end) => (0, group_end),
            None => continue,
        };

        let mut seconds: u64 = shift;
        for (unit, (value, _)) in [3_600u64, 60, 1].iter().zip(groups.iter().take(take)) {
            seconds += unit * value;
        }

        let (hours, rest) = (seconds / 3_600, seconds % 3_600);
        let (minutes, secs) = (rest / 60, rest % 60);
        if hours > 23 || minutes > 59 || secs > 59 {
            return Err(ParseError::OutOfBounds {
                hours,
                minutes,
                seconds: secs,
            });
        }

        return Ok(TimeOfDayMatch {
            seconds_of_day: seconds as u32,
            end: match_end,
        });
    }

    Err(ParseError::NoMatch)
}

/// A digit group, capped so seconds-of-day arithmetic cannot overflow.
fn parse_group(digits: &str) -> Result<u64, ParseError> {
    digits.parse::<u64>().map_err(|_| ParseError::NoMatch).map(|v| v.min(1 << 32))
}

/// Optional whitespace plus a word-bounded `am`/`pm`; returns the pm shift
/// and the offset past the marker.
fn meridiem(input: &str, pos: usize) -> Option<(u64, usize)> {
    let start = skip_ws(input, pos);
    for (marker, shift) in [("pm", PM_SHIFT), ("am", 0)] {
        if let Some(end) = keyword(input, start, marker) {
            if at_word_boundary(input, end) {
                return Some((shift, end));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_hours() {
        assert_eq!(parse_time_of_day("17").unwrap().seconds_of_day, 17 * 3_600);
        assert_eq!(parse_time_of_day("0").unwrap().seconds_of_day, 0);
    }

    #[test]
    fn test_left_to_right_groups() {
        assert_eq!(parse_time_of_day("17:05").unwrap().seconds_of_day, 17 * 3_600 + 5 * 60);
        assert_eq!(
            parse_time_of_day("6:30:15").unwrap().seconds_of_day,
            6 * 3_600 + 30 * 60 + 15
        );
    }

    #[test]
    fn test_meridiem() {
        assert_eq!(parse_time_of_day("5pm").unwrap().seconds_of_day, 17 * 3_600);
        assert_eq!(parse_time_of_day("5 PM").unwrap().seconds_of_day, 17 * 3_600);
        assert_eq!(parse_time_of_day("5am").unwrap().seconds_of_day, 5 * 3_600);
        assert_eq!(
            parse_time_of_day("1:30 pm").unwrap().seconds_of_day,
            13 * 3_600 + 30 * 60
        );
        // pm always adds twelve hours, so 12:30pm computes to 24:30.
        assert!(matches!(
            parse_time_of_day("12:30pm"),
            Err(ParseError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_minutes_renormalize() {
        // 5:75 is 75 minutes past 5, i.e. 6:15.
        assert_eq!(parse_time_of_day("5:75").unwrap().seconds_of_day, 6 * 3_600 + 15 * 60);
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(matches!(
            parse_time_of_day("25"),
            Err(ParseError::OutOfBounds { hours: 25, .. })
        ));
        // 13pm would be 25:00.
        assert!(matches!(parse_time_of_day("13pm"), Err(ParseError::OutOfBounds { .. })));
        assert!(matches!(parse_time_of_day("24:00"), Err(ParseError::OutOfBounds { .. })));
    }

    #[test]
    fn test_body_offset() {
        let input = "17:05 call home";
        let m = parse_time_of_day(input).unwrap();
        assert_eq!(input[m.end..].trim(), "call home");

        let input = "5pm call home";
        let m = parse_time_of_day(input).unwrap();
        assert_eq!(input[m.end..].trim(), "call home");
    }

    #[test]
    fn test_boundary_backtracking() {
        // The seconds group trails into letters, so only the hour matches.
        let m = parse_time_of_day("17:30abc").unwrap();
        assert_eq!(m.seconds_of_day, 17 * 3_600);
        assert_eq!(m.end, 2);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(parse_time_of_day("noonish"), Err(ParseError::NoMatch));
        assert_eq!(parse_time_of_day(""), Err(ParseError::NoMatch));
        assert_eq!(parse_time_of_day("5pmx"), Err(ParseError::NoMatch));
    }
}
