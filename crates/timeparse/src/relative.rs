//! The relative-duration grammar ("remind me *in* ...").

use crate::error::ParseError;
use crate::scan::{at_word_boundary, digits, keyword, skip_ws};

/// A successful relative-duration match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeMatch {
    /// The parsed duration in whole seconds.
    pub seconds: u64,
    /// Byte offset just past the matched expression; the rest of the input
    /// is free text.
    pub end: usize,
}

/// Unit families, longest spelling first so `mins` wins over `min` and `m`.
const UNITS: &[(&[&str], u64)] = &[
    (&["days", "day", "d"], 86_400),
    (&["hours", "hour", "h"], 3_600),
    (&["minutes", "minute", "mins", "min", "m"], 60),
    (&["seconds", "second", "secs", "sec", "s"], 1),
];

/// Parses a relative duration anchored at the start of `input`.
///
/// Two forms are accepted:
///
/// - A colon-separated group such as `1:30` or `2:15:00`, read
///   **right-to-left** as seconds, minutes, hours (the last group is always
///   seconds). Groups beyond three are ignored from the left.
/// - A magnitude (integer or decimal, `.` or `,` separator) with an optional
///   unit token (`d`, `h`, `m`, `s` and their long spellings), defaulting to
///   minutes: `90m`, `1.5h`, `45`.
///
/// The match must end at a word boundary, so `5mx` is not five minutes of
/// anything and fails instead of swallowing letters.
pub fn parse_relative(input: &str) -> Result<RelativeMatch, ParseError> {
    if let Some(m) = colon_form(input) {
        return Ok(m);
    }
    unit_form(input).ok_or(ParseError::NoMatch)
}

/// `N:N[:N]...`, read right-to-left as seconds, minutes, hours.
fn colon_form(input: &str) -> Option<RelativeMatch> {
    let mut groups: Vec<u64> = Vec::new();
    let mut end = digits(input, 0)?;
    groups.push(input[..end].parse().ok()?);

    loop {
        let sep = skip_ws(input, end);
        let Some(colon) = keyword(input, sep, ":") else {
            break;
        };
        let start = skip_ws(input, colon);
        let Some(group_end) = digits(input, start) else {
            break;
        };
        groups.push(input[start..group_end].parse().ok()?);
        end = group_end;
    }

    if groups.len() < 2 || !at_word_boundary(input, end) {
        return None;
    }

    let mut seconds: u64 = 0;
    for (unit, value) in [1u64, 60, 3_600].iter().zip(groups.iter().rev()) {
        seconds = seconds.checked_add(unit.checked_mul(*value)?)?;
    }
    Some(RelativeMatch { seconds, end })
}

/// Magnitude plus optional unit token, defaulting to minutes.
fn unit_form(input: &str) -> Option<RelativeMatch> {
    let (value, magnitude_end) = magnitude(input)?;

    let unit_start = skip_ws(input, magnitude_end);
    for (spellings, unit_seconds) in UNITS {
        for spelling in *spellings {
            if let Some(unit_end) = keyword(input, unit_start, spelling) {
                if at_word_boundary(input, unit_end) {
                    return Some(RelativeMatch {
                        seconds: (value * *unit_seconds as f64).round() as u64,
                        end: unit_end,
                    });
                }
            }
        }
    }

    // No unit: minutes, and the magnitude itself must end on a boundary.
    if at_word_boundary(input, magnitude_end) {
        return Some(RelativeMatch {
            seconds: (value * 60.0).round() as u64,
            end: magnitude_end,
        });
    }
    None
}

/// `\d+([.,]\d+)?` as a non-negative decimal value.
fn magnitude(input: &str) -> Option<(f64, usize)> {
    let int_end = digits(input, 0)?;

    let mut end = int_end;
    if let Some(frac_end) = input[int_end..]
        .chars()
        .next()
        .filter(|c| *c == '.' || *c == ',')
        .and_then(|_| digits(input, int_end + 1))
    {
        end = frac_end;
    }

    let mut normalized = input[..end].to_string();
    if end > int_end {
        normalized.replace_range(int_end..int_end + 1, ".");
    }
    let value: f64 = normalized.parse().ok()?;
    Some((value, end))
}
