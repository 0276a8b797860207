//! Time-expression grammars for Minder.
//!
//! This crate turns the free-form time expressions users type into concrete
//! durations or times of day. Two independent grammars exist, both anchored
//! at the start of input and case-insensitive:
//!
//! - [`parse_relative`] for "in how long": `90m`, `1.5h`, `1:30`, `2 days`.
//! - [`parse_time_of_day`] for "at what time": `17:05`, `5pm`, `9:30 am`.
//!
//! Both return the parsed value together with the offset where the match
//! ended, so the caller can treat the remainder of the input as the reminder
//! body.
//!
//! # Example
//!
//! ```
//! use timeparse::parse_relative;
//!
//! let m = parse_relative("90m water the plants").unwrap();
//! assert_eq!(m.seconds, 5400);
//! assert_eq!("90m water the plants"[m.end..].trim(), "water the plants");
//! ```

mod error;
mod relative;
mod scan;
mod time_of_day;

pub use error::ParseError;
pub use relative::{parse_relative, RelativeMatch};
pub use time_of_day::{parse_time_of_day, TimeOfDayMatch};
