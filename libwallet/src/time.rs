// Copyright 2024 The RPOW Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! UTC time codec: truncated `YY[MM[DD[hh[mm[ss]]]]]` stamps.
//!
//! Unlike the source this never touches `TZ`; stamps are converted to and
//! from epoch seconds with `chrono`'s UTC calendar arithmetic directly.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};

const TIME_MINUTE: i64 = 60;
const TIME_HOUR: i64 = TIME_MINUTE * 60;
const TIME_DAY: i64 = TIME_HOUR * 24;
const TIME_YEAR: i64 = TIME_DAY * 365;
const TIME_MONTH: i64 = TIME_YEAR / 12;

/// Zero the components finer than `digits`. `digits` must be one of
/// `{2,4,6,8,10}`; any other value is a no-op, matching the source's
/// `round_off`.
pub fn round(t: i64, digits: u32) -> i64 {
	let dt = match Utc.timestamp_opt(t, 0).single() {
		Some(dt) => dt,
		None => return t,
	};
	let year = dt.year();
	let (mut month, mut day, mut hour, mut min) = (dt.month(), dt.day(), dt.hour(), dt.minute());
	let sec = 0;

	// Falls through like the C switch: 10 zeroes month.. down to 2 zeroes
	// seconds.
	match digits {
		10 => {
			month = 1;
			day = 1;
			hour = 0;
			min = 0;
		}
		8 => {
			day = 1;
			hour = 0;
			min = 0;
		}
		6 => {
			hour = 0;
			min = 0;
		}
		4 => {
			min = 0;
		}
		2 => {}
		_ => return t,
	}

	let date = match NaiveDate::from_ymd_opt(year, month, day) {
		Some(d) => d,
		None => return t,
	};
	let naive = match date.and_hms_opt(hour, min, sec) {
		Some(n) => n,
		None => return t,
	};
	Utc.from_utc_datetime(&naive).timestamp()
}

/// Format UTC broken-down time as two decimal digits per component,
/// truncated to `len` (must be even, 2..=12).
pub fn to_stamp(t: i64, len: usize) -> String {
	let dt = Utc
		.timestamp_opt(t, 0)
		.single()
		.unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
	let parts = [
		(dt.year() % 100) as u32,
		dt.month(),
		dt.day(),
		dt.hour(),
		dt.minute(),
		dt.second(),
	];
	let pairs = len / 2;
	let mut s = String::with_capacity(len);
	for p in parts.iter().take(pairs) {
		s.push_str(&format!("{:02}", p));
	}
	s
}

fn char_pair_atoi(pair: &str) -> Option<u32> {
	if pair.len() != 2 || !pair.chars().all(|c| c.is_ascii_digit()) {
		return None;
	}
	pair.parse().ok()
}

/// Resolve a two-digit year to the calendar century nearest the current
/// UTC year, adjusting by a century if that places it more than 50 years
/// away.
fn century_offset_to_year(century_offset: i32, current_year: i32) -> i32 {
	let current_century_offset = current_year % 100;
	let current_century = current_year - current_century_offset;
	let mut year = current_century + century_offset;
	if year - current_year > 50 {
		year -= 100;
	} else if year - current_year < -50 {
		year += 100;
	}
	year
}

/// Parse a stamp of even length 2..12. Missing components default to
/// January 1st, 00:00:00. Returns `None` on malformed input.
pub fn from_stamp(s: &str) -> Option<i64> {
	from_stamp_at(s, Utc::now().year())
}

/// Same as [`from_stamp`] but with an explicit "current year" for the
/// century-resolution rule, so the boundary behavior can be exercised
/// deterministically.
pub fn from_stamp_at(s: &str, current_year: i32) -> Option<i64> {
	let len = s.len();
	if !(2..=12).contains(&len) || !len.is_multiple_of(2) {
		return None;
	}

	let century_offset = char_pair_atoi(&s[0..2])? as i32;
	let year = century_offset_to_year(century_offset, current_year);

	let month = if len > 2 { char_pair_atoi(&s[2..4])? } else { 1 };
	if len > 2 && month == 0 {
		return None;
	}
	let day = if len > 4 { char_pair_atoi(&s[4..6])? } else { 1 };
	if len > 4 && day == 0 {
		return None;
	}
	let hour = if len > 6 { char_pair_atoi(&s[6..8])? } else { 0 };
	let min = if len > 8 { char_pair_atoi(&s[8..10])? } else { 0 };
	let sec = if len > 10 { char_pair_atoi(&s[10..12])? } else { 0 };

	let date = NaiveDate::from_ymd_opt(year, month.max(1), day.max(1))?;
	let naive = date.and_hms_opt(hour, min, sec)?;
	Some(Utc.from_utc_datetime(&naive).timestamp())
}

/// Minimum stamp width that still bounds a validity period `Delta`
/// seconds wide, per the timestamp width policy. `0` is treated as
/// "no expiry" and returns the default width of 6.
pub fn validity_to_width(validity_period: i64) -> u32 {
	if validity_period < 0 {
		return 0;
	}
	if validity_period == 0 {
		return 6;
	}
	if validity_period < 2 * TIME_MINUTE {
		12
	} else if validity_period < 2 * TIME_HOUR {
		10
	} else if validity_period < 2 * TIME_DAY {
		8
	} else if validity_period < 2 * TIME_MONTH {
		6
	} else if validity_period < 2 * TIME_YEAR {
		4
	} else {
		2
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_stamp() {
		for len in [2usize, 4, 6, 8, 10, 12] {
			let t = 1_091_750_400; // 2004-08-06 UTC
			let stamp = to_stamp(t, len);
			assert_eq!(stamp.len(), len);
			let back = from_stamp_at(&stamp, 2004).unwrap();
			let forward_again = to_stamp(back, len);
			assert_eq!(stamp, forward_again);
		}
	}

	#[test]
	fn two_digit_year_near_century() {
		let t = from_stamp_at("99", 2004).unwrap();
		assert_eq!(Utc.timestamp_opt(t, 0).unwrap().year(), 1999);

		let t = from_stamp_at("99", 2050).unwrap();
		assert_eq!(Utc.timestamp_opt(t, 0).unwrap().year(), 2099);
	}

	#[test]
	fn round_falls_through() {
		let t = from_stamp_at("040806123045", 2004).unwrap();
		let rounded = round(t, 6);
		assert_eq!(to_stamp(rounded, 12), "040806000000");
	}

	#[test]
	fn round_ignores_unsupported_digits() {
		let t = from_stamp_at("040806123045", 2004).unwrap();
		assert_eq!(round(t, 3), t);
	}

	#[test]
	fn from_stamp_rejects_odd_length() {
		assert!(from_stamp("123").is_none());
	}

	#[test]
	fn width_policy_boundaries() {
		assert_eq!(validity_to_width(0), 6);
		assert_eq!(validity_to_width(-1), 0);
		assert_eq!(validity_to_width(TIME_MINUTE), 12);
		assert_eq!(validity_to_width(2 * TIME_MINUTE), 10);
		assert_eq!(validity_to_width(2 * TIME_HOUR), 8);
		assert_eq!(validity_to_width(2 * TIME_DAY), 6);
		assert_eq!(validity_to_width(2 * TIME_MONTH), 4);
		assert_eq!(validity_to_width(2 * TIME_YEAR), 2);
	}
}
