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

//! Hashcash v1 token codec: the colon-delimited text grammar
//! `1:<bits>:<stamp>:<resource>:<ext>:<rand>:<counter>`.
//!
//! `parse` borrows slices of the input; unlike the source's `sstrtok` it
//! never mutates the text it is parsing.

use crate::error::{Error, ErrorKind};

/// All chars from ascii(33) to ascii(126) inclusive, minus `:`.
const VALID_STR_CHARS: &str =
	"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// A parsed hashcash v1 token. Fields borrow from the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields<'a> {
	/// Claimed protocol version (must be 1 for a supported token).
	pub version: u32,
	/// Claimed collision bit count.
	pub bits: u32,
	/// Truncated UTC stamp text.
	pub stamp: &'a str,
	/// Resource name the token protects.
	pub resource: &'a str,
	/// Extension field, possibly empty.
	pub ext: &'a str,
	/// 16 hex-digit random component.
	pub rand: &'a str,
	/// Search nonce / counter suffix.
	pub counter: &'a str,
}

fn valid_str_chars(s: &str) -> bool {
	s.chars().all(|c| VALID_STR_CHARS.contains(c))
}

/// Join the fields with `:` into canonical token text.
pub fn format(
	version: u32,
	bits: u32,
	stamp: &str,
	resource: &str,
	ext: &str,
	rand: &str,
	counter: &str,
) -> String {
	format!(
		"{}:{}:{}:{}:{}:{}:{}",
		version, bits, stamp, resource, ext, rand, counter
	)
}

/// Parse token text into its seven colon-delimited fields. Requires
/// exactly seven fields; `version`/`bits` must parse as non-negative
/// decimal; `rand`/`counter` must consist only of `VALID_STR_CHARS`.
pub fn parse(text: &str) -> Result<TokenFields<'_>, Error> {
	let fields: Vec<&str> = text.split(':').collect();
	if fields.len() != 7 {
		return Err(ErrorKind::InvalidToken.into());
	}
	let version: u32 = fields[0].parse().map_err(|_| ErrorKind::InvalidToken)?;
	let bits: u32 = fields[1].parse().map_err(|_| ErrorKind::InvalidToken)?;
	let stamp = fields[2];
	let resource = fields[3];
	let ext = fields[4];
	let rand = fields[5];
	let counter = fields[6];

	if !valid_str_chars(rand) || !valid_str_chars(counter) {
		return Err(ErrorKind::InvalidToken.into());
	}

	Ok(TokenFields {
		version,
		bits,
		stamp,
		resource,
		ext,
		rand,
		counter,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_then_parse_round_trips() {
		let text = format(1, 20, "040806", "foo", "", "65f8b412ab345678", "0123");
		let fields = parse(&text).unwrap();
		assert_eq!(fields.version, 1);
		assert_eq!(fields.bits, 20);
		assert_eq!(fields.stamp, "040806");
		assert_eq!(fields.resource, "foo");
		assert_eq!(fields.ext, "");
		assert_eq!(fields.rand, "65f8b412ab345678");
		assert_eq!(fields.counter, "0123");
	}

	#[test]
	fn rejects_wrong_field_count() {
		assert!(parse("1:20:040806:foo::rand").is_err());
		assert!(parse("1:20:040806:foo::rand:ctr:extra").is_err());
	}

	#[test]
	fn rejects_invalid_chars_in_rand_or_counter() {
		assert!(parse("1:20:040806:foo::ra nd:ctr").is_err());
		assert!(parse("1:20:040806:foo::rand:c:tr").is_err());
	}

	#[test]
	fn rejects_non_numeric_version_or_bits() {
		assert!(parse("x:20:040806:foo::rand:ctr").is_err());
		assert!(parse("1:x:040806:foo::rand:ctr").is_err());
	}

	#[test]
	fn example_from_grammar() {
		let fields = parse("1:20:040806:foo::65f8b4:12ab").unwrap();
		assert_eq!(fields.resource, "foo");
		assert_eq!(fields.rand, "65f8b4");
		assert_eq!(fields.counter, "12ab");
	}
}
