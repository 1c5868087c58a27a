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

//! Hashcash verifier: counts actual collision bits, matches the
//! resource against a literal/glob/regex pattern, and checks the
//! validity window.

use regex::Regex;
use sha1::{Digest, Sha1};

use crate::error::{Error, ErrorKind};
use crate::time;
use crate::token;

/// How a token's `resource` field should be matched against the caller's
/// pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
	/// Byte-exact equality.
	Literal,
	/// Email-style glob: `user@domain`, each side globbed on `*`.
	Wildcard,
	/// Regular expression, anchored if not already.
	Regex,
}

/// Outcome of [`valid_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
	/// `validity_period == 0`: the token never expires.
	Forever,
	/// `token_time` is further in the future than `grace` allows.
	InFuture,
	/// Still valid, with this many seconds remaining.
	Remaining(i64),
	/// Past its expiry plus grace.
	Expired,
}

/// Count the number of leading zero bits of SHA-1(token).
pub fn count_bits(token: &str) -> u32 {
	let digest = Sha1::digest(token.as_bytes());
	let mut bits = 0u32;
	for byte in digest.iter() {
		if *byte == 0 {
			bits += 8;
			continue;
		}
		bits += byte.leading_zeros();
		break;
	}
	bits.min(digest.len() as u32 * 8)
}

/// How many seconds a token minted at `token_time` remains valid for.
pub fn valid_for(token_time: i64, validity_period: i64, grace: i64, now: i64) -> Validity {
	if validity_period == 0 {
		return Validity::Forever;
	}
	if token_time > now + grace {
		return Validity::InFuture;
	}
	let expiry = token_time + validity_period;
	if expiry + grace > now {
		return Validity::Remaining(expiry + grace - now);
	}
	Validity::Expired
}

/// Match the `*`-tokenized glob `pattern` against `candidate`: the first
/// token must prefix, the last must suffix, and the middle tokens must
/// appear in order, non-overlapping.
fn glob_match(pattern: &str, candidate: &str) -> bool {
	if !pattern.contains('*') {
		return pattern == candidate;
	}
	let parts: Vec<&str> = pattern.split('*').collect();
	let mut pos = 0usize;
	let n = parts.len();

	for (i, part) in parts.iter().enumerate() {
		if part.is_empty() {
			continue;
		}
		if i == 0 {
			if !candidate[pos..].starts_with(part) {
				return false;
			}
			pos += part.len();
		} else if i == n - 1 {
			if !candidate[pos..].ends_with(part) {
				return false;
			}
			// don't advance pos; this is the final check
		} else {
			match candidate[pos..].find(part) {
				Some(off) => pos += off + part.len(),
				None => return false,
			}
		}
	}
	true
}

/// Email-style match: split both pattern and candidate on `@`, glob the
/// user part, and glob the domain label-by-label on `.`, requiring equal
/// label counts.
fn email_match(pattern: &str, candidate: &str) -> bool {
	let mut pat_parts = pattern.splitn(2, '@');
	let pat_user = pat_parts.next().unwrap_or("");
	let pat_dom = pat_parts.next();

	let mut cand_parts = candidate.splitn(2, '@');
	let cand_user = cand_parts.next().unwrap_or("");
	let cand_dom = cand_parts.next();

	if pat_dom.is_some() && cand_dom.is_none() {
		return false;
	}

	if !glob_match(pat_user, cand_user) {
		return false;
	}

	match (pat_dom, cand_dom) {
		(None, _) => true,
		(Some(pd), Some(cd)) => {
			let pd_labels: Vec<&str> = pd.split('.').collect();
			let cd_labels: Vec<&str> = cd.split('.').collect();
			if pd_labels.len() != cd_labels.len() {
				return false;
			}
			pd_labels
				.iter()
				.zip(cd_labels.iter())
				.all(|(p, c)| glob_match(p, c))
		}
		(Some(_), None) => false,
	}
}

fn bound_regex(pattern: &str) -> String {
	let mut out = String::with_capacity(pattern.len() + 2);
	if !pattern.starts_with('^') {
		out.push('^');
	}
	out.push_str(pattern);
	if !pattern.ends_with('$') {
		out.push('$');
	}
	out
}

fn resource_match(kind: MatchKind, token_resource: &str, pattern: &str) -> Result<bool, Error> {
	match kind {
		MatchKind::Literal => Ok(token_resource == pattern),
		MatchKind::Wildcard => Ok(email_match(pattern, token_resource)),
		MatchKind::Regex => {
			let bound = bound_regex(pattern);
			let re =
				Regex::new(&bound).map_err(|e| ErrorKind::RegexpError(e.to_string()))?;
			Ok(re.is_match(token_resource))
		}
	}
}

/// Full check: parse, version, resource, bits, then validity window, in
/// that order.
#[allow(clippy::too_many_arguments)]
pub fn check(
	text: &str,
	pattern: &str,
	match_kind: MatchKind,
	now: i64,
	validity: i64,
	grace: i64,
	required_bits: u32,
) -> Result<Validity, Error> {
	let fields = token::parse(text)?;

	if fields.version != 1 {
		return Err(ErrorKind::UnsupportedVersion(fields.version).into());
	}

	let token_time = time::from_stamp(fields.stamp).ok_or(ErrorKind::InvalidTimestamp)?;

	if !resource_match(match_kind, fields.resource, pattern)? {
		return Err(ErrorKind::WrongResource(fields.resource.to_string()).into());
	}

	let counted = count_bits(text);
	let effective = counted.min(fields.bits);
	if effective < required_bits {
		return Err(ErrorKind::InsufficientBits {
			found: effective,
			required: required_bits,
		}
		.into());
	}

	Ok(valid_for(token_time, validity, grace, now))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mint;

	#[test]
	fn counted_bits_meet_claim() {
		let minted = mint::mint(1_091_750_400, 6, "foo", 12, 0, "").unwrap();
		assert!(count_bits(&minted.token) >= 12);
	}

	#[test]
	fn check_valid_forever() {
		let minted = mint::mint(1_091_750_400, 6, "foo", 12, 0, "").unwrap();
		let v = check(
			&minted.token,
			"foo",
			MatchKind::Literal,
			1_091_750_400,
			0,
			0,
			12,
		)
		.unwrap();
		assert_eq!(v, Validity::Forever);
	}

	#[test]
	fn check_wrong_resource() {
		let minted = mint::mint(1_091_750_400, 6, "foo", 12, 0, "").unwrap();
		let err = check(
			&minted.token,
			"bar",
			MatchKind::Literal,
			1_091_750_400,
			0,
			0,
			12,
		)
		.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::WrongResource("foo".to_string()));
	}

	#[test]
	fn check_insufficient_bits() {
		let minted = mint::mint(1_091_750_400, 6, "foo", 12, 0, "").unwrap();
		let err = check(
			&minted.token,
			"foo",
			MatchKind::Literal,
			1_091_750_400,
			0,
			0,
			40,
		)
		.unwrap_err();
		match err.kind() {
			ErrorKind::InsufficientBits { required, .. } => assert_eq!(required, 40),
			other => panic!("unexpected kind {:?}", other),
		}
	}

	#[test]
	fn wildcard_email_match() {
		assert!(email_match("*@example.com", "alice@example.com"));
		assert!(!email_match("*@example.com", "alice@example.org"));
		assert!(email_match("al*@*.com", "alice@example.com"));
		assert!(!email_match("a@b.c", "a@b"));
		assert!(email_match("nodomain", "nodomain"));
	}

	#[test]
	fn glob_requires_equal_label_counts() {
		assert!(!email_match("*@a.b", "x@a.b.c"));
	}

	#[test]
	fn regex_match_is_bound() {
		assert!(resource_match(MatchKind::Regex, "foo123", "foo[0-9]+").unwrap());
		assert!(!resource_match(MatchKind::Regex, "xfoo123", "foo[0-9]+").unwrap());
	}

	#[test]
	fn valid_for_future_boundary() {
		assert_eq!(valid_for(100, 10, 5, 95), Validity::Remaining(20));
		assert_eq!(valid_for(101, 10, 5, 95), Validity::InFuture);
	}
}
