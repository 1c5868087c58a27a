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

//! Crate-wide error taxonomy. Every fallible operation returns
//! `Result<T, Error>`; `ErrorKind` carries the category, `Error` adds the
//! `failure` context chain (cause, backtrace).

use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};
use std::io;

/// Error categories, grouped the way the design doc's error taxonomy does:
/// internal-argument, invalid-input, policy, capacity, environment, io,
/// remote, missing.
#[derive(Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// Null/invalid argument passed to an internal API (e.g. mint called
	/// with a negative `now`).
	#[fail(display = "invalid argument: {}", _0)]
	InvalidArgument(String),

	/// Token text does not parse as a well-formed hashcash v1 token.
	#[fail(display = "malformed hashcash token")]
	InvalidToken,

	/// Token's UTC stamp failed to parse.
	#[fail(display = "malformed token timestamp")]
	InvalidTimestamp,

	/// `bits` exceeds the SHA-1 digest width (160).
	#[fail(display = "invalid token length: {} bits requested", _0)]
	InvalidTokenLength(u32),

	/// `now` was negative.
	#[fail(display = "invalid time: {}", _0)]
	InvalidTime(i64),

	/// `time_width` is not one of the three supported widths.
	#[fail(display = "invalid time width: {}", _0)]
	InvalidTimeWidth(u32),

	/// Token claims a version other than 1.
	#[fail(display = "unsupported hashcash version: {}", _0)]
	UnsupportedVersion(u32),

	/// Resource in the token does not match the expected resource/pattern.
	#[fail(display = "resource mismatch: token names {}", _0)]
	WrongResource(String),

	/// Effective collision bits fall short of the required minimum.
	#[fail(display = "insufficient bits: {} < required {}", found, required)]
	InsufficientBits {
		/// bits actually delivered (after claim/count clamping)
		found: u32,
		/// bits the caller required
		required: u32,
	},

	/// The minting search space (96 bits of counter) was exhausted.
	#[fail(display = "too many tries minting token for resource {}", _0)]
	TooManyTries(String),

	/// A system RNG call failed.
	#[fail(display = "random number generation failed")]
	RngFailed,

	/// A regular expression failed to compile.
	#[fail(display = "regular expression error: {}", _0)]
	RegexpError(String),

	/// Wallet file I/O failure (open, read, write, lock).
	#[fail(display = "wallet I/O error: {}", _0)]
	WalletIo(String),

	/// The remote signer rejected an exchange or returned a transport error.
	#[fail(display = "signer exchange failed: {}", _0)]
	RemoteExchange(String),

	/// No wallet blob of the requested value was found.
	#[fail(display = "no token of value {} in wallet", _0)]
	TokenNotFound(i32),

	/// Configuration could not be loaded or was incomplete.
	#[fail(display = "configuration error: {}", _0)]
	Config(String),

	/// Catch-all for conditions that don't fit a narrower category.
	#[fail(display = "{}", _0)]
	Generic(String),
}

/// Wraps `ErrorKind` with a `failure::Context` so causes and backtraces
/// survive through `?`, the way the rest of this codebase's error type does.
#[derive(Debug)]
pub struct Error {
	inner: Context<ErrorKind>,
}

impl Fail for Error {
	fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}

	fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.inner, f)
	}
}

impl Error {
	/// Access the underlying category.
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}
}

impl Clone for ErrorKind {
	fn clone(&self) -> Self {
		match self {
			ErrorKind::InvalidArgument(s) => ErrorKind::InvalidArgument(s.clone()),
			ErrorKind::InvalidToken => ErrorKind::InvalidToken,
			ErrorKind::InvalidTimestamp => ErrorKind::InvalidTimestamp,
			ErrorKind::InvalidTokenLength(b) => ErrorKind::InvalidTokenLength(*b),
			ErrorKind::InvalidTime(t) => ErrorKind::InvalidTime(*t),
			ErrorKind::InvalidTimeWidth(w) => ErrorKind::InvalidTimeWidth(*w),
			ErrorKind::UnsupportedVersion(v) => ErrorKind::UnsupportedVersion(*v),
			ErrorKind::WrongResource(s) => ErrorKind::WrongResource(s.clone()),
			ErrorKind::InsufficientBits { found, required } => ErrorKind::InsufficientBits {
				found: *found,
				required: *required,
			},
			ErrorKind::TooManyTries(s) => ErrorKind::TooManyTries(s.clone()),
			ErrorKind::RngFailed => ErrorKind::RngFailed,
			ErrorKind::RegexpError(s) => ErrorKind::RegexpError(s.clone()),
			ErrorKind::WalletIo(s) => ErrorKind::WalletIo(s.clone()),
			ErrorKind::RemoteExchange(s) => ErrorKind::RemoteExchange(s.clone()),
			ErrorKind::TokenNotFound(v) => ErrorKind::TokenNotFound(*v),
			ErrorKind::Config(s) => ErrorKind::Config(s.clone()),
			ErrorKind::Generic(s) => ErrorKind::Generic(s.clone()),
		}
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner }
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::WalletIo(e.to_string())),
		}
	}
}
