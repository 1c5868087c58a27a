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

//! Controller-level error taxonomy. Wraps `rpow_libwallet::Error` with
//! the categories the CLI needs to pick an exit code for: usage/IO
//! errors exit 1, domain errors exit 2, transport errors pass through.

use std::fmt::{self, Display};

use failure::{Backtrace, Context, Fail};
use rpow_libwallet::ErrorKind as LibErrorKind;

/// Exit code categories from the CLI surface.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitCategory {
	/// Usage, I/O, or key error.
	Usage,
	/// Domain error: missing wallet blob, malformed input.
	Domain,
	/// Transport/remote error; passed through from the signer.
	Transport,
}

#[derive(Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
	#[fail(display = "{}", _1)]
	Lib(ExitCategory, String),
	#[fail(display = "usage error: {}", _0)]
	Usage(String),
	#[fail(display = "I/O error: {}", _0)]
	Io(String),
}

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
	/// The exit-code category this error maps onto, following the same
	/// taxonomy grouping as the library's error kinds.
	pub fn exit_category(&self) -> ExitCategory {
		match self.inner.get_context() {
			ErrorKind::Usage(_) | ErrorKind::Io(_) => ExitCategory::Usage,
			ErrorKind::Lib(category, _) => *category,
		}
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error { inner: Context::new(kind) }
	}
}

impl From<rpow_libwallet::Error> for Error {
	fn from(e: rpow_libwallet::Error) -> Error {
		let category = match e.kind() {
			LibErrorKind::TokenNotFound(_) | LibErrorKind::InvalidToken => ExitCategory::Domain,
			LibErrorKind::RemoteExchange(_) => ExitCategory::Transport,
			_ => ExitCategory::Usage,
		};
		Error::from(ErrorKind::Lib(category, e.to_string()))
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Error {
		Error::from(ErrorKind::Io(e.to_string()))
	}
}

/// Map an [`ExitCategory`] onto the process exit code for that category.
pub fn exit_code(category: ExitCategory) -> i32 {
	match category {
		ExitCategory::Usage => 1,
		ExitCategory::Domain => 2,
		ExitCategory::Transport => 3,
	}
}
