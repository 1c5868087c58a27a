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

//! Plain-text rendering for command output, colored the way the
//! reference client's `count`/`status` output highlights success and
//! failure.

use std::collections::HashMap;
use std::io::{self, Write};

use colored::Colorize;
use rpow_libwallet::SimpleBlob;

/// Print per-denomination counts, smallest value first.
pub fn print_counts(out: &mut dyn Write, counts: &HashMap<i32, usize>) -> io::Result<()> {
	let mut values: Vec<&i32> = counts.keys().collect();
	values.sort();
	if values.is_empty() {
		writeln!(out, "{}", "wallet is empty".yellow())?;
		return Ok(());
	}
	for v in values {
		writeln!(out, "value {:>3}: {}", v, counts[v].to_string().green())?;
	}
	Ok(())
}

/// Print one line reporting a freshly generated blob from `gencontin`.
pub fn print_generated(out: &mut dyn Write, blob: &SimpleBlob) -> io::Result<()> {
	writeln!(out, "{} value {}", "generated".green(), blob.value)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counts_print_sorted_by_value() {
		let mut counts = HashMap::new();
		counts.insert(7, 2usize);
		counts.insert(4, 5usize);
		let mut buf = Vec::new();
		print_counts(&mut buf, &counts).unwrap();
		let text = String::from_utf8(buf).unwrap();
		let pos4 = text.find("value   4").unwrap();
		let pos7 = text.find("value   7").unwrap();
		assert!(pos4 < pos7);
	}

	#[test]
	fn empty_wallet_reports_empty() {
		let mut buf = Vec::new();
		print_counts(&mut buf, &HashMap::new()).unwrap();
		assert!(String::from_utf8(buf).unwrap().contains("empty"));
	}
}
