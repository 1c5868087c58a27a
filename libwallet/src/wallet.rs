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

//! Wallet store: an append-only file of opaque RPOW blobs, with
//! cross-process exclusive locking around every operation.
//!
//! There is no index; every operation is a linear scan. That is
//! intentional: the held set is small, tens to thousands of blobs.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, warn};

use crate::collaborators::{BlobCodec, RpowBlob};
use crate::config::ValueRange;
use crate::error::{Error, ErrorKind};

const SHIFT_BUF_SIZE: usize = 64 * 1024;

/// Handle onto a wallet file. Owns its path and the codec used to
/// (de)serialize the blobs it holds; does not cache any wallet state
/// between calls, so concurrent processes always see a consistent file.
pub struct WalletStore<B: RpowBlob, C: BlobCodec<B>> {
	path: PathBuf,
	codec: C,
	_marker: PhantomData<B>,
}

/// Retry `file.lock_exclusive()` indefinitely on `EINTR`, matching the
/// original C client's lock-wait behavior.
fn lock_exclusive_retrying(file: &File) -> Result<(), Error> {
	loop {
		match file.lock_exclusive() {
			Ok(()) => return Ok(()),
			Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(ErrorKind::WalletIo(format!("lock failed: {}", e)).into()),
		}
	}
}

fn unlock(file: &File) {
	if let Err(e) = FileExt::unlock(file) {
		warn!("failed to release wallet lock: {}", e);
	}
}

impl<B: RpowBlob, C: BlobCodec<B>> WalletStore<B, C> {
	/// Open a handle onto the wallet file at `path`. Does not touch the
	/// file yet; it is created lazily by the first `append`.
	pub fn new(path: impl Into<PathBuf>, codec: C) -> Self {
		WalletStore {
			path: path.into(),
			codec,
			_marker: PhantomData,
		}
	}

	/// Path to the underlying wallet file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Remove the wallet file entirely. Used by `getkeys`, which must reset
	/// any existing wallet.
	pub fn delete(&self) -> Result<(), Error> {
		match std::fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(ErrorKind::WalletIo(e.to_string()).into()),
		}
	}

	fn open_for_append(&self) -> Result<File, Error> {
		OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.map_err(|e| ErrorKind::WalletIo(format!("open_failed: {}", e)).into())
	}

	fn open_for_mutation(&self) -> Result<File, Error> {
		OpenOptions::new()
			.create(true)
			.truncate(false)
			.read(true)
			.write(true)
			.open(&self.path)
			.map_err(|e| ErrorKind::WalletIo(format!("open_failed: {}", e)).into())
	}

	/// Append one blob under an exclusive lock held for the full
	/// operation. Seeks to end, writes, flushes, then releases.
	pub fn append(&self, blob: &B) -> Result<(), Error> {
		let mut file = self.open_for_append()?;
		lock_exclusive_retrying(&file)?;
		let result = (|| -> Result<(), Error> {
			file.seek(SeekFrom::End(0))?;
			self.codec.write_one(&mut file, blob)?;
			file.flush()?;
			Ok(())
		})();
		unlock(&file);
		debug!("appended rpow value={} id_len={}", blob.value(), blob.id().len());
		result
	}

	/// Scan from the start for the first blob whose value equals `value`,
	/// remove it by shifting the tail left over the hole and truncating,
	/// and return it. Returns `Ok(None)` without mutation if none is
	/// found. A deserialization failure terminates the scan without
	/// modifying the file.
	pub fn take_by_value(&self, value: i32) -> Result<Option<B>, Error> {
		let mut file = self.open_for_mutation()?;
		lock_exclusive_retrying(&file)?;
		let result = self.scan_and_remove(&mut file, value);
		unlock(&file);
		result
	}

	fn scan_and_remove(&self, file: &mut File, value: i32) -> Result<Option<B>, Error> {
		file.seek(SeekFrom::Start(0))?;
		loop {
			let pos_before = file.stream_position()?;
			match self.codec.read_one(file) {
				Ok(Some(blob)) => {
					let pos_after = file.stream_position()?;
					if blob.value() == value {
						self.shift_left(file, pos_before, pos_after)?;
						debug!("took rpow value={} from wallet", value);
						return Ok(Some(blob));
					}
				}
				Ok(None) => return Ok(None),
				Err(e) => {
					warn!("wallet scan aborted on malformed record: {}", e);
					return Err(e);
				}
			}
		}
	}

	/// Shift every byte in `[end, file_len)` left by `end - start`, then
	/// truncate, removing the `[start, end)` hole in place.
	fn shift_left(&self, file: &mut File, start: u64, end: u64) -> Result<(), Error> {
		let file_len = file.metadata()?.len();
		let mut buf = vec![0u8; SHIFT_BUF_SIZE];
		let mut read_pos = end;
		let mut write_pos = start;
		loop {
			file.seek(SeekFrom::Start(read_pos))?;
			let n = file.read(&mut buf)?;
			if n == 0 {
				break;
			}
			file.seek(SeekFrom::Start(write_pos))?;
			file.write_all(&buf[..n])?;
			read_pos += n as u64;
			write_pos += n as u64;
		}
		file.set_len(file_len - (end - start))?;
		Ok(())
	}

	/// Linear scan returning per-denomination counts. Blobs outside
	/// `range` are logged and skipped, not removed; a deserialization
	/// failure ends the scan with whatever counts were collected so far.
	pub fn count_by_value(&self, range: ValueRange) -> Result<HashMap<i32, usize>, Error> {
		let mut file = self.open_for_mutation()?;
		lock_exclusive_retrying(&file)?;
		let result = self.scan_counts(&mut file, range);
		unlock(&file);
		result
	}

	fn scan_counts(&self, file: &mut File, range: ValueRange) -> Result<HashMap<i32, usize>, Error> {
		file.seek(SeekFrom::Start(0))?;
		let mut counts = HashMap::new();
		loop {
			match self.codec.read_one(file) {
				Ok(Some(blob)) => {
					let v = blob.value();
					if v < range.min || v > range.max {
						warn!("skipping rpow with invalid value {}", v);
						continue;
					}
					*counts.entry(v).or_insert(0) += 1;
				}
				Ok(None) => break,
				Err(e) => {
					warn!("wallet count scan ended on malformed record: {}", e);
					break;
				}
			}
		}
		Ok(counts)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collaborators::{JsonBlobCodec, SimpleBlob};
	use serial_test::serial;
	use tempfile::tempdir;

	fn store(dir: &std::path::Path) -> WalletStore<SimpleBlob, JsonBlobCodec> {
		WalletStore::new(dir.join("wallet.bin"), JsonBlobCodec)
	}

	fn blob(value: i32, id: u8) -> SimpleBlob {
		SimpleBlob {
			value,
			id: vec![id],
		}
	}

	#[test]
	#[serial]
	fn take_on_empty_wallet_is_none_without_mutation() {
		let dir = tempdir().unwrap();
		let w = store(dir.path());
		assert!(w.take_by_value(4).unwrap().is_none());
	}

	#[test]
	#[serial]
	fn append_then_take_round_trips() {
		let dir = tempdir().unwrap();
		let w = store(dir.path());
		w.append(&blob(4, 1)).unwrap();
		w.append(&blob(5, 2)).unwrap();
		w.append(&blob(4, 3)).unwrap();

		let taken = w.take_by_value(4).unwrap().unwrap();
		assert_eq!(taken.id, vec![1]); // first match, in file order

		let counts = w.count_by_value(ValueRange { min: 0, max: 10 }).unwrap();
		assert_eq!(counts.get(&4), Some(&1));
		assert_eq!(counts.get(&5), Some(&1));
	}

	#[test]
	#[serial]
	fn take_shifts_tail_and_truncates() {
		let dir = tempdir().unwrap();
		let w = store(dir.path());
		for i in 0..5u8 {
			w.append(&blob(1, i)).unwrap();
		}
		w.take_by_value(1).unwrap();
		w.take_by_value(1).unwrap();

		let mut remaining = Vec::new();
		let mut count = 0;
		while let Some(b) = w.take_by_value(1).unwrap() {
			remaining.push(b.id[0]);
			count += 1;
		}
		assert_eq!(count, 3);
		assert_eq!(remaining, vec![2, 3, 4]);
	}

	#[test]
	#[serial]
	fn out_of_range_values_are_skipped_not_removed() {
		let dir = tempdir().unwrap();
		let w = store(dir.path());
		w.append(&blob(100, 1)).unwrap();
		w.append(&blob(4, 2)).unwrap();

		let counts = w.count_by_value(ValueRange { min: 0, max: 10 }).unwrap();
		assert_eq!(counts.get(&100), None);
		assert_eq!(counts.get(&4), Some(&1));

		// still present, just not counted
		let taken = w.take_by_value(100).unwrap();
		assert!(taken.is_some());
	}

	#[test]
	#[serial]
	fn delete_removes_file_idempotently() {
		let dir = tempdir().unwrap();
		let w = store(dir.path());
		w.append(&blob(1, 1)).unwrap();
		w.delete().unwrap();
		assert!(!w.path().exists());
		w.delete().unwrap(); // idempotent
	}
}
