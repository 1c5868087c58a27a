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

//! Consolidation / breaking planner: chooses sequences of C6
//! exchanges to merge small denominations upward or split a large one
//! down to a requested value, plus the continuous generator's adaptive
//! tuning rule.
//!
//! Denominations are a base-2 logarithmic scale: a unit of value `v` is
//! worth `2^v`, so `k` units of `v` combine into one unit of `v+log2(k)`
//! for `k` in `{2,4,8}`.

use std::time::{Duration, Instant};

use log::info;

use crate::collaborators::{BlobCodec, RpowBlob, SignerClient};
use crate::config::ValueRange;
use crate::error::{Error, ErrorKind};
use crate::exchange::{self, acquire};
use crate::wallet::WalletStore;

const BATCH_SIZE: usize = 8;
const FAST_BATCH: Duration = Duration::from_secs(10 * 60);
const SLOW_BATCH: Duration = Duration::from_secs(60 * 60);

/// Repeatedly merge small denominations into larger ones: for each value
/// `v` from `range.min` up, exchange 8→1, 4→1, or 2→1 steps (largest
/// first) while the wallet holds enough units and the target
/// denomination stays within `range`. Returns the number of exchanges
/// performed.
pub fn consolidate<B, C, S>(
	wallet: &WalletStore<B, C>,
	signer: &S,
	range: ValueRange,
) -> Result<usize, Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	let mut total = 0usize;
	for v in range.min..=range.max {
		loop {
			let counts = wallet.count_by_value(range)?;
			let held = *counts.get(&v).unwrap_or(&0);
			let step = if held >= 8 && v + 3 <= range.max {
				Some((8, 3))
			} else if held >= 4 && v + 2 <= range.max {
				Some((4, 2))
			} else if held >= 2 && v < range.max {
				Some((2, 1))
			} else {
				None
			};
			let (count, inc) = match step {
				Some(s) => s,
				None => break,
			};
			let ins = vec![v; count];
			exchange::exchange(wallet, signer, &ins, &[v + inc])?;
			total += 1;
			info!("consolidate: merged {}x{} -> 1x{}", count, v, v + inc);
		}
	}
	Ok(total)
}

/// Obtain one unit of denomination `value` by repeatedly breaking the
/// smallest larger denomination the wallet holds down towards it: while
/// the chosen source `t` is more than 3 above `value`, exchange `1×t`
/// for `8×(t-3)`; then break the final `t` directly into
/// `min(8, 2^(t-value))` units of `value`. Leaves the produced units in
/// the wallet; callers that want to withdraw one use [`withdraw`].
pub fn break_down<B, C, S>(
	wallet: &WalletStore<B, C>,
	signer: &S,
	range: ValueRange,
	value: i32,
) -> Result<(), Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	let counts = wallet.count_by_value(range)?;
	let mut t = None;
	for candidate in (value + 1)..=range.max {
		if *counts.get(&candidate).unwrap_or(&0) >= 1 {
			t = Some(candidate);
			break;
		}
	}
	let mut t = t.ok_or(ErrorKind::TokenNotFound(value))?;

	while t > value + 3 {
		exchange::exchange(wallet, signer, &[t], &[t - 3; BATCH_SIZE])?;
		info!("break: split 1x{} -> 8x{}", t, t - 3);
		t -= 3;
	}

	let want = (1u32 << (t - value) as u32).min(BATCH_SIZE as u32) as usize;
	let outs = vec![value; want];
	exchange::exchange(wallet, signer, &[t], &outs)?;
	Ok(())
}

/// Withdraw one unit of `value` from the wallet, breaking a larger
/// denomination first if none is held directly.
pub fn withdraw<B, C, S>(
	wallet: &WalletStore<B, C>,
	signer: &S,
	range: ValueRange,
	value: i32,
) -> Result<B, Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	if let Some(blob) = wallet.take_by_value(value)? {
		return Ok(blob);
	}
	break_down(wallet, signer, range, value)?;
	wallet
		.take_by_value(value)?
		.ok_or_else(|| ErrorKind::TokenNotFound(value).into())
}

/// One iteration of the continuous generator: acquire 8 fresh RPOWs at
/// `genval`, immediately exchange them for one of `genval+3`, and return
/// the tuned `genval` for the next iteration based on how long the batch
/// took.
pub fn generate_once<B, C, S>(
	wallet: &WalletStore<B, C>,
	signer: &S,
	range: ValueRange,
	genval: i32,
) -> Result<(i32, B), Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	let start = Instant::now();
	for _ in 0..BATCH_SIZE {
		acquire(wallet, signer, genval)?;
	}
	let mut out = exchange::exchange(wallet, signer, &[genval; BATCH_SIZE], &[genval + 3])?;
	let elapsed = start.elapsed();
	let blob = out
		.pop()
		.ok_or_else(|| ErrorKind::RemoteExchange("signer returned no output".into()))?;
	let next_genval = tune_genval(genval, elapsed, range);
	info!(
		"generate: batch of {} at value {} took {:?}, next genval {}",
		BATCH_SIZE, genval, elapsed, next_genval
	);
	Ok((next_genval, blob))
}

/// Adjust `genval` towards the denomination whose batch takes between 10
/// and 60 minutes: speed up (go smaller is not an option here, so go
/// larger) on a fast batch, back off on a slow one.
fn tune_genval(genval: i32, elapsed: Duration, range: ValueRange) -> i32 {
	if elapsed < FAST_BATCH && genval < range.max {
		genval + 1
	} else if elapsed > SLOW_BATCH && genval > range.min {
		genval - 1
	} else {
		genval
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collaborators::{JsonBlobCodec, SimpleBlob};
	use serial_test::serial;
	use std::cell::RefCell;
	use tempfile::tempdir;

	struct MockSigner {
		next_id: RefCell<u8>,
	}

	impl SignerClient<SimpleBlob> for MockSigner {
		fn gen(&self, value: i32) -> Result<SimpleBlob, Error> {
			let mut id = self.next_id.borrow_mut();
			*id += 1;
			Ok(SimpleBlob { value, id: vec![*id] })
		}

		fn exchange(&self, _ins: &[SimpleBlob], outs: &[i32]) -> Result<Vec<SimpleBlob>, Error> {
			let mut out_blobs = Vec::new();
			for &v in outs {
				let mut id = self.next_id.borrow_mut();
				*id += 1;
				out_blobs.push(SimpleBlob { value: v, id: vec![*id] });
			}
			Ok(out_blobs)
		}

		fn fetch_keys(&self, _force: bool) -> Result<(), Error> {
			Ok(())
		}

		fn status(&self) -> Result<String, Error> {
			Ok("ok".into())
		}
	}

	fn range() -> ValueRange {
		ValueRange { min: 1, max: 50 }
	}

	#[test]
	#[serial]
	fn consolidate_merges_eight_into_one_three_up() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		for i in 0..8u8 {
			wallet.append(&SimpleBlob { value: 4, id: vec![i] }).unwrap();
		}
		let signer = MockSigner { next_id: RefCell::new(100) };

		let count = consolidate(&wallet, &signer, range()).unwrap();
		assert_eq!(count, 1);

		let counts = wallet.count_by_value(range()).unwrap();
		assert_eq!(counts.get(&4), None);
		assert_eq!(counts.get(&7), Some(&1));
	}

	#[test]
	#[serial]
	fn consolidate_falls_back_to_smaller_steps() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		for i in 0..3u8 {
			wallet.append(&SimpleBlob { value: 4, id: vec![i] }).unwrap();
		}
		let signer = MockSigner { next_id: RefCell::new(100) };

		let count = consolidate(&wallet, &signer, range()).unwrap();
		assert_eq!(count, 1);

		let counts = wallet.count_by_value(range()).unwrap();
		assert_eq!(counts.get(&4), Some(&1));
		assert_eq!(counts.get(&5), Some(&1));
	}

	#[test]
	#[serial]
	fn consolidate_respects_value_max() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		let tight_range = ValueRange { min: 1, max: 6 };
		for i in 0..8u8 {
			wallet.append(&SimpleBlob { value: 4, id: vec![i] }).unwrap();
		}
		let signer = MockSigner { next_id: RefCell::new(100) };

		// v+3 = 7 exceeds max=6, so only the 4-unit (v+2=6) step applies,
		// and it applies twice to consume all 8 held units of 4.
		let count = consolidate(&wallet, &signer, tight_range).unwrap();
		assert_eq!(count, 2);
		let counts = wallet.count_by_value(tight_range).unwrap();
		assert_eq!(counts.get(&4), None);
		assert_eq!(counts.get(&6), Some(&2));
	}

	#[test]
	#[serial]
	fn break_down_splits_larger_denomination() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		wallet.append(&SimpleBlob { value: 10, id: vec![1] }).unwrap();
		let signer = MockSigner { next_id: RefCell::new(100) };

		break_down(&wallet, &signer, range(), 4).unwrap();

		// 10 -> 8x7 -> then break one 7 into 8x4
		let counts = wallet.count_by_value(range()).unwrap();
		assert_eq!(counts.get(&4), Some(&8));
		assert_eq!(counts.get(&7), Some(&7));
	}

	#[test]
	#[serial]
	fn withdraw_takes_directly_when_already_held() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		wallet.append(&SimpleBlob { value: 4, id: vec![7] }).unwrap();
		let signer = MockSigner { next_id: RefCell::new(100) };

		let blob = withdraw(&wallet, &signer, range(), 4).unwrap();
		assert_eq!(blob.id, vec![7]);
		assert!(!wallet.count_by_value(range()).unwrap().contains_key(&4));
	}

	#[test]
	#[serial]
	fn withdraw_auto_breaks_when_absent() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		wallet.append(&SimpleBlob { value: 10, id: vec![1] }).unwrap();
		let signer = MockSigner { next_id: RefCell::new(100) };

		let blob = withdraw(&wallet, &signer, range(), 4).unwrap();
		assert_eq!(blob.value, 4);

		let counts = wallet.count_by_value(range()).unwrap();
		assert_eq!(counts.get(&4), Some(&7));
	}

	#[test]
	#[serial]
	fn break_down_fails_when_no_larger_denomination_held() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		let signer = MockSigner { next_id: RefCell::new(100) };

		let err = break_down(&wallet, &signer, range(), 4).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::TokenNotFound(4));
	}

	#[test]
	fn tune_genval_speeds_up_on_fast_batch() {
		let r = range();
		assert_eq!(tune_genval(10, Duration::from_secs(60), r), 11);
	}

	#[test]
	fn tune_genval_backs_off_on_slow_batch() {
		let r = range();
		assert_eq!(tune_genval(10, Duration::from_secs(4000), r), 9);
	}

	#[test]
	fn tune_genval_clamps_to_range() {
		let r = range();
		assert_eq!(tune_genval(r.max, Duration::from_secs(60), r), r.max);
		assert_eq!(tune_genval(r.min, Duration::from_secs(4000), r), r.min);
	}

	#[test]
	#[serial]
	fn generate_once_mints_a_batch_and_tunes_genval() {
		let dir = tempdir().unwrap();
		let wallet = WalletStore::new(dir.path().join("wallet.bin"), JsonBlobCodec);
		let signer = MockSigner { next_id: RefCell::new(0) };

		let (next_genval, blob) = generate_once(&wallet, &signer, range(), 4).unwrap();
		assert_eq!(blob.value, 7);
		assert_eq!(next_genval, 5); // fast in tests, increments

		let counts = wallet.count_by_value(range()).unwrap();
		assert_eq!(counts.get(&7), Some(&1));
	}
}
