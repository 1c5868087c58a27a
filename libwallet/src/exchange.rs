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

//! Exchange orchestrator: take inputs from the wallet by value,
//! hand them to the remote signer, and append whatever comes back. Any
//! failure between the first `take` and the last `append` rolls back by
//! re-appending every input already taken.

use log::{error, info, warn};

use crate::collaborators::{BlobCodec, RpowBlob, SignerClient};
use crate::error::{Error, ErrorKind};
use crate::wallet::WalletStore;

/// Exchange `ins` (value vector, one entry per input to take) for
/// freshly minted blobs of the denominations in `outs`, via `signer`.
/// Conservation of value is the signer's invariant, not checked here;
/// this function passes the caller's vectors through unchanged.
pub fn exchange<B, C, S>(
	wallet: &WalletStore<B, C>,
	signer: &S,
	ins: &[i32],
	outs: &[i32],
) -> Result<Vec<B>, Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	let mut taken: Vec<B> = Vec::with_capacity(ins.len());

	for &v in ins {
		match wallet.take_by_value(v)? {
			Some(blob) => taken.push(blob),
			None => {
				warn!("exchange: no token of value {} available, rolling back", v);
				rollback(wallet, &taken);
				return Err(ErrorKind::TokenNotFound(v).into());
			}
		}
	}

	match signer.exchange(&taken, outs) {
		Ok(new_blobs) => {
			for blob in &new_blobs {
				if let Err(e) = wallet.append(blob) {
					// The signer already committed the exchange server-side;
					// a local append failure here cannot be rolled back
					// without risking double-spend, so it is surfaced as-is
					// rather than re-taking already-appended outputs.
					error!("exchange: failed to append new token after signer success: {}", e);
					return Err(e);
				}
			}
			info!("exchange: {} in, {} out", taken.len(), new_blobs.len());
			Ok(new_blobs)
		}
		Err(e) => {
			warn!("exchange: signer rejected request, rolling back: {}", e);
			rollback(wallet, &taken);
			Err(ErrorKind::RemoteExchange(e.to_string()).into())
		}
	}
}

/// Acquire one freshly signed RPOW of denomination `value`: generate a
/// local candidate (stands in for `rpow_gen`) and submit it as the sole
/// input of an exchange requesting the same value, the pattern the
/// source's `dogen` uses for initial acquisition.
pub fn acquire<B, C, S>(wallet: &WalletStore<B, C>, signer: &S, value: i32) -> Result<B, Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	let candidate = signer.gen(value)?;
	submit_external(wallet, signer, candidate)
}

/// Submit a blob obtained from outside this wallet (e.g. over stdin, the
/// source's `doin`) for re-signing at its own denomination, and append
/// the result. Does not take anything from the wallet; a signer failure
/// simply propagates, since no wallet state has changed yet.
pub fn submit_external<B, C, S>(
	wallet: &WalletStore<B, C>,
	signer: &S,
	external: B,
) -> Result<B, Error>
where
	B: RpowBlob,
	C: BlobCodec<B>,
	S: SignerClient<B>,
{
	let value = external.value();
	let mut new_blobs = signer
		.exchange(std::slice::from_ref(&external), &[value])
		.map_err(|e| ErrorKind::RemoteExchange(e.to_string()))?;
	let blob = new_blobs
		.pop()
		.ok_or_else(|| ErrorKind::RemoteExchange("signer returned no output".into()))?;
	wallet.append(&blob)?;
	Ok(blob)
}

/// Re-append every blob already taken, in reverse order, restoring the
/// wallet to its pre-call state. A failure while rolling back is logged
/// but not retried further; it is the worst case this design accepts,
/// since the blobs are still held in memory by the caller's stack frame.
fn rollback<B, C>(wallet: &WalletStore<B, C>, taken: &[B])
where
	B: RpowBlob,
	C: BlobCodec<B>,
{
	for blob in taken.iter().rev() {
		if let Err(e) = wallet.append(blob) {
			error!("exchange rollback: failed to restore token value={}: {}", blob.value(), e);
		}
	}
}
