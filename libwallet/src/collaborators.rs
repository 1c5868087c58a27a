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

//! External collaborator seams: the network transport to the signing
//! service, and the opaque RPOW blob codec. The wire protocol is left
//! to a concrete implementation; this module gives both seams trait
//! shape so the wallet and exchange orchestrator can be built and tested
//! without a real network signer.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Minimal surface C5-C7 need from an opaque RPOW blob.
pub trait RpowBlob: Clone + std::fmt::Debug {
	/// Nominal denomination, the base-2 log of the work value.
	fn value(&self) -> i32;
	/// Unique identifier, used for diagnostics and server-side
	/// double-spend detection.
	fn id(&self) -> &[u8];
}

/// Stream codec for a blob type, standing in for the source's
/// `rpow_read`/`rpow_write`.
pub trait BlobCodec<B: RpowBlob> {
	/// Read one blob from `r`. Returns `Ok(None)` at a clean end of
	/// stream. A deserialization failure (as opposed to a clean EOF) is
	/// an `Err`, terminating the caller's scan without mutating anything
	/// already read.
	fn read_one(&self, r: &mut dyn Read) -> Result<Option<B>, Error>;

	/// Write one blob to `w`. Does not flush; callers control flush
	/// timing so they can hold the wallet lock across it.
	fn write_one(&self, w: &mut dyn Write, blob: &B) -> Result<(), Error>;
}

/// The remote signing service: mints new tokens from presented work,
/// performs exchanges, and reports key/status information. Stands in for
/// the source's `server_exchange`/`getkeys`/`getstat`.
pub trait SignerClient<B: RpowBlob> {
	/// Generate a local RPOW candidate of denomination `value`, standing
	/// in for the source's `rpow_gen`. The candidate is submitted as the
	/// sole input of an `exchange` call requesting the same value, the
	/// pattern the source's `dogen`/`doin` use for initial acquisition.
	fn gen(&self, value: i32) -> Result<B, Error>;

	/// Atomically exchange `ins` for freshly minted blobs of the
	/// denominations in `outs`. This call is the conservation-of-value
	/// and double-spend boundary; the client does not re-check it.
	fn exchange(&self, ins: &[B], outs: &[i32]) -> Result<Vec<B>, Error>;

	/// Fetch and validate the signer's public key material, writing it
	/// to local storage. `force` distinguishes `getkeys` (first run) from
	/// `rekey` (refresh).
	fn fetch_keys(&self, force: bool) -> Result<(), Error>;

	/// Fetch signer status as free-form text for display.
	fn status(&self) -> Result<String, Error>;
}

/// A concrete, shippable blob type: a denomination and an opaque id. Most
/// deployments of this client talk to a signer whose wire format is
/// proprietary; this type is what the bundled [`JsonBlobCodec`] persists
/// to the local wallet file, and is swapped out by pointing `WalletStore`
/// at a different `BlobCodec` when integrating with a real signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleBlob {
	/// Nominal denomination.
	pub value: i32,
	/// Unique identifier bytes.
	pub id: Vec<u8>,
}

impl RpowBlob for SimpleBlob {
	fn value(&self) -> i32 {
		self.value
	}

	fn id(&self) -> &[u8] {
		&self.id
	}
}

/// Length-prefixed JSON codec for [`SimpleBlob`]: a 4-byte little-endian
/// length followed by that many bytes of JSON. One `write_one` call
/// writes exactly one complete record, so a blob is never left partially
/// written in a readable state.
pub struct JsonBlobCodec;

impl BlobCodec<SimpleBlob> for JsonBlobCodec {
	fn read_one(&self, r: &mut dyn Read) -> Result<Option<SimpleBlob>, Error> {
		let mut len_buf = [0u8; 4];
		if !read_exact_or_eof(r, &mut len_buf)? {
			return Ok(None);
		}
		let len = u32::from_le_bytes(len_buf) as usize;
		let mut buf = vec![0u8; len];
		r.read_exact(&mut buf)
			.map_err(|e| crate::error::ErrorKind::WalletIo(e.to_string()))?;
		let blob: SimpleBlob = serde_json::from_slice(&buf)
			.map_err(|e| crate::error::ErrorKind::WalletIo(e.to_string()))?;
		Ok(Some(blob))
	}

	fn write_one(&self, w: &mut dyn Write, blob: &SimpleBlob) -> Result<(), Error> {
		let bytes = serde_json::to_vec(blob)
			.map_err(|e| crate::error::ErrorKind::WalletIo(e.to_string()))?;
		w.write_all(&(bytes.len() as u32).to_le_bytes())
			.map_err(|e| crate::error::ErrorKind::WalletIo(e.to_string()))?;
		w.write_all(&bytes)
			.map_err(|e| crate::error::ErrorKind::WalletIo(e.to_string()))?;
		Ok(())
	}
}

/// Reads exactly `buf.len()` bytes, returning `Ok(false)` if the stream
/// was already at a clean boundary (zero bytes available) and `Ok(true)`
/// once `buf` is filled. An EOF in the middle of `buf` is a malformed
/// record, propagated as an error rather than silently truncated.
fn read_exact_or_eof(r: &mut dyn Read, buf: &mut [u8]) -> Result<bool, Error> {
	let mut filled = 0;
	while filled < buf.len() {
		let n = r
			.read(&mut buf[filled..])
			.map_err(|e| crate::error::ErrorKind::WalletIo(e.to_string()))?;
		if n == 0 {
			if filled == 0 {
				return Ok(false);
			}
			return Err(crate::error::ErrorKind::WalletIo(
				"truncated wallet record".to_string(),
			)
			.into());
		}
		filled += n;
	}
	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn round_trips_simple_blob() {
		let codec = JsonBlobCodec;
		let blob = SimpleBlob {
			value: 4,
			id: vec![1, 2, 3],
		};
		let mut buf = Vec::new();
		codec.write_one(&mut buf, &blob).unwrap();

		let mut cursor = Cursor::new(buf);
		let read_back = codec.read_one(&mut cursor).unwrap().unwrap();
		assert_eq!(read_back, blob);
		assert!(codec.read_one(&mut cursor).unwrap().is_none());
	}

	#[test]
	fn truncated_record_errors_rather_than_eof() {
		let codec = JsonBlobCodec;
		let blob = SimpleBlob {
			value: 4,
			id: vec![1, 2, 3],
		};
		let mut buf = Vec::new();
		codec.write_one(&mut buf, &blob).unwrap();
		buf.truncate(buf.len() - 1);

		let mut cursor = Cursor::new(buf);
		assert!(codec.read_one(&mut cursor).is_err());
	}
}
