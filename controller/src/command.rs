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

//! One function per CLI command, independent of argument parsing so
//! they can be unit tested without going through `clap`.

use std::io::{Read, Write};

use log::info;
use rpow_libwallet::{
	self as lib, Config, JsonBlobCodec, SignerClient, SimpleBlob, ValueRange, WalletStore,
};

use crate::display;
use crate::error::{Error, ErrorKind};

fn open_wallet(cfg: &Config) -> WalletStore<SimpleBlob, JsonBlobCodec> {
	WalletStore::new(cfg.resolved_wallet_path(), JsonBlobCodec)
}

/// `getkeys`: fetch and validate signer keys, resetting any existing
/// wallet. Must run before any other command.
pub fn getkeys<S: SignerClient<SimpleBlob>>(cfg: &Config, signer: &S) -> Result<(), Error> {
	signer.fetch_keys(true)?;
	let wallet = open_wallet(cfg);
	wallet.delete()?;
	info!("fetched signer keys, wallet reset");
	Ok(())
}

/// `rekey`: refresh signer keys, preserving the wallet.
pub fn rekey<S: SignerClient<SimpleBlob>>(signer: &S) -> Result<(), Error> {
	signer.fetch_keys(false)?;
	Ok(())
}

/// `status`: fetch and print signer status.
pub fn status<S: SignerClient<SimpleBlob>>(signer: &S) -> Result<String, Error> {
	Ok(signer.status()?)
}

/// `gen v`: mint one RPOW of value `v`.
pub fn gen<S: SignerClient<SimpleBlob>>(
	cfg: &Config,
	signer: &S,
	value: i32,
) -> Result<SimpleBlob, Error> {
	let wallet = open_wallet(cfg);
	Ok(lib::acquire(&wallet, signer, value)?)
}

/// `exchange v1..vn 0 w1..wm`: swap `ins` for `outs`.
pub fn exchange<S: SignerClient<SimpleBlob>>(
	cfg: &Config,
	signer: &S,
	ins: &[i32],
	outs: &[i32],
) -> Result<Vec<SimpleBlob>, Error> {
	let wallet = open_wallet(cfg);
	Ok(lib::do_exchange(&wallet, signer, ins, outs)?)
}

/// `consolidate`: apply the consolidation plan once.
pub fn consolidate<S: SignerClient<SimpleBlob>>(cfg: &Config, signer: &S) -> Result<usize, Error> {
	let wallet = open_wallet(cfg);
	Ok(lib::consolidate(&wallet, signer, cfg.value_range)?)
}

/// `out v`: withdraw one RPOW of value `v`, auto-breaking a larger
/// denomination if none is held directly. Returns the base64-encoded
/// blob ready to print to stdout.
pub fn out<S: SignerClient<SimpleBlob>>(
	cfg: &Config,
	signer: &S,
	value: i32,
) -> Result<String, Error> {
	let wallet = open_wallet(cfg);
	let blob = lib::withdraw(&wallet, signer, cfg.value_range, value)?;
	let bytes = serde_json::to_vec(&blob)
		.map_err(|e| ErrorKind::Usage(format!("encoding withdrawn token: {}", e)))?;
	Ok(base64::encode(bytes))
}

/// `in`: read an external RPOW from `reader` (base64), resubmit it for
/// signing at its own denomination, and append the result.
pub fn in_<S: SignerClient<SimpleBlob>>(
	cfg: &Config,
	signer: &S,
	reader: &mut dyn Read,
) -> Result<SimpleBlob, Error> {
	let mut text = String::new();
	reader
		.read_to_string(&mut text)
		.map_err(|e| ErrorKind::Io(e.to_string()))?;
	let bytes = base64::decode(text.trim())
		.map_err(|e| ErrorKind::Usage(format!("invalid base64 input: {}", e)))?;
	let external: SimpleBlob = serde_json::from_slice(&bytes)
		.map_err(|e| ErrorKind::Usage(format!("invalid rpow format: {}", e)))?;

	let wallet = open_wallet(cfg);
	Ok(lib::submit_external(&wallet, signer, external)?)
}

/// `count`: per-denomination counts currently held.
pub fn count(cfg: &Config) -> Result<std::collections::HashMap<i32, usize>, Error> {
	let wallet = open_wallet(cfg);
	Ok(wallet.count_by_value(cfg.value_range)?)
}

/// `gencontin`: run the continuous generator forever, printing progress
/// after each batch. Stops only on a hard error from the signer.
pub fn gencontin<S: SignerClient<SimpleBlob>>(
	cfg: &Config,
	signer: &S,
	starting_genval: i32,
	out: &mut dyn Write,
) -> Result<(), Error> {
	let wallet = open_wallet(cfg);
	let mut genval = starting_genval.clamp(cfg.value_range.min, cfg.value_range.max);
	loop {
		let (next_genval, blob) = lib::generate_once(&wallet, signer, cfg.value_range, genval)?;
		display::print_generated(out, &blob)?;
		genval = next_genval;
	}
}

fn range_ok(range: ValueRange, v: i32) -> bool {
	v >= range.min && v <= range.max
}

/// Parse the `exchange` command's `v1 v2 .. 0 w1 w2 ..` argument shape
/// into input/output value vectors, validating every value against
/// `range`.
pub fn parse_exchange_args(args: &[i32], range: ValueRange) -> Result<(Vec<i32>, Vec<i32>), Error> {
	let sep = args
		.iter()
		.position(|&v| v == 0)
		.ok_or_else(|| ErrorKind::Usage("exchange requires a 0 separator between in/out lists".into()))?;
	let (ins, rest) = args.split_at(sep);
	let outs = &rest[1..];
	for &v in ins.iter().chain(outs.iter()) {
		if !range_ok(range, v) {
			return Err(ErrorKind::Usage(format!("value {} out of range", v)).into());
		}
	}
	Ok((ins.to_vec(), outs.to_vec()))
}
