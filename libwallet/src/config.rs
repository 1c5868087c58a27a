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

//! Client configuration. Replaces the source's global `signkey`,
//! `rpowfile`, `targethost`/`targetport` and `initfilenames` with an
//! explicit value the caller constructs once and threads through the
//! orchestrator.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind};

/// Name of the environment variable that overrides the configured wallet
/// path, the one piece of `initfilenames`'s environment-sensitivity this
/// implementation keeps (deliberately, as an operational escape hatch).
pub const WALLET_PATH_ENV: &str = "RPOW_WALLET_FILE";

/// Inclusive bounds on RPOW denomination values. The signing service owns
/// these in the source; this client treats them as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
	/// Smallest denomination the signer will mint or accept.
	pub min: i32,
	/// Largest denomination the signer will mint or accept.
	pub max: i32,
}

impl Default for ValueRange {
	fn default() -> Self {
		ValueRange { min: 1, max: 50 }
	}
}

/// Client configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	/// Path to the wallet file (the local append-only token store).
	pub wallet_path: PathBuf,
	/// Path to the signer's public key file.
	pub signing_key_path: PathBuf,
	/// Signer host name or address.
	pub signer_host: String,
	/// Signer port.
	pub signer_port: u16,
	/// Default hashcash validity period, in seconds (0 = forever).
	#[serde(default)]
	pub default_validity_period: i64,
	/// Default grace period applied around the validity window.
	#[serde(default)]
	pub default_grace_period: i64,
	/// Default number of collision bits required for a mint.
	#[serde(default = "default_required_bits")]
	pub default_required_bits: u32,
	/// Valid denomination range.
	#[serde(default)]
	pub value_range: ValueRange,
}

fn default_required_bits() -> u32 {
	20
}

impl Config {
	/// Load configuration from a TOML file at `path`.
	pub fn from_file(path: &Path) -> Result<Config, Error> {
		let text = std::fs::read_to_string(path)
			.map_err(|e| ErrorKind::Config(format!("reading {}: {}", path.display(), e)))?;
		toml::from_str(&text).map_err(|e| ErrorKind::Config(e.to_string()).into())
	}

	/// Resolve the wallet path, honoring [`WALLET_PATH_ENV`] as an
	/// override of the configured value.
	pub fn resolved_wallet_path(&self) -> PathBuf {
		std::env::var(WALLET_PATH_ENV)
			.map(PathBuf::from)
			.unwrap_or_else(|_| self.wallet_path.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_toml() {
		let toml = r#"
            wallet_path = "wallet.bin"
            signing_key_path = "signer.pub"
            signer_host = "rpow.example.invalid"
            signer_port = 3000
        "#;
		let cfg: Config = toml::from_str(toml).unwrap();
		assert_eq!(cfg.default_required_bits, 20);
		assert_eq!(cfg.value_range, ValueRange::default());
	}

	#[test]
	fn env_override_wins() {
		let cfg = Config {
			wallet_path: PathBuf::from("configured.bin"),
			signing_key_path: PathBuf::from("k"),
			signer_host: "h".into(),
			signer_port: 1,
			default_validity_period: 0,
			default_grace_period: 0,
			default_required_bits: 20,
			value_range: ValueRange::default(),
		};
		unsafe { std::env::set_var(WALLET_PATH_ENV, "/tmp/override.bin") };
		assert_eq!(cfg.resolved_wallet_path(), PathBuf::from("/tmp/override.bin"));
		unsafe { std::env::remove_var(WALLET_PATH_ENV) };
		assert_eq!(cfg.resolved_wallet_path(), PathBuf::from("configured.bin"));
	}
}
