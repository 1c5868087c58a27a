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

//! `rpowcli`: command-line dispatcher for the wallet client.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;
use rpow_controller::command;
use rpow_controller::display;
use rpow_controller::error::{exit_code, Error, ErrorKind};
use rpow_controller::signer::NetworkSigner;
use rpow_libwallet::Config;

#[derive(Parser)]
#[command(name = "rpowcli", about = "Reusable Proof of Work wallet client")]
struct Args {
	/// Path to the TOML configuration file.
	#[arg(long, default_value = "rpow.toml")]
	config: PathBuf,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Fetch and validate signer keys; resets any existing wallet.
	Getkeys,
	/// Refresh signer keys, preserving the wallet.
	Rekey,
	/// Fetch and print signer status.
	Status,
	/// Mint one RPOW of the given value.
	Gen { value: i32 },
	/// Run the continuous generator.
	Gencontin {
		#[arg(long, default_value_t = 10)]
		start_value: i32,
	},
	/// Exchange a list of input values for a list of output values,
	/// separated by a literal `0`.
	Exchange { values: Vec<i32> },
	/// Apply the consolidation plan.
	Consolidate,
	/// Accept an external RPOW from stdin (base64), re-sign, and append.
	In,
	/// Withdraw one RPOW of the given value, base64 to stdout.
	Out { value: i32 },
	/// Print per-denomination counts.
	Count,
}

fn run(args: Args) -> Result<(), Error> {
	let cfg = Config::from_file(&args.config)
		.map_err(|e| ErrorKind::Usage(format!("loading config: {}", e)))?;
	let signer = NetworkSigner::new(cfg.signer_host.clone(), cfg.signer_port);
	let stdout = io::stdout();
	let mut out = stdout.lock();

	match args.command {
		Command::Getkeys => command::getkeys(&cfg, &signer),
		Command::Rekey => command::rekey(&signer),
		Command::Status => {
			let text = command::status(&signer)?;
			println!("{}", text);
			Ok(())
		}
		Command::Gen { value } => {
			let blob = command::gen(&cfg, &signer, value)?;
			println!("minted value {}", blob.value);
			Ok(())
		}
		Command::Gencontin { start_value } => {
			command::gencontin(&cfg, &signer, start_value, &mut out).map_err(|e| {
				error!("generator stopped: {}", e);
				e
			})
		}
		Command::Exchange { values } => {
			let (ins, outs) = command::parse_exchange_args(&values, cfg.value_range)?;
			let new_blobs = command::exchange(&cfg, &signer, &ins, &outs)?;
			println!("exchanged {} for {} tokens", ins.len(), new_blobs.len());
			Ok(())
		}
		Command::Consolidate => {
			let n = command::consolidate(&cfg, &signer)?;
			println!("performed {} consolidating exchanges", n);
			Ok(())
		}
		Command::In => {
			let mut stdin = io::stdin();
			let blob = command::in_(&cfg, &signer, &mut stdin)?;
			println!("accepted value {}", blob.value);
			Ok(())
		}
		Command::Out { value } => {
			let encoded = command::out(&cfg, &signer, value)?;
			println!("{}", encoded);
			Ok(())
		}
		Command::Count => {
			let counts = command::count(&cfg)?;
			display::print_counts(&mut out, &counts).map_err(|e| ErrorKind::Io(e.to_string()))?;
			Ok(())
		}
	}
}

fn main() -> ExitCode {
	env_logger::init();
	let args = Args::parse();
	match run(args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("rpowcli: {}", e);
			ExitCode::from(exit_code(e.exit_category()) as u8)
		}
	}
}
