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

//! Core library for the Reusable Proof of Work client: Hashcash v1
//! minting and verification, and the wallet/exchange state machine that
//! holds and moves signed RPOW tokens.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod exchange;
pub mod mint;
pub mod plan;
pub mod time;
pub mod token;
pub mod verify;
pub mod wallet;

pub use collaborators::{BlobCodec, JsonBlobCodec, RpowBlob, SignerClient, SimpleBlob};
pub use config::{Config, ValueRange, WALLET_PATH_ENV};
pub use error::{Error, ErrorKind};
pub use exchange::{acquire, exchange as do_exchange, submit_external};
pub use mint::{mint, Minted};
pub use plan::{break_down, consolidate, generate_once, withdraw};
pub use wallet::WalletStore;
