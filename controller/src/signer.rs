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

//! Network signer client: a length-prefixed JSON request/response
//! protocol over TCP, implementing `SignerClient`. The wire protocol of
//! a real signing service is out of scope; this is the concrete
//! transport the CLI ships with, built on the same framing
//! [`JsonBlobCodec`](rpow_libwallet::JsonBlobCodec) already uses for the
//! wallet file.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use log::debug;
use rpow_libwallet::{Error, ErrorKind, SignerClient, SimpleBlob};
use serde::{Deserialize, Serialize};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(tag = "op")]
enum Request {
	Gen { value: i32 },
	Exchange { ins: Vec<SimpleBlob>, outs: Vec<i32> },
	FetchKeys { force: bool },
	Status,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "result")]
enum Response {
	Blob(SimpleBlob),
	Blobs(Vec<SimpleBlob>),
	Keys(Vec<u8>),
	Status(String),
	Error { message: String },
}

/// A signer reachable over TCP at `host:port`.
pub struct NetworkSigner {
	host: String,
	port: u16,
}

impl NetworkSigner {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		NetworkSigner { host: host.into(), port }
	}

	fn roundtrip(&self, req: &Request) -> Result<Response, Error> {
		let addr = format!("{}:{}", self.host, self.port);
		let mut stream = TcpStream::connect_timeout(
			&addr
				.parse()
				.map_err(|e| ErrorKind::RemoteExchange(format!("bad signer address: {}", e)))?,
			CONNECT_TIMEOUT,
		)
		.map_err(|e| ErrorKind::RemoteExchange(format!("connect to {}: {}", addr, e)))?;

		let body = serde_json::to_vec(req)
			.map_err(|e| ErrorKind::RemoteExchange(format!("encoding request: {}", e)))?;
		stream
			.write_all(&(body.len() as u32).to_le_bytes())
			.map_err(|e| ErrorKind::RemoteExchange(e.to_string()))?;
		stream
			.write_all(&body)
			.map_err(|e| ErrorKind::RemoteExchange(e.to_string()))?;

		let mut len_buf = [0u8; 4];
		stream
			.read_exact(&mut len_buf)
			.map_err(|e| ErrorKind::RemoteExchange(format!("reading response length: {}", e)))?;
		let len = u32::from_le_bytes(len_buf) as usize;
		let mut buf = vec![0u8; len];
		stream
			.read_exact(&mut buf)
			.map_err(|e| ErrorKind::RemoteExchange(format!("reading response body: {}", e)))?;

		let resp: Response = serde_json::from_slice(&buf)
			.map_err(|e| ErrorKind::RemoteExchange(format!("decoding response: {}", e)))?;
		debug!("signer request {:?} -> {:?}", req, resp);
		if let Response::Error { message } = resp {
			return Err(ErrorKind::RemoteExchange(message).into());
		}
		Ok(resp)
	}
}

impl SignerClient<SimpleBlob> for NetworkSigner {
	fn gen(&self, value: i32) -> Result<SimpleBlob, Error> {
		match self.roundtrip(&Request::Gen { value })? {
			Response::Blob(b) => Ok(b),
			other => Err(ErrorKind::RemoteExchange(format!("unexpected response {:?}", other)).into()),
		}
	}

	fn exchange(&self, ins: &[SimpleBlob], outs: &[i32]) -> Result<Vec<SimpleBlob>, Error> {
		match self.roundtrip(&Request::Exchange { ins: ins.to_vec(), outs: outs.to_vec() })? {
			Response::Blobs(bs) => Ok(bs),
			other => Err(ErrorKind::RemoteExchange(format!("unexpected response {:?}", other)).into()),
		}
	}

	fn fetch_keys(&self, force: bool) -> Result<(), Error> {
		match self.roundtrip(&Request::FetchKeys { force })? {
			Response::Keys(_) => Ok(()),
			other => Err(ErrorKind::RemoteExchange(format!("unexpected response {:?}", other)).into()),
		}
	}

	fn status(&self) -> Result<String, Error> {
		match self.roundtrip(&Request::Status)? {
			Response::Status(s) => Ok(s),
			other => Err(ErrorKind::RemoteExchange(format!("unexpected response {:?}", other)).into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::TcpListener;
	use std::thread;

	fn serve_once(listener: TcpListener, response: Response) {
		thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			let mut len_buf = [0u8; 4];
			stream.read_exact(&mut len_buf).unwrap();
			let len = u32::from_le_bytes(len_buf) as usize;
			let mut buf = vec![0u8; len];
			stream.read_exact(&mut buf).unwrap();

			let body = serde_json::to_vec(&response).unwrap();
			stream.write_all(&(body.len() as u32).to_le_bytes()).unwrap();
			stream.write_all(&body).unwrap();
		});
	}

	#[test]
	fn gen_round_trips_through_tcp() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		serve_once(listener, Response::Blob(SimpleBlob { value: 4, id: vec![9] }));

		let signer = NetworkSigner::new("127.0.0.1", port);
		let blob = signer.gen(4).unwrap();
		assert_eq!(blob.value, 4);
		assert_eq!(blob.id, vec![9]);
	}

	#[test]
	fn server_error_surfaces_as_remote_exchange_error() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		serve_once(listener, Response::Error { message: "insufficient reserve".into() });

		let signer = NetworkSigner::new("127.0.0.1", port);
		let err = signer.status().unwrap_err();
		match err.kind() {
			ErrorKind::RemoteExchange(msg) => assert!(msg.contains("insufficient reserve")),
			other => panic!("unexpected kind {:?}", other),
		}
	}
}
