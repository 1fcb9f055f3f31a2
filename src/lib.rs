//! Validated account requests and mutual-TLS secret provisioning for Vault-style KV v2
//! engines: role login, token-scoped reads, and check-and-set guarded writes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
pub mod auth;
pub mod channel;
pub mod error;
pub mod http;
pub mod obs;
pub mod provision;
pub mod secret;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		account::{AccountRequest, CasMode, NewAccount},
		channel::{MtlsChannel, Session, TlsMaterial},
	};

	/// PEM bundle of the test root CA shipped under `tests/fixtures/tls`.
	pub const FIXTURE_CA_ROOT: &[u8] =
		include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tls/ca-root.pem"));
	/// Client certificate chain signed by [`FIXTURE_CA_ROOT`].
	pub const FIXTURE_CLIENT_CHAIN: &[u8] =
		include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tls/client-chain.pem"));
	/// PKCS#8 private key matching [`FIXTURE_CLIENT_CHAIN`].
	pub const FIXTURE_CLIENT_KEY: &[u8] =
		include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tls/client.key"));

	/// Server certificate chain for `127.0.0.1`/`localhost`, signed by [`FIXTURE_CA_ROOT`].
	pub const FIXTURE_SERVER_CHAIN: &[u8] =
		include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tls/server-chain.pem"));
	/// PKCS#8 private key matching [`FIXTURE_SERVER_CHAIN`].
	pub const FIXTURE_SERVER_KEY: &[u8] =
		include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tls/server.key"));
	/// Unrelated root CA that signed neither fixture chain.
	pub const FIXTURE_FOREIGN_CA: &[u8] =
		include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tls/foreign-ca.pem"));

	/// Token returned by mock login handlers.
	pub const MOCK_CLIENT_TOKEN: &str = "authToken";

	/// Loads the fixture trust material.
	pub fn fixture_tls_material() -> TlsMaterial {
		TlsMaterial::from_pem(FIXTURE_CA_ROOT, FIXTURE_CLIENT_CHAIN, FIXTURE_CLIENT_KEY)
			.expect("Fixture TLS material should parse.")
	}

	/// Builds an mTLS channel over the fixture trust material.
	pub fn fixture_channel() -> MtlsChannel {
		MtlsChannel::new(fixture_tls_material())
	}

	/// Builds a plain-HTTP session against a mock server (`httpmock` serves plaintext).
	pub fn test_session(base_url: &str) -> Session {
		let endpoint = Url::parse(base_url).expect("Mock server URL should parse.");
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.danger_accept_invalid_certs(true)
			.build()
			.expect("Failed to build plain Reqwest client for tests.");

		Session::with_client(endpoint, client)
	}

	/// Minimum valid raw account request used across tests.
	pub fn minimum_valid_new_account() -> NewAccount {
		NewAccount {
			vault: Some("http://vault:1111".into()),
			secret_engine_path: "engine".into(),
			secret_path: "secret".into(),
			insecure_skip_cas: false,
			cas_value: 0,
		}
	}

	/// Validated request pointing at a mock server.
	pub fn account_request(
		base_url: &str,
		engine: &str,
		secret: &str,
		cas: CasMode,
	) -> AccountRequest {
		let (insecure_skip_cas, cas_value) = match cas {
			CasMode::Enforced(version) => (false, version),
			CasMode::SkipCheck => (true, 0),
		};

		NewAccount {
			vault: Some(base_url.into()),
			secret_engine_path: engine.into(),
			secret_path: secret.into(),
			insecure_skip_cas,
			cas_value,
		}
		.validate()
		.expect("Test account request should validate.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		sync::Arc,
	};

	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, rustls as _, tokio as _, tokio_rustls as _};
