//! Account requests and the validation gate that runs before any network call.
//!
//! [`NewAccount`] is the raw, deserializable description a caller hands in.
//! [`NewAccount::validate`] applies three ordered rules (endpoint, secret location, CAS
//! consistency) and either returns a typed [`AccountRequest`] or the first
//! [`ValidationError`] that applies. Downstream components only accept [`AccountRequest`],
//! so a request can never reach the network without passing the gate.

pub mod cas;

pub use cas::*;

// self
use crate::{
	_prelude::*,
	obs::{self, Phase},
};

/// Validation failures. The `Display` strings are a stable external contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ThisError)]
pub enum ValidationError {
	/// Endpoint is missing or lacks a scheme or host.
	#[error("invalid vault url")]
	InvalidEndpoint,
	/// Engine path or secret path is empty.
	#[error("invalid secret location")]
	InvalidSecretLocation,
	/// `SkipCheck` was paired with a non-zero expected version.
	#[error("invalid cas")]
	InvalidCas,
}

/// Raw request to provision an account from a secrets engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
	/// Absolute URL of the secrets engine.
	#[serde(default)]
	pub vault: Option<String>,
	/// Mount path of the KV v2 engine.
	#[serde(default)]
	pub secret_engine_path: String,
	/// Path of the secret within the engine.
	#[serde(default)]
	pub secret_path: String,
	/// Disables check-and-set; `cas_value` must then stay zero.
	#[serde(default)]
	pub insecure_skip_cas: bool,
	/// Expected secret version; `0` means the secret must not exist yet.
	#[serde(default)]
	pub cas_value: u64,
}
impl NewAccount {
	/// Validates the request, returning the typed form on success.
	///
	/// Rules run in order and the first failure wins. The check is pure and idempotent.
	pub fn validate(&self) -> Result<AccountRequest, ValidationError> {
		obs::observe_sync(Phase::Validate, "validate", || self.check())
	}

	fn check(&self) -> Result<AccountRequest, ValidationError> {
		let endpoint = parse_endpoint(self.vault.as_deref())?;
		let location = SecretLocation::new(&self.secret_engine_path, &self.secret_path)?;
		let cas = CasMode::from_settings(self.insecure_skip_cas, self.cas_value)?;

		Ok(AccountRequest { endpoint, location, cas })
	}
}

/// Request that passed validation. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRequest {
	endpoint: Url,
	location: SecretLocation,
	cas: CasMode,
}
impl AccountRequest {
	/// Absolute URL of the secrets engine.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Where the secret lives.
	pub fn location(&self) -> &SecretLocation {
		&self.location
	}

	/// Concurrency guard for reads and writes.
	pub fn cas(&self) -> CasMode {
		self.cas
	}
}
impl TryFrom<&NewAccount> for AccountRequest {
	type Error = ValidationError;

	fn try_from(value: &NewAccount) -> Result<Self, Self::Error> {
		value.validate()
	}
}

/// Engine mount + secret path pair. Both components are non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretLocation {
	engine: String,
	secret: String,
}
impl SecretLocation {
	/// Builds a location, rejecting empty components.
	pub fn new(
		engine: impl Into<String>,
		secret: impl Into<String>,
	) -> Result<Self, ValidationError> {
		let engine = engine.into();
		let secret = secret.into();

		if engine.is_empty() || secret.is_empty() {
			return Err(ValidationError::InvalidSecretLocation);
		}

		Ok(Self { engine, secret })
	}

	/// Mount path of the KV v2 engine.
	pub fn engine(&self) -> &str {
		&self.engine
	}

	/// Path of the secret within the engine.
	pub fn secret(&self) -> &str {
		&self.secret
	}

	/// API path of the versioned secret, relative to `/v1/`.
	pub fn data_path(&self) -> String {
		format!(
			"{engine}/data/{secret}",
			engine = self.engine.trim_matches('/'),
			secret = self.secret.trim_matches('/'),
		)
	}
}
impl Display for SecretLocation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.engine.trim_matches('/'), self.secret.trim_matches('/'))
	}
}

fn parse_endpoint(raw: Option<&str>) -> Result<Url, ValidationError> {
	let url = Url::parse(raw.ok_or(ValidationError::InvalidEndpoint)?)
		.map_err(|_| ValidationError::InvalidEndpoint)?;

	match url.host_str() {
		Some(host) if !host.is_empty() => Ok(url),
		_ => Err(ValidationError::InvalidEndpoint),
	}
}
