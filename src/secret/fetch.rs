//! Token-scoped secret reads.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	account::{CasMode, SecretLocation},
	auth::AuthCredential,
	channel::Session,
	http::{MalformedResponse, VAULT_TOKEN_HEADER, VaultResponse},
	obs::{self, Phase},
	secret::{self, FetchError, SecretPayload, SecretRecord, WireMetadata},
};

#[derive(Deserialize)]
struct ReadResponse {
	#[serde(default)]
	data: Option<ReadData>,
}

#[derive(Deserialize)]
struct ReadData {
	#[serde(default)]
	data: Option<SecretPayload>,
	#[serde(default)]
	metadata: Option<WireMetadata>,
}

/// Reads the secret at `location`, attaching the bearer token and enforcing `cas`.
///
/// - `Enforced(n)` with `n > 0` pins the read to version `n` and rejects any other returned
///   version.
/// - `Enforced(0)` means the secret must not exist yet, so any record that comes back is a
///   [`FetchError::CasMismatch`].
/// - `SkipCheck` reads the latest version without a constraint.
///
/// The payload is only returned after the version check passes.
pub async fn fetch(
	session: &Session,
	credential: &AuthCredential,
	location: &SecretLocation,
	cas: CasMode,
) -> Result<SecretRecord, FetchError> {
	obs::observe(Phase::Fetch, "fetch", async {
		let mut request = session
			.request(Method::GET, &location.data_path())
			.header(VAULT_TOKEN_HEADER, credential.token.expose());

		if let Some(version) = cas.expected_version().filter(|version| *version > 0) {
			request = request.query(&[("version", version)]);
		}

		let response = session.execute(request).await?;

		record_from_response(&response, cas)
	})
	.await
}

fn record_from_response(
	response: &VaultResponse,
	cas: CasMode,
) -> Result<SecretRecord, FetchError> {
	if !response.status.is_success() {
		return Err(secret::classify_failure(response, cas));
	}

	let data = response
		.json::<ReadResponse>()?
		.data
		.ok_or(MalformedResponse::MissingField { field: "data" })?;
	let payload = data.data.ok_or(MalformedResponse::MissingField { field: "data.data" })?;
	let version = data
		.metadata
		.ok_or(MalformedResponse::MissingField { field: "data.metadata" })?
		.into_version("data.metadata.version", "data.metadata.created_time")?;

	if !cas.admits(version.version) {
		return Err(FetchError::CasMismatch {
			expected: cas.expected_version().unwrap_or_default(),
			actual: Some(version.version),
		});
	}

	Ok(SecretRecord { version, payload })
}
