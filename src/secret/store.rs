//! Check-and-set guarded secret writes.

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
	secret::{self, FetchError, SecretPayload, SecretVersion, WireMetadata},
};

#[derive(Serialize)]
struct WriteRequest<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	options: Option<WriteOptions>,
	data: &'a SecretPayload,
}

#[derive(Serialize)]
struct WriteOptions {
	cas: u64,
}

#[derive(Deserialize)]
struct WriteResponse {
	#[serde(default)]
	data: Option<WireMetadata>,
}

/// Writes `payload` to `location`, passing the CAS version through unmodified.
///
/// Under `Enforced(n)` the engine only accepts the write when the current version is `n`
/// (`0`: the secret must not exist yet) and reports a mismatch as
/// [`FetchError::CasMismatch`]. Under `SkipCheck` no `cas` option is sent. Returns the version
/// the engine assigned.
pub async fn store(
	session: &Session,
	credential: &AuthCredential,
	location: &SecretLocation,
	cas: CasMode,
	payload: &SecretPayload,
) -> Result<SecretVersion, FetchError> {
	obs::observe(Phase::Store, "store", async {
		let body = WriteRequest {
			options: cas.expected_version().map(|cas| WriteOptions { cas }),
			data: payload,
		};
		let request = session
			.request(Method::POST, &location.data_path())
			.header(VAULT_TOKEN_HEADER, credential.token.expose())
			.json(&body);
		let response = session.execute(request).await?;

		version_from_response(&response, cas)
	})
	.await
}

fn version_from_response(
	response: &VaultResponse,
	cas: CasMode,
) -> Result<SecretVersion, FetchError> {
	if !response.status.is_success() {
		return Err(secret::classify_failure(response, cas));
	}

	let version = response
		.json::<WriteResponse>()?
		.data
		.ok_or(MalformedResponse::MissingField { field: "data" })?
		.into_version("data.version", "data.created_time")?;

	Ok(version)
}
