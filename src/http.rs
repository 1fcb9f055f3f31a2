//! Response plumbing shared by the login exchange and secret access.
//!
//! Every call goes through [`Session::execute`](crate::channel::Session::execute), which turns
//! a reqwest response into a [`VaultResponse`]: the status, a [`ResponseMetadata`] snapshot
//! (status + `Retry-After` hint), and the raw body. Callers then decode the body with
//! [`VaultResponse::json`], which reports the failing JSON path on malformed payloads, or
//! summarize Vault's `{"errors": [..]}` envelope with [`VaultResponse::error_message`].

// crates.io
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Header carrying the bearer token on every authenticated request.
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Response bodies were not shaped the way the secrets engine protocol requires.
#[derive(Debug, ThisError)]
pub enum MalformedResponse {
	/// Body is not valid JSON, or a field has the wrong type.
	#[error("Response body failed to decode at `{}`.", .source.path())]
	Json {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// A required field is absent.
	#[error("Response is missing `{field}`.")]
	MissingField {
		/// Dotted path of the missing field.
		field: &'static str,
	},
	/// A timestamp field could not be parsed as RFC 3339.
	#[error("Response field `{field}` is not an RFC 3339 timestamp.")]
	InvalidTimestamp {
		/// Dotted path of the offending field.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: time::error::Parse,
	},
}

/// Captures metadata from an HTTP response for downstream error mapping.
///
/// Additional metadata fields may be added in future releases, so downstream code
/// should construct values using field names instead of struct update syntax.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the secrets engine.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Fully buffered response from the secrets engine.
#[derive(Clone, Debug)]
pub struct VaultResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Status + retry hints captured from the headers.
	pub metadata: ResponseMetadata,
	body: Vec<u8>,
}
impl VaultResponse {
	const ERROR_PREVIEW_LIMIT: usize = 256;

	/// Builds a response from its parts.
	pub fn new(status: StatusCode, headers: &HeaderMap, body: Vec<u8>) -> Self {
		let metadata =
			ResponseMetadata { status: Some(status.as_u16()), retry_after: parse_retry_after(headers) };

		Self { status, metadata, body }
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Decodes the body as JSON, keeping the failing path on error.
	pub fn json<T>(&self) -> Result<T, MalformedResponse>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| MalformedResponse::Json { source, status: self.status.as_u16() })
	}

	/// Summarizes the error body for rejection messages.
	///
	/// Vault replies with `{"errors": ["..."]}`; other bodies fall back to a bounded text
	/// preview, then to the canonical status reason.
	pub fn error_message(&self) -> String {
		#[derive(Deserialize)]
		struct ErrorEnvelope {
			#[serde(default)]
			errors: Vec<String>,
		}

		let message = match serde_json::from_slice::<ErrorEnvelope>(&self.body) {
			Ok(envelope) if !envelope.errors.is_empty() => envelope.errors.join("; "),
			_ => String::from_utf8_lossy(&self.body).trim().to_owned(),
		};

		if message.is_empty() {
			return self.status.canonical_reason().unwrap_or("unknown status").to_owned();
		}

		truncate_preview(message)
	}
}

fn truncate_preview(message: String) -> String {
	if message.chars().count() <= VaultResponse::ERROR_PREVIEW_LIMIT {
		return message;
	}

	let mut buf = message.chars().take(VaultResponse::ERROR_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
