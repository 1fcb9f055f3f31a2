//! Token-scoped access to versioned secrets, guarded by check-and-set.
//!
//! [`fetch`] reads `/v1/{engine}/data/{secret}` and evaluates the request's [`CasMode`]
//! against the returned version before the payload is handed out. [`store`] writes a payload
//! with the CAS version passed through unmodified, leaving the engine as the authority that
//! rejects stale writes. Neither caches anything locally.

pub mod fetch;
pub mod record;
pub mod store;

pub use fetch::*;
pub use record::*;
pub use store::*;

// self
use crate::{
	_prelude::*,
	account::CasMode,
	channel::ChannelError,
	http::{MalformedResponse, VaultResponse},
};

/// Failures raised while reading or writing a secret.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// Token was missing, invalid, or expired.
	#[error("Secrets engine rejected the token with status {status}.")]
	Unauthorized {
		/// HTTP status code (401 or 403).
		status: u16,
	},
	/// No live secret exists at the location (or at the pinned version).
	#[error("Secret was not found.")]
	NotFound,
	/// Observed or server-reported version did not match the expected one.
	#[error("Check-and-set mismatch: expected version {expected}{}.", fmt_actual(.actual))]
	CasMismatch {
		/// Version the request was pinned to.
		expected: u64,
		/// Version the engine returned, when known.
		actual: Option<u64>,
	},
	/// Engine answered with another non-success status.
	#[error("Secrets engine rejected the request with status {status}: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Engine-supplied error summary.
		message: String,
		/// Retry-After hint, when supplied.
		retry_after: Option<Duration>,
	},
	/// Response lacked the expected structure.
	#[error("Secret response is malformed.")]
	MalformedResponse(#[from] MalformedResponse),
	/// The engine could not be reached.
	#[error("Secrets engine is unreachable.")]
	Unreachable(#[from] ChannelError),
}
impl FetchError {
	/// Returns `true` when the caller should log in again and retry once.
	pub fn requires_login(&self) -> bool {
		matches!(self, Self::Unauthorized { .. })
	}

	/// Returns `true` when backing off and retrying the same request can succeed.
	///
	/// CAS mismatches are never retryable: the caller has to fetch the current version and
	/// reconcile first.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Rejected { status, .. } => *status == 429 || *status >= 500,
			Self::Unreachable(e) => e.is_retryable(),
			_ => false,
		}
	}
}

fn fmt_actual(actual: &Option<u64>) -> String {
	match actual {
		Some(version) => format!(", found {version}"),
		None => String::new(),
	}
}

// Vault's wording when a write's `cas` option does not match the current version.
const CAS_MISMATCH_MARKER: &str = "check-and-set parameter did not match";

/// Maps a non-success response onto the fetch taxonomy.
fn classify_failure(response: &VaultResponse, cas: CasMode) -> FetchError {
	let status = response.status;

	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
			FetchError::Unauthorized { status: status.as_u16() },
		StatusCode::NOT_FOUND => FetchError::NotFound,
		_ => {
			let message = response.error_message();

			match cas.expected_version() {
				Some(expected) if message.to_ascii_lowercase().contains(CAS_MISMATCH_MARKER) =>
					FetchError::CasMismatch { expected, actual: None },
				_ => FetchError::Rejected {
					status: status.as_u16(),
					message,
					retry_after: response.metadata.retry_after,
				},
			}
		},
	}
}
