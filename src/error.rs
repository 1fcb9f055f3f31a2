//! Crate-level error taxonomy shared by validation, channel, login, and secret access.

// self
use crate::_prelude::*;
pub use crate::{
	account::ValidationError, auth::AuthError, channel::ChannelError, http::MalformedResponse,
	secret::FetchError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the one-call provisioning pipeline.
///
/// Each component returns its own typed error; this enum only aggregates them so callers
/// can still branch on the component that failed.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Account request was rejected before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Mutual-TLS channel could not be opened or used.
	#[error(transparent)]
	Channel(#[from] ChannelError),
	/// Role login failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Secret read or write failed.
	#[error(transparent)]
	Fetch(#[from] FetchError),
}
impl Error {
	/// Returns `true` when retrying the same request, unchanged, can succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Validation(_) => false,
			Self::Channel(e) => e.is_retryable(),
			Self::Auth(e) => e.is_retryable(),
			Self::Fetch(e) => e.is_retryable(),
		}
	}
}
