//! Bearer credentials issued by a successful role login.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Short-lived bearer token plus the lease metadata the engine returned with it.
///
/// Credentials are owned by the session that obtained them and are never persisted; the type
/// is deliberately neither `Clone` nor `Serialize`. Lease fields are informational only:
/// expiry is detected when the engine rejects the token, at which point the caller logs in
/// again.
#[derive(Debug, PartialEq, Eq)]
pub struct AuthCredential {
	/// Token attached to every subsequent request.
	pub token: TokenSecret,
	/// Token accessor, when the engine returned one.
	pub accessor: Option<String>,
	/// Lease granted by the engine, when reported.
	pub lease_duration: Option<Duration>,
	/// Whether the engine allows renewing the lease.
	pub renewable: bool,
	/// Instant the login response was received.
	pub issued_at: OffsetDateTime,
}
impl AuthCredential {
	/// Wraps a token obtained out of band (no lease metadata).
	pub fn new(token: TokenSecret) -> Self {
		Self {
			token,
			accessor: None,
			lease_duration: None,
			renewable: false,
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Sets the accessor.
	pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
		self.accessor = Some(accessor.into());

		self
	}

	/// Sets the lease duration and renewability.
	pub fn with_lease(mut self, lease_duration: Duration, renewable: bool) -> Self {
		self.lease_duration = Some(lease_duration);
		self.renewable = renewable;

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_never_leaks_the_token() {
		let credential = AuthCredential::new(TokenSecret::new("s.very-secret"))
			.with_accessor("accessor-1")
			.with_lease(Duration::minutes(20), true);
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(rendered.contains("accessor-1"));
		assert_eq!(credential.lease_duration, Some(Duration::seconds(1200)));
		assert!(credential.renewable);
	}
}
