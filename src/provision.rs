//! Explicit `Unauthenticated → Authenticated → Fetched` progression over one session.
//!
//! A [`Provisioner`] binds one validated [`AccountRequest`] to one [`Session`]. Each phase
//! is a separate method whose output is the next state, so callers can attach retry or backoff
//! per phase: a failed [`Provisioner::login`] leaves the unauthenticated value untouched, and
//! a [`FetchError::Unauthorized`] from [`Provisioner::fetch`] is answered by
//! [`Provisioner::logout`] followed by a fresh login.
//!
//! Concurrent account requests each open their own provisioner; sessions and credentials are
//! never shared between them. If a phase future is dropped mid-flight, drop the provisioner
//! too and open a new session.

// self
use crate::{
	_prelude::*,
	account::{AccountRequest, NewAccount},
	auth::{self, AuthCredential, AuthError, RoleLogin},
	channel::{ChannelError, MtlsChannel, Session},
	secret::{self, FetchError, SecretPayload, SecretRecord, SecretVersion},
};

/// No credential yet.
#[derive(Debug)]
pub struct Unauthenticated;

/// Holds the credential obtained by the login exchange.
#[derive(Debug)]
pub struct Authenticated {
	credential: AuthCredential,
}

/// Holds the record whose version satisfied the CAS guard.
#[derive(Debug)]
pub struct Fetched {
	record: SecretRecord,
}

/// Drives one account request through login and fetch.
#[derive(Debug)]
pub struct Provisioner<S> {
	session: Session,
	request: AccountRequest,
	state: S,
}
impl<S> Provisioner<S> {
	/// Validated request this provisioner serves.
	pub fn request(&self) -> &AccountRequest {
		&self.request
	}

	/// Session every phase runs over.
	pub fn session(&self) -> &Session {
		&self.session
	}

	fn advance<T>(&self, state: T) -> Provisioner<T> {
		Provisioner { session: self.session.clone(), request: self.request.clone(), state }
	}
}
impl Provisioner<Unauthenticated> {
	/// Opens a mutual-TLS session to the request's endpoint.
	pub fn open(channel: &MtlsChannel, request: AccountRequest) -> Result<Self, ChannelError> {
		let session = channel.open(request.endpoint())?;

		Ok(Self::with_session(session, request))
	}

	/// Uses an already open session.
	pub fn with_session(session: Session, request: AccountRequest) -> Self {
		Self { session, request, state: Unauthenticated }
	}

	/// Runs the role login exchange.
	pub async fn login(&self, role: &RoleLogin) -> Result<Provisioner<Authenticated>, AuthError> {
		let credential = auth::login(&self.session, role).await?;

		Ok(self.advance(Authenticated { credential }))
	}
}
impl Provisioner<Authenticated> {
	/// Credential attached to every request in this state.
	pub fn credential(&self) -> &AuthCredential {
		&self.state.credential
	}

	/// Reads the secret under the request's location and CAS guard.
	pub async fn fetch(&self) -> Result<Provisioner<Fetched>, FetchError> {
		let record = secret::fetch(
			&self.session,
			&self.state.credential,
			self.request.location(),
			self.request.cas(),
		)
		.await?;

		Ok(self.advance(Fetched { record }))
	}

	/// Writes `payload` under the request's location and CAS guard.
	pub async fn store(&self, payload: &SecretPayload) -> Result<SecretVersion, FetchError> {
		secret::store(
			&self.session,
			&self.state.credential,
			self.request.location(),
			self.request.cas(),
			payload,
		)
		.await
	}

	/// Discards the credential, e.g. after [`FetchError::Unauthorized`].
	pub fn logout(self) -> Provisioner<Unauthenticated> {
		Provisioner { session: self.session, request: self.request, state: Unauthenticated }
	}
}
impl Provisioner<Fetched> {
	/// Record read in the fetch phase.
	pub fn record(&self) -> &SecretRecord {
		&self.state.record
	}

	/// Hands the record to the consumer, dropping the session.
	pub fn into_record(self) -> SecretRecord {
		self.state.record
	}
}

/// Validates `account`, opens a session, logs in, and fetches the secret.
pub async fn provision(
	account: &NewAccount,
	channel: &MtlsChannel,
	role: &RoleLogin,
) -> Result<SecretRecord> {
	let request = account.validate()?;
	let provisioner = Provisioner::open(channel, request)?;
	let fetched = provisioner.login(role).await?.fetch().await?;

	Ok(fetched.into_record())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, account::ValidationError, channel::ChannelFailure};

	#[tokio::test]
	async fn provision_stops_at_validation() {
		let mut account = minimum_valid_new_account();

		account.secret_engine_path = String::new();

		let role = RoleLogin::new(auth::RoleId::new("role").expect("Role should be valid."));
		let err = provision(&account, &fixture_channel(), &role)
			.await
			.expect_err("Invalid accounts must fail before any network call.");

		assert!(matches!(err, Error::Validation(ValidationError::InvalidSecretLocation)));
		assert_eq!(err.to_string(), "invalid secret location");
	}

	#[tokio::test]
	async fn provision_refuses_plain_http_endpoints() {
		let role = RoleLogin::new(auth::RoleId::new("role").expect("Role should be valid."));
		let err = provision(&minimum_valid_new_account(), &fixture_channel(), &role)
			.await
			.expect_err("Plain HTTP endpoints cannot carry mutual TLS.");

		assert!(matches!(&err, Error::Channel(e) if e.reason() == ChannelFailure::InsecureEndpoint));
	}
}
