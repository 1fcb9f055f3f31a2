//! Role-based login exchange.
//!
//! [`login`] posts the role credentials to `/v1/auth/{mount}/login` over an open
//! [`Session`] and returns the embedded client token as an [`AuthCredential`]. One request,
//! no internal retries: a failed login is reported with enough detail for the caller to
//! decide whether to back off and try again.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::{AuthCredential, AuthMount, RoleId, TokenSecret},
	channel::{ChannelError, Session},
	http::{MalformedResponse, VaultResponse},
	obs::{self, Phase},
};

/// Failures raised by the login exchange.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Engine answered the login with a non-success status.
	#[error("Role login was rejected with status {status}: {message}.")]
	LoginRejected {
		/// HTTP status code.
		status: u16,
		/// Engine-supplied error summary.
		message: String,
		/// Retry-After hint, when supplied.
		retry_after: Option<Duration>,
	},
	/// Login succeeded at the HTTP level but carried no usable token.
	#[error("Login response is malformed.")]
	MalformedResponse(#[from] MalformedResponse),
	/// The engine could not be reached.
	#[error("Secrets engine is unreachable during login.")]
	Unreachable(#[from] ChannelError),
}
impl AuthError {
	/// Returns `true` when backing off and retrying can succeed.
	///
	/// Credential rejections (4xx other than 429) are never retryable: the role credentials are
	/// most likely wrong.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::LoginRejected { status, .. } => *status == 429 || *status >= 500,
			Self::MalformedResponse(_) => false,
			Self::Unreachable(e) => e.is_retryable(),
		}
	}
}

/// Role credentials used for the login exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLogin {
	/// Mount path of the auth method; defaults to `approle`.
	#[serde(default)]
	pub mount: AuthMount,
	/// Role identifier.
	pub role_id: RoleId,
	/// Role secret, when the role requires one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret_id: Option<TokenSecret>,
}
impl RoleLogin {
	/// Creates login credentials for `role_id` on the default mount.
	pub fn new(role_id: RoleId) -> Self {
		Self { mount: AuthMount::default(), role_id, secret_id: None }
	}

	/// Sets the role secret.
	pub fn with_secret_id(mut self, secret_id: impl Into<String>) -> Self {
		self.secret_id = Some(TokenSecret::new(secret_id));

		self
	}

	/// Overrides the auth mount.
	pub fn with_mount(mut self, mount: AuthMount) -> Self {
		self.mount = mount;

		self
	}

	/// API path of the login endpoint, relative to `/v1/`.
	pub fn login_path(&self) -> String {
		format!("auth/{}/login", self.mount.trim_matches('/'))
	}

	fn body(&self) -> LoginRequest<'_> {
		LoginRequest {
			role_id: &self.role_id,
			secret_id: self.secret_id.as_ref().map(TokenSecret::expose),
		}
	}
}

#[derive(Serialize)]
struct LoginRequest<'a> {
	role_id: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	secret_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct LoginResponse {
	#[serde(default)]
	auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
	#[serde(default)]
	client_token: Option<String>,
	#[serde(default)]
	accessor: Option<String>,
	#[serde(default)]
	lease_duration: Option<u64>,
	#[serde(default)]
	renewable: Option<bool>,
}

/// Exchanges role credentials for a bearer token.
pub async fn login(session: &Session, role: &RoleLogin) -> Result<AuthCredential, AuthError> {
	obs::observe(Phase::Login, "login", async {
		let request = session.request(Method::POST, &role.login_path()).json(&role.body());
		let response = session.execute(request).await?;

		credential_from_response(&response)
	})
	.await
}

fn credential_from_response(response: &VaultResponse) -> Result<AuthCredential, AuthError> {
	if !response.status.is_success() {
		return Err(AuthError::LoginRejected {
			status: response.status.as_u16(),
			message: response.error_message(),
			retry_after: response.metadata.retry_after,
		});
	}

	let auth = response
		.json::<LoginResponse>()?
		.auth
		.ok_or(MalformedResponse::MissingField { field: "auth" })?;
	let token = auth
		.client_token
		.filter(|token| !token.is_empty())
		.ok_or(MalformedResponse::MissingField { field: "auth.client_token" })?;
	let mut credential = AuthCredential::new(TokenSecret::new(token));

	if let Some(accessor) = auth.accessor.filter(|accessor| !accessor.is_empty()) {
		credential = credential.with_accessor(accessor);
	}
	if let Some(secs) = auth.lease_duration.and_then(|secs| i64::try_from(secs).ok()) {
		credential =
			credential.with_lease(Duration::seconds(secs), auth.renewable.unwrap_or(false));
	}

	Ok(credential)
}
