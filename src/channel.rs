//! Mutual-TLS transport to the secrets engine.
//!
//! [`TlsMaterial`] holds the immutable trust configuration (CA bundle, client chain, client
//! key). [`MtlsChannel`] pairs it with timeouts and opens a [`Session`] per account request.
//! Sessions trust only the configured CA bundle (built-in roots are disabled) and present the
//! client chain during every handshake. Sessions are never shared across concurrent requests;
//! if a request future is dropped mid-flight, discard the session and open a new one.

pub mod material;

pub use material::*;

// std
use std::{io::ErrorKind, time::Duration as StdDuration};
// crates.io
use reqwest::{Method, RequestBuilder, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::BoxError,
	http::VaultResponse,
	obs::{self, Phase},
};

/// Coarse failure reason for callers that only branch on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelFailure {
	/// Endpoint is not `https`.
	InsecureEndpoint,
	/// Trust material is invalid or the server certificate was not trusted.
	CertificateInvalid,
	/// The server refused the TCP connection.
	ConnectionRefused,
	/// Connect or request deadline elapsed.
	Timeout,
	/// TLS negotiation failed for a reason other than certificate trust.
	Handshake,
	/// Any other transport failure.
	Network,
}

/// Transport failures raised while opening or using a [`Session`].
///
/// None of these are retried inside the channel; retry policy belongs to the caller.
#[derive(Debug, ThisError)]
pub enum ChannelError {
	/// Mutual TLS requires an `https` endpoint.
	#[error("Endpoint `{url}` must use https for mutual TLS.")]
	InsecureEndpoint {
		/// Endpoint that failed validation.
		url: String,
	},
	/// Trust material could not be loaded or the server certificate did not verify.
	#[error("Certificate is invalid: {reason}.")]
	CertificateInvalid {
		/// Which piece of trust material or which check failed.
		reason: String,
		/// Underlying parsing or verification failure.
		#[source]
		source: Option<BoxError>,
	},
	/// The secrets engine refused the connection.
	#[error("Connection to the secrets engine was refused.")]
	ConnectionRefused {
		/// Underlying connect failure.
		#[source]
		source: BoxError,
	},
	/// The handshake or request did not complete before its deadline.
	#[error("Request to the secrets engine timed out.")]
	Timeout {
		/// Underlying timeout failure.
		#[source]
		source: BoxError,
	},
	/// TLS negotiation failed.
	#[error("TLS handshake with the secrets engine failed.")]
	Handshake {
		/// Underlying TLS failure.
		#[source]
		source: BoxError,
	},
	/// Other transport failure.
	#[error("Network error occurred while calling the secrets engine.")]
	Network {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
}
impl ChannelError {
	/// Builds a [`ChannelError::CertificateInvalid`] for a trust-material problem.
	pub fn certificate_invalid(
		reason: impl Into<String>,
		source: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::CertificateInvalid { reason: reason.into(), source: Some(Box::new(source)) }
	}

	/// Returns the coarse failure reason.
	pub fn reason(&self) -> ChannelFailure {
		match self {
			Self::InsecureEndpoint { .. } => ChannelFailure::InsecureEndpoint,
			Self::CertificateInvalid { .. } => ChannelFailure::CertificateInvalid,
			Self::ConnectionRefused { .. } => ChannelFailure::ConnectionRefused,
			Self::Timeout { .. } => ChannelFailure::Timeout,
			Self::Handshake { .. } => ChannelFailure::Handshake,
			Self::Network { .. } => ChannelFailure::Network,
		}
	}

	/// Returns `true` for failures that may clear up without changing the trust material.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self.reason(),
			ChannelFailure::ConnectionRefused | ChannelFailure::Timeout | ChannelFailure::Network
		)
	}
}
impl From<ReqwestError> for ChannelError {
	fn from(e: ReqwestError) -> Self {
		classify_reqwest_error(e)
	}
}

/// Immutable mutual-TLS configuration used to open sessions.
///
/// Channels are cheap to clone; every clone shares the same [`TlsMaterial`].
#[derive(Clone, Debug)]
pub struct MtlsChannel {
	material: Arc<TlsMaterial>,
	timeout: StdDuration,
	connect_timeout: StdDuration,
}
impl MtlsChannel {
	const DEFAULT_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
	const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(15);

	/// Creates a channel with default timeouts.
	pub fn new(material: impl Into<Arc<TlsMaterial>>) -> Self {
		Self {
			material: material.into(),
			timeout: Self::DEFAULT_TIMEOUT,
			connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
		}
	}

	/// Overrides the total per-request deadline (defaults to 15 seconds).
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the connect + handshake deadline (defaults to 5 seconds).
	pub fn with_connect_timeout(mut self, timeout: StdDuration) -> Self {
		self.connect_timeout = timeout;

		self
	}

	/// Trust material shared by every session of this channel.
	pub fn material(&self) -> &TlsMaterial {
		&self.material
	}

	/// Opens a session to `endpoint` that trusts only the configured CA bundle and presents
	/// the client chain.
	///
	/// The TLS handshake itself happens on the first request; call [`Session::handshake`] to
	/// force it up front.
	pub fn open(&self, endpoint: &Url) -> Result<Session, ChannelError> {
		if endpoint.scheme() != "https" {
			return Err(ChannelError::InsecureEndpoint { url: endpoint.to_string() });
		}

		let mut builder = ReqwestClient::builder()
			.use_rustls_tls()
			.tls_built_in_root_certs(false)
			.https_only(true)
			.redirect(Policy::none())
			.timeout(self.timeout)
			.connect_timeout(self.connect_timeout)
			.identity(self.material.identity()?);

		for certificate in self.material.trust_roots()? {
			builder = builder.add_root_certificate(certificate);
		}

		let client = builder.build().map_err(|e| {
			ChannelError::certificate_invalid("client TLS configuration rejected", e)
		})?;

		Ok(Session::with_client(endpoint.clone(), client))
	}
}

/// Authenticated transport bound to one secrets engine endpoint.
///
/// A session carries no credentials of its own; tokens are attached per request.
#[derive(Clone)]
pub struct Session {
	endpoint: Url,
	client: ReqwestClient,
}
impl Session {
	/// Wraps a caller-built client. No scheme or trust checks are applied; use
	/// [`MtlsChannel::open`] for the mutual-TLS path.
	pub fn with_client(endpoint: Url, client: ReqwestClient) -> Self {
		Self { endpoint, client }
	}

	/// Endpoint this session talks to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Forces the TLS handshake by probing `sys/health`.
	///
	/// Any HTTP status counts as success: the engine answers health checks with non-2xx codes
	/// when sealed or on standby, which still proves the channel is established.
	pub async fn handshake(&self) -> Result<StatusCode, ChannelError> {
		obs::observe(Phase::Handshake, "handshake", async {
			let response = self.execute(self.request(Method::GET, "sys/health")).await?;

			Ok::<_, ChannelError>(response.status)
		})
		.await
	}

	/// Starts a request against `/v1/{path}`.
	pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.client.request(method, self.api_url(path))
	}

	/// Sends a request and buffers the response.
	pub async fn execute(&self, request: RequestBuilder) -> Result<VaultResponse, ChannelError> {
		let response = request.send().await?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let body = response.bytes().await?.to_vec();

		Ok(VaultResponse::new(status, &headers, body))
	}

	fn api_url(&self, path: &str) -> String {
		format!(
			"{base}/v1/{path}",
			base = self.endpoint.as_str().trim_end_matches('/'),
			path = path.trim_start_matches('/'),
		)
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("endpoint", &self.endpoint.as_str()).finish()
	}
}

fn classify_reqwest_error(err: ReqwestError) -> ChannelError {
	if err.is_timeout() {
		return ChannelError::Timeout { source: Box::new(err) };
	}

	let mut io_kind = None;
	let mut mentions_certificate = false;
	let mut cause: Option<&(dyn StdError + 'static)> = err.source();

	while let Some(inner) = cause {
		if let Some(io) = inner.downcast_ref::<std::io::Error>() {
			io_kind.get_or_insert(io.kind());
		}

		mentions_certificate |= is_certificate_failure(&inner.to_string());
		cause = inner.source();
	}

	match io_kind {
		Some(ErrorKind::ConnectionRefused) =>
			ChannelError::ConnectionRefused { source: Box::new(err) },
		Some(ErrorKind::TimedOut) => ChannelError::Timeout { source: Box::new(err) },
		_ if mentions_certificate => ChannelError::CertificateInvalid {
			reason: "server certificate is not trusted by the configured CA bundle".into(),
			source: Some(Box::new(err)),
		},
		Some(ErrorKind::InvalidData) => ChannelError::Handshake { source: Box::new(err) },
		_ => ChannelError::Network { source: Box::new(err) },
	}
}

// Local verification failures plus the alerts a server sends when it rejects the client chain
// (`UnknownCA`, `BadCertificate`, `CertificateRequired`, ...).
const CERTIFICATE_FAILURE_MARKERS: [&str; 3] = ["certificate", "unknownissuer", "unknownca"];

fn is_certificate_failure(text: &str) -> bool {
	let text = text.to_ascii_lowercase();

	CERTIFICATE_FAILURE_MARKERS.iter().any(|marker| text.contains(marker))
}
