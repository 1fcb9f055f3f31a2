// std
use std::{
	io::{Error as IoError, Result as IoResult},
	time::Duration as StdDuration,
};
// crates.io
use httpmock::prelude::*;
use rustls::{
	RootCertStore, ServerConfig,
	crypto::ring,
	pki_types::{CertificateDer, PrivateKeyDer, pem::PemObject},
	server::WebPkiClientVerifier,
	version::TLS12,
};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpListener,
	task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;
// self
use vault_account::{
	_preludet::*,
	channel::{ChannelError, ChannelFailure, MtlsChannel, TlsMaterial},
};

fn https_endpoint(port: u16) -> Url {
	Url::parse(&format!("https://127.0.0.1:{port}")).expect("Loopback endpoint should parse.")
}

const HEALTH_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
	content-type: application/json\r\n\
	content-length: 2\r\n\
	connection: close\r\n\r\n{}";

fn certificates(pem: &[u8]) -> Vec<CertificateDer<'static>> {
	CertificateDer::pem_slice_iter(pem)
		.collect::<Result<_, _>>()
		.expect("Fixture certificates should parse.")
}

// TLS 1.2 so a rejected client chain fails the handshake itself rather than the first read.
fn engine_acceptor(client_roots: &[u8]) -> TlsAcceptor {
	let provider = Arc::new(ring::default_provider());
	let mut roots = RootCertStore::empty();

	for certificate in certificates(client_roots) {
		roots.add(certificate).expect("Fixture root should be accepted.");
	}

	let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
		.build()
		.expect("Client certificate verifier should build.");
	let key = PrivateKeyDer::from_pem_slice(FIXTURE_SERVER_KEY)
		.expect("Fixture server key should parse.");
	let config = ServerConfig::builder_with_provider(provider)
		.with_protocol_versions(&[&TLS12])
		.expect("TLS 1.2 should be supported by the ring provider.")
		.with_client_cert_verifier(verifier)
		.with_single_cert(certificates(FIXTURE_SERVER_CHAIN), key)
		.expect("Fixture server identity should load.");

	TlsAcceptor::from(Arc::new(config))
}

/// Serves one health check over mutual TLS, returning the chain the client presented.
async fn serve_one_health_check(
	client_roots: &[u8],
) -> (u16, JoinHandle<IoResult<Vec<CertificateDer<'static>>>>) {
	let acceptor = engine_acceptor(client_roots);
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Loopback bind should succeed.");
	let port = listener.local_addr().expect("Bound listener should expose its address.").port();
	let server = tokio::spawn(async move {
		let (stream, _) = listener.accept().await?;
		let mut tls = acceptor.accept(stream).await?;
		let presented =
			tls.get_ref().1.peer_certificates().map(|chain| chain.to_vec()).unwrap_or_default();
		let mut request = Vec::<u8>::new();
		let mut buf = [0; 1024];

		while !request.windows(4).any(|window| window == b"\r\n\r\n") {
			let read = tls.read(&mut buf).await?;

			if read == 0 {
				break;
			}

			request.extend_from_slice(&buf[..read]);
		}

		tls.write_all(HEALTH_RESPONSE).await?;
		tls.shutdown().await?;

		Ok::<_, IoError>(presented)
	});

	(port, server)
}

#[tokio::test]
async fn handshake_presents_client_chain_to_the_engine() {
	let (port, server) = serve_one_health_check(FIXTURE_CA_ROOT).await;
	let status = fixture_channel()
		.open(&https_endpoint(port))
		.expect("HTTPS session should open.")
		.handshake()
		.await
		.expect("Handshake against an engine signed by the fixture CA should succeed.");
	let presented = server
		.await
		.expect("Engine task should not panic.")
		.expect("Engine should accept the fixture client chain.");

	assert_eq!(status, StatusCode::OK);
	assert_eq!(presented.first(), certificates(FIXTURE_CLIENT_CHAIN).first());
}

#[tokio::test]
async fn engine_rejecting_client_chain_is_a_certificate_failure() {
	let (port, server) = serve_one_health_check(FIXTURE_FOREIGN_CA).await;
	let err = fixture_channel()
		.open(&https_endpoint(port))
		.expect("HTTPS session should open.")
		.handshake()
		.await
		.expect_err("Engines that do not trust the client chain must fail the handshake.");

	assert_eq!(err.reason(), ChannelFailure::CertificateInvalid, "Unexpected error: {err:?}.");
	assert!(!err.is_retryable());
	assert!(server.await.expect("Engine task should not panic.").is_err());
}

#[tokio::test]
async fn engine_outside_the_trust_bundle_is_refused() {
	let (port, server) = serve_one_health_check(FIXTURE_CA_ROOT).await;
	let material =
		TlsMaterial::from_pem(FIXTURE_FOREIGN_CA, FIXTURE_CLIENT_CHAIN, FIXTURE_CLIENT_KEY)
			.expect("Foreign CA bundle should still parse.");
	let err = MtlsChannel::new(material)
		.open(&https_endpoint(port))
		.expect("HTTPS session should open.")
		.handshake()
		.await
		.expect_err("Server certificates outside the bundle must be refused.");

	assert_eq!(err.reason(), ChannelFailure::CertificateInvalid, "Unexpected error: {err:?}.");

	server.abort();
}

#[tokio::test]
async fn self_signed_mock_engine_is_refused() {
	let server = MockServer::start_async().await;
	let err = fixture_channel()
		.open(&https_endpoint(server.port()))
		.expect("HTTPS session should open.")
		.handshake()
		.await
		.expect_err("The mock server's own CA is not in the trust bundle.");

	assert_eq!(err.reason(), ChannelFailure::CertificateInvalid, "Unexpected error: {err:?}.");
	assert!(matches!(err, ChannelError::CertificateInvalid { source: Some(_), .. }));
}

#[tokio::test]
async fn handshake_reports_connection_refused() {
	let port = {
		let listener =
			std::net::TcpListener::bind("127.0.0.1:0").expect("Loopback bind should succeed.");

		listener.local_addr().expect("Bound listener should expose its address.").port()
	};
	let session = fixture_channel()
		.with_connect_timeout(StdDuration::from_secs(2))
		.open(&https_endpoint(port))
		.expect("HTTPS session should open without contacting the server.");
	let err = session.handshake().await.expect_err("Closed ports must refuse the connection.");

	assert_eq!(err.reason(), ChannelFailure::ConnectionRefused, "Unexpected error: {err:?}.");
	assert!(err.is_retryable());
}

#[tokio::test]
async fn handshake_times_out_against_silent_server() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Loopback bind should succeed.");
	let port = listener.local_addr().expect("Bound listener should expose its address.").port();
	let silent = tokio::spawn(async move {
		let mut held = Vec::new();

		while let Ok((stream, _)) = listener.accept().await {
			held.push(stream);
		}
	});
	let session = fixture_channel()
		.with_connect_timeout(StdDuration::from_millis(200))
		.with_timeout(StdDuration::from_millis(400))
		.open(&https_endpoint(port))
		.expect("HTTPS session should open without contacting the server.");
	let err = session.handshake().await.expect_err("Silent servers must time out.");

	assert_eq!(err.reason(), ChannelFailure::Timeout, "Unexpected error: {err:?}.");

	silent.abort();
}

#[test]
fn garbage_trust_material_is_rejected_before_connecting() {
	let err = TlsMaterial::from_pem(
		b"not a certificate".to_vec(),
		FIXTURE_CLIENT_CHAIN,
		FIXTURE_CLIENT_KEY,
	)
	.expect_err("Garbage CA bundles must be rejected.");

	assert!(matches!(err, ChannelError::CertificateInvalid { .. }));
	assert!(!err.is_retryable());

	let err = TlsMaterial::from_pem(FIXTURE_CA_ROOT, FIXTURE_CLIENT_CHAIN, b"".to_vec())
		.expect_err("Missing client keys must be rejected.");

	assert_eq!(err.reason(), ChannelFailure::CertificateInvalid);
}

#[test]
fn channels_with_different_material_coexist() {
	let first = fixture_channel();
	let second = fixture_channel().with_timeout(StdDuration::from_secs(1));
	let endpoint = https_endpoint(8200);

	assert!(first.open(&endpoint).is_ok());
	assert!(second.open(&endpoint).is_ok());
	assert_eq!(first.material(), second.material());
}
