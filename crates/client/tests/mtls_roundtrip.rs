//! End-to-end tests: a real mTLS server on an ephemeral port, called through
//! the client's transport and router, using the demo PKI in `certs/`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum_test::TestServer;
use common::protocol::{CLIENT_ENDPOINT_PATH, SECURED_ENDPOINT_PATH, SERVER_GREETING};
use common::store::{self, StoreFormat};
use hyper::Uri;
use mtls_client::server::{router, state::AppState};
use mtls_client::tls::{self, ClientTlsSettings, HostnameVerification};
use mtls_client::transport::{MtlsTransport, Timeouts, UpstreamError};
use tokio::net::TcpListener;

const PASSWORD: &str = "changeit";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../certs")
        .join(name)
}

fn settings(key_store: &str, trust_store: &str) -> ClientTlsSettings {
    ClientTlsSettings {
        key_store_path: fixture(key_store),
        key_store_password: PASSWORD.into(),
        trust_store_path: fixture(trust_store),
        trust_store_format: StoreFormat::Pkcs12,
        trust_store_password: Some(PASSWORD.into()),
        hostname_verification: HostnameVerification::Disabled,
    }
}

fn timeouts() -> Timeouts {
    Timeouts {
        connect: Duration::from_secs(2),
        request: Duration::from_secs(5),
    }
}

fn secured_url(addr: SocketAddr) -> Uri {
    format!("https://{addr}{SECURED_ENDPOINT_PATH}").parse().unwrap()
}

async fn start_server() -> SocketAddr {
    start_server_as("server").await
}

/// Start the server presenting the `{name}.crt` / `{name}.key` identity.
async fn start_server_as(name: &str) -> SocketAddr {
    let identity = store::load_pem_identity(
        &fixture(&format!("{name}.crt")),
        &fixture(&format!("{name}.key")),
    )
    .unwrap();
    let client_cas = store::load_trust_store(&fixture("ca.crt"), StoreFormat::Pem, None).unwrap();
    let tls_config =
        mtls_server::server::tls::build_server_config(identity, client_cas.roots).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mtls_server::server::listener::serve(
        listener,
        tls_config,
        mtls_server::server::router::build(),
    ));
    addr
}

fn transport(settings: &ClientTlsSettings, timeouts: Timeouts) -> MtlsTransport {
    MtlsTransport::new(tls::load(settings).unwrap(), timeouts)
}

fn client_app(transport: MtlsTransport, target: Uri) -> TestServer {
    TestServer::new(router::build(AppState::new(transport, target))).unwrap()
}

#[tokio::test]
async fn secured_endpoint_answers_over_mtls() {
    let addr = start_server().await;
    let transport = transport(&settings("client-keystore.p12", "client-truststore.p12"), timeouts());

    let body = transport.get_text(secured_url(addr)).await.unwrap();
    assert_eq!(body, SERVER_GREETING);
}

#[tokio::test]
async fn pem_trust_store_completes_handshake() {
    let addr = start_server().await;
    let settings = ClientTlsSettings {
        trust_store_path: fixture("client-truststore.pem"),
        trust_store_format: StoreFormat::Pem,
        trust_store_password: None,
        ..settings("client-keystore.p12", "client-truststore.p12")
    };

    let body = transport(&settings, timeouts())
        .get_text(secured_url(addr))
        .await
        .unwrap();
    assert_eq!(body, SERVER_GREETING);
}

#[tokio::test]
async fn self_signed_server_in_trust_store_completes_handshake() {
    let addr = start_server_as("self-signed").await;

    let pem = ClientTlsSettings {
        trust_store_path: fixture("self-signed.crt"),
        trust_store_format: StoreFormat::Pem,
        trust_store_password: None,
        ..settings("client-keystore.p12", "client-truststore.p12")
    };
    let p12 = settings("client-keystore.p12", "self-signed-truststore.p12");

    for settings in [pem, p12] {
        let body = transport(&settings, timeouts())
            .get_text(secured_url(addr))
            .await
            .unwrap();
        assert_eq!(body, SERVER_GREETING);
    }
}

#[tokio::test]
async fn client_endpoint_relays_server_body() {
    let addr = start_server().await;
    let app = client_app(
        transport(&settings("client-keystore.p12", "client-truststore.p12"), timeouts()),
        secured_url(addr),
    );

    let resp = app.get(CLIENT_ENDPOINT_PATH).await;
    resp.assert_status_ok();
    resp.assert_text(SERVER_GREETING);
}

#[tokio::test]
async fn repeated_calls_are_identical() {
    let addr = start_server().await;
    let app = client_app(
        transport(&settings("client-keystore.p12", "client-truststore.p12"), timeouts()),
        secured_url(addr),
    );

    let first = app.get(CLIENT_ENDPOINT_PATH).await;
    let second = app.get(CLIENT_ENDPOINT_PATH).await;
    assert_eq!(first.status_code(), second.status_code());
    assert_eq!(first.text(), second.text());
}

#[tokio::test]
async fn untrusted_server_fails_the_handshake() {
    let addr = start_server().await;
    let transport = transport(&settings("client-keystore.p12", "rogue-truststore.p12"), timeouts());

    let err = transport.get_text(secured_url(addr)).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Request(_)), "{err}");

    let app = client_app(transport, secured_url(addr));
    let started = Instant::now();
    let resp = app.get(CLIENT_ENDPOINT_PATH).expect_failure().await;
    resp.assert_status(StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() < timeouts().request);
}

#[tokio::test]
async fn server_rejects_untrusted_client_certificate() {
    let addr = start_server().await;
    let transport = transport(
        &settings("rogue-client-keystore.p12", "client-truststore.p12"),
        timeouts(),
    );

    assert!(transport.get_text(secured_url(addr)).await.is_err());
}

#[tokio::test]
async fn strict_hostname_verification_rejects_ip_target() {
    let addr = start_server().await;
    let settings = ClientTlsSettings {
        hostname_verification: HostnameVerification::Strict,
        ..settings("client-keystore.p12", "client-truststore.p12")
    };

    let err = transport(&settings, timeouts())
        .get_text(secured_url(addr))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Request(_)), "{err}");
}

#[tokio::test]
async fn refused_connection_returns_bad_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = client_app(
        transport(&settings("client-keystore.p12", "client-truststore.p12"), timeouts()),
        secured_url(addr),
    );

    let resp = app.get(CLIENT_ENDPOINT_PATH).expect_failure().await;
    resp.assert_status(StatusCode::BAD_GATEWAY);

    // The client keeps serving after a failed relay.
    let again = app.get(CLIENT_ENDPOINT_PATH).expect_failure().await;
    again.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn silent_server_times_out_instead_of_hanging() {
    // Accepts connections and never speaks, so the handshake never completes.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let short = Timeouts {
        connect: Duration::from_secs(1),
        request: Duration::from_millis(500),
    };
    let transport = transport(&settings("client-keystore.p12", "client-truststore.p12"), short);

    let err = transport.get_text(secured_url(addr)).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Timeout(_)), "{err}");

    let app = client_app(transport, secured_url(addr));
    let resp = app.get(CLIENT_ENDPOINT_PATH).expect_failure().await;
    resp.assert_status(StatusCode::GATEWAY_TIMEOUT);
}

#[test]
fn wrong_key_store_password_prevents_startup() {
    let cfg = mtls_client::config::Config {
        listen_port: 8080,
        server_base_url: "https://localhost:9000".into(),
        key_store_path: fixture("client-keystore.p12").display().to_string(),
        key_store_password: "not-the-password".into(),
        trust_store_path: fixture("client-truststore.p12").display().to_string(),
        trust_store_password: Some(PASSWORD.into()),
        trust_store_format: StoreFormat::Pkcs12,
        verify_hostname: false,
        connect_timeout_secs: 5,
        request_timeout_secs: 30,
        log_level: "info".into(),
        otel_exporter_otlp_endpoint: None,
    };

    let err = AppState::from_config(&cfg).err().expect("startup must fail");
    assert!(format!("{err:#}").contains("key store"), "{err:#}");
}
