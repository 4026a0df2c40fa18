#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub mod backend;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Headers which the echo server copies back as `x-echo-<name>`.
const ECHOED: [&str; 6] = [
    "host",
    "user-agent",
    "authorization",
    "proxy-authorization",
    "content-type",
    "x-custom",
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server configuration with a certificate for `127.0.0.1` issued by the
/// test root in `tests/minica`.
fn tls_config() -> rustls::ServerConfig {
    let (_, cert) =
        pem_rfc7468::decode_vec(include_bytes!("../minica/127.0.0.1/cert.pem")).unwrap();
    let (label, key) =
        pem_rfc7468::decode_vec(include_bytes!("../minica/127.0.0.1/key.pem")).unwrap();
    assert_eq!(label, "PRIVATE KEY");

    let cert = rustls::pki_types::CertificateDer::from(cert);
    let key = rustls::pki_types::PrivateKeyDer::Pkcs8(key.into());

    let mut cfg = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .unwrap();
    cfg.alpn_protocols.push(b"http/1.1".to_vec());
    cfg
}

/// The root which issued the TLS echo server's certificate.
pub fn ca_file() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/minica/minica.pem")
}

/// An HTTP/1 server on a background thread which describes each request it
/// receives.
///
/// * The response body is the request body.
/// * `x-method` and `x-uri` carry the method and request target.
/// * Selected request headers come back as `x-echo-<name>`.
/// * `/status/<code>` answers with that status code.
/// * `/slow` waits two seconds before answering.
#[derive(Debug)]
pub struct EchoServer {
    addr: SocketAddr,
    scheme: &'static str,
}

impl EchoServer {
    pub fn start() -> Self {
        Self::spawn(None)
    }

    /// Serve over TLS with a certificate no system root trusts.
    pub fn start_tls() -> Self {
        Self::spawn(Some(Arc::new(tls_config())))
    }

    fn spawn(tls: Option<Arc<rustls::ServerConfig>>) -> Self {
        let scheme = if tls.is_some() { "https" } else { "http" };
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();

                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        continue;
                    };
                    let tls = tls.clone();
                    tokio::spawn(async move {
                        match tls {
                            Some(config) => match TlsAcceptor::from(config).accept(stream).await {
                                Ok(stream) => serve(stream).await,
                                Err(err) => tracing::debug!(%err, "echo tls handshake failed"),
                            },
                            None => serve(stream).await,
                        }
                    });
                }
            });
        });

        Self {
            addr: rx.recv().unwrap(),
            scheme,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }
}

async fn serve<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if let Err(err) = hyper::server::conn::http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service_fn(echo))
        .await
    {
        tracing::debug!(%err, "echo connection error");
    }
}

async fn echo(req: http::Request<Incoming>) -> Result<http::Response<Full<Bytes>>, BoxError> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let path = parts.uri.path();
    if path == "/slow" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    let status = path
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .unwrap_or(200);

    let mut response = http::Response::builder()
        .status(status)
        .header("x-method", parts.method.as_str())
        .header("x-uri", parts.uri.to_string())
        .header("set-cookie", "a=1")
        .header("set-cookie", "b=2");

    for name in ECHOED {
        if let Some(value) = parts.headers.get(name) {
            response = response.header(format!("x-echo-{name}"), value);
        }
    }

    Ok(response.body(Full::new(body))?)
}

/// An address which refuses connections.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
