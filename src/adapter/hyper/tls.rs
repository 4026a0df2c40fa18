//! rustls configuration for the hyper adapter.

use std::io::{BufReader, Cursor};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::auth::{CertSource, CertType, SslConfig, SslVersion, VerifyMode};
use crate::error::{Error, Result};

fn ssl_error(message: impl std::fmt::Display) -> Error {
    Error::Ssl(message.to_string().into())
}

fn load_certs(source: &CertSource, kind: CertType) -> Result<Vec<CertificateDer<'static>>> {
    let contents = source.load()?;
    match kind {
        CertType::Der => Ok(vec![CertificateDer::from(contents.to_vec())]),
        CertType::Pem => {
            let mut reader = BufReader::new(Cursor::new(&contents[..]));
            let certs = rustls_pemfile::certs(&mut reader)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|error| ssl_error(format!("invalid certificate: {error}")))?;
            if certs.is_empty() {
                return Err(ssl_error("no certificates found"));
            }
            Ok(certs)
        }
    }
}

fn load_key(source: &CertSource, kind: CertType) -> Result<PrivateKeyDer<'static>> {
    let contents = source.load()?;
    match kind {
        CertType::Der => Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            contents.to_vec(),
        ))),
        CertType::Pem => {
            let mut reader = BufReader::new(Cursor::new(&contents[..]));
            rustls_pemfile::private_key(&mut reader)
                .map_err(|error| ssl_error(format!("invalid private key: {error}")))?
                .ok_or_else(|| ssl_error("no private key found"))
        }
    }
}

fn root_store(ssl: Option<&SslConfig>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    match ssl.and_then(|ssl| ssl.ca_cert_file.as_ref().map(|ca| (ca, ssl.cert_type))) {
        Some((ca, kind)) => {
            for cert in load_certs(ca, kind)? {
                roots
                    .add(cert)
                    .map_err(|error| ssl_error(format!("invalid CA certificate: {error}")))?;
            }
        }
        None => {
            let native = rustls_native_certs::load_native_certs();
            for error in &native.errors {
                tracing::debug!(%error, "skipping native certificate");
            }
            let (added, ignored) = roots.add_parsable_certificates(native.certs);
            tracing::trace!(added, ignored, "loaded native root certificates");
        }
    }

    Ok(roots)
}

/// Build the rustls configuration for a request.
pub(super) fn client_config(ssl: Option<&SslConfig>) -> Result<ClientConfig> {
    if let Some(version) = ssl.map(|ssl| ssl.ssl_version) {
        if matches!(version, SslVersion::SslV2 | SslVersion::SslV3) {
            tracing::debug!(
                ?version,
                "protocol version has no rustls equivalent, using defaults"
            );
        }
    }

    let verify = ssl.map_or(VerifyMode::Peer, |ssl| ssl.verify_mode);

    let mut config = if verify == VerifyMode::None {
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    } else {
        let builder = ClientConfig::builder().with_root_certificates(root_store(ssl)?);

        match ssl.and_then(|ssl| ssl.cert_file.as_ref().map(|cert| (ssl, cert))) {
            Some((ssl, cert)) => {
                let chain = load_certs(cert, ssl.cert_type)?;
                // A PEM certificate file may carry its own key.
                let key = load_key(ssl.cert_key_file.as_ref().unwrap_or(cert), ssl.cert_type)?;
                builder
                    .with_client_auth_cert(chain, key)
                    .map_err(|error| ssl_error(format!("invalid client certificate: {error}")))?
            }
            None if ssl.is_some_and(|ssl| ssl.cert_key_file.is_some()) => {
                return Err(ssl_error("private key given without a client certificate"));
            }
            None => builder.with_no_client_auth(),
        }
    };

    config.alpn_protocols.push(b"http/1.1".to_vec());
    Ok(config)
}

/// Server name used for SNI and certificate verification.
pub(super) fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_owned())
        .map_err(|error| Error::InvalidRequest(format!("{host:?}: {error}")))
}

/// Accepts any server certificate, for [`VerifyMode::None`].
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
