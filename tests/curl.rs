use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use courier::adapter::curl::mock::MockEasy;
use courier::adapter::curl::{CurlAdapter, NAME};
use courier::credentials::{CredentialStore, FileCredentialStore};
use courier::{
    backend_fn, Adapter, AuthType, CertType, Dispatcher, Error, Feature, Method, Registry,
    Request, SslVersion, VerifyMode,
};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const RESPONSE_HEAD: &str = "HTTP/1.1 100 Continue\r\n\r\n\
    HTTP/1.1 200 OK\r\n\
    Content-Type: text/xml\r\n\
    Set-Cookie: a=1\r\n\
    Set-Cookie: b=2\r\n\
    \r\n";

fn store() -> (Arc<dyn CredentialStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (Arc::new(FileCredentialStore::new(dir.path())), dir)
}

#[test]
fn dispatch_through_registry() -> Result<(), BoxError> {
    let (store, _dir) = store();
    let registry = Registry::new(NAME).with(backend_fn(NAME, move || {
        CurlAdapter::with_store(
            MockEasy::responding(200, RESPONSE_HEAD, "<ok/>"),
            store.clone(),
        )
    }));
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let response = dispatcher.post(("http://example.com/api", "<x/>"))?;

    assert_eq!(response.code(), 200);
    assert_eq!(response.header("Content-Type"), Some("text/xml"));
    assert_eq!(response.header_values("set-cookie"), vec!["a=1", "b=2"]);
    assert_eq!(response.text(), "<ok/>");
    Ok(())
}

#[test]
fn translates_transport_options() -> Result<(), BoxError> {
    let (store, _dir) = store();
    let mut adapter = CurlAdapter::with_store(MockEasy::ok(), store);

    let mut request = Request::new("http://example.com/")?;
    request
        .set_open_timeout(Duration::from_secs(2))?
        .set_read_timeout(Duration::from_secs(5))?
        .set_proxy("http://proxy.example.com:8080")?;
    request.auth_mut().ntlm("user", "secret");

    adapter.get(&request)?;

    let handle = adapter.handle();
    assert_eq!(handle.proxy.as_deref(), Some("http://proxy.example.com:8080"));
    assert_eq!(handle.connect_timeout, Some(Duration::from_secs(2)));
    assert_eq!(handle.timeout, Some(Duration::from_secs(5)));
    assert_eq!(handle.auth, Some(AuthType::Ntlm));
    assert_eq!(handle.username.as_deref(), Some("user"));
    assert_eq!(handle.password.as_deref(), Some("secret"));
    Ok(())
}

#[test]
fn custom_methods_are_rejected() -> Result<(), BoxError> {
    let (store, _dir) = store();
    let mut adapter = CurlAdapter::with_store(MockEasy::ok(), store);
    let request = Request::new("http://example.com/")?.with_body("x");

    let error = adapter.request(Method::PATCH, &request).unwrap_err();

    assert_eq!(
        error.unsupported_feature(),
        Some(&Feature::Method(Method::PATCH))
    );
    assert_eq!(error.to_string(), "curl does not support custom HTTP method PATCH");
    assert!(adapter.handle().performed.is_empty());
    Ok(())
}

#[test]
fn certificate_files_pass_through() -> Result<(), BoxError> {
    let (store, dir) = store();
    let mut adapter = CurlAdapter::with_store(MockEasy::ok(), store);

    let mut request = Request::new("https://example.com/")?;
    let ssl = request.auth_mut().ssl_mut();
    ssl.cert_file = Some(PathBuf::from("/etc/client/cert.der").into());
    ssl.cert_key_file = Some(PathBuf::from("/etc/client/key.der").into());
    ssl.ca_cert_file = Some(PathBuf::from("/etc/client/ca.der").into());
    ssl.cert_type = CertType::Der;
    ssl.ssl_version = SslVersion::TlsV1;

    adapter.get(&request)?;

    let handle = adapter.handle();
    assert_eq!(handle.ssl_cert, Some(PathBuf::from("/etc/client/cert.der")));
    assert_eq!(handle.ssl_key, Some(PathBuf::from("/etc/client/key.der")));
    assert_eq!(handle.ca_info, Some(PathBuf::from("/etc/client/ca.der")));
    assert_eq!(handle.cert_type.as_deref(), Some("DER"));
    assert_eq!(handle.verify_peer, Some(true));
    assert_eq!(handle.ssl_version, Some(SslVersion::TlsV1));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn memory_ca_is_materialized() -> Result<(), BoxError> {
    let (store, dir) = store();
    let mut adapter = CurlAdapter::with_store(MockEasy::ok(), store);

    let mut request = Request::new("https://example.com/")?;
    request.auth_mut().ssl_mut().ca_cert_file = Some(b"CA BUNDLE".to_vec().into());

    adapter.get(&request)?;

    let ca = adapter.handle().ca_info.clone().unwrap();
    assert!(ca.starts_with(dir.path()));
    assert_eq!(
        ca.file_name().unwrap().to_str().unwrap(),
        FileCredentialStore::file_name(b"CA BUNDLE")
    );
    assert_eq!(std::fs::read(&ca)?, b"CA BUNDLE");
    assert_eq!(adapter.handle().cert_type.as_deref(), Some("PEM"));
    assert!(adapter.handle().ssl_version.is_none());
    Ok(())
}

#[test]
fn stores_share_materialized_files() -> Result<(), BoxError> {
    let dir = tempfile::tempdir()?;
    let mut request = Request::new("https://example.com/")?;
    let ssl = request.auth_mut().ssl_mut();
    ssl.cert_file = Some(b"CERT".to_vec().into());
    ssl.cert_key_file = Some(b"KEY".to_vec().into());

    let mut paths = Vec::new();
    for _ in 0..2 {
        let store = Arc::new(FileCredentialStore::new(dir.path()));
        let mut adapter = CurlAdapter::with_store(MockEasy::ok(), store);
        adapter.get(&request)?;
        paths.push(adapter.handle().ssl_cert.clone().unwrap());
    }

    assert_eq!(paths[0], paths[1]);
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    assert_eq!(std::fs::read_to_string(&paths[0])?, "KEY\nCERT");
    Ok(())
}

#[test]
fn unsupported_verify_mode() -> Result<(), BoxError> {
    let (store, _dir) = store();
    let mut adapter = CurlAdapter::with_store(MockEasy::ok(), store);

    let mut request = Request::new("https://example.com/")?;
    request.auth_mut().ssl_mut().verify_mode = VerifyMode::FailIfNoPeerCert;

    let error = adapter.get(&request).unwrap_err();
    assert_eq!(
        error.unsupported_feature(),
        Some(&Feature::VerifyMode(VerifyMode::FailIfNoPeerCert))
    );
    Ok(())
}

#[test]
fn timeouts() -> Result<(), BoxError> {
    let (store, _dir) = store();
    let request = Request::new("http://example.com/")?;

    let mut adapter = CurlAdapter::with_store(MockEasy::timing_out(), store.clone());
    assert!(adapter.get(&request).unwrap_err().is_timeout());

    let mut adapter = CurlAdapter::with_store(MockEasy::responding(0, "", ""), store);
    assert!(matches!(adapter.get(&request), Err(Error::Timeout(_))));
    Ok(())
}
