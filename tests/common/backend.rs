//! Checks shared by the backends which talk to a real server.

use std::time::Duration;

use courier::{Adapter, Error, Method, Request, VerifyMode};

use super::{ca_file, closed_port, EchoServer};

pub fn get(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/hello?x=1"))
        .unwrap()
        .with_header("X-Custom", "yes")
        .unwrap();

    let response = adapter.get(&request).unwrap();

    assert_eq!(response.code(), 200);
    assert!(!response.is_error());
    assert_eq!(response.header("x-method"), Some("GET"));
    assert_eq!(response.header("x-uri"), Some("/hello?x=1"));
    assert_eq!(response.header("x-echo-x-custom"), Some("yes"));
    let host = server.addr().to_string();
    assert_eq!(response.header("x-echo-host"), Some(host.as_str()));
    assert_eq!(response.header_values("Set-Cookie"), vec!["a=1", "b=2"]);
    assert!(response.body().is_empty());
}

pub fn post(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/submit"))
        .unwrap()
        .with_header("Content-Type", "text/xml")
        .unwrap()
        .with_body("<x/>");

    let response = adapter.post(&request).unwrap();

    assert_eq!(response.header("x-method"), Some("POST"));
    assert_eq!(response.header("x-echo-content-type"), Some("text/xml"));
    assert_eq!(response.text(), "<x/>");
}

pub fn put_and_delete(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/thing")).unwrap().with_body("data");

    let response = adapter.put(&request).unwrap();
    assert_eq!(response.header("x-method"), Some("PUT"));
    assert_eq!(response.text(), "data");

    let response = adapter.delete(&request).unwrap();
    assert_eq!(response.header("x-method"), Some("DELETE"));
    assert!(response.body().is_empty());
}

pub fn head(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/")).unwrap();
    let response = adapter.head(&request).unwrap();
    assert_eq!(response.code(), 200);
    assert_eq!(response.header("x-method"), Some("HEAD"));
    assert!(response.body().is_empty());
}

pub fn custom_method(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/patch")).unwrap().with_body("diff");
    let response = adapter.request(Method::PATCH, &request).unwrap();
    assert_eq!(response.header("x-method"), Some("PATCH"));
    assert_eq!(response.text(), "diff");
}

pub fn basic_auth(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut request = Request::new(&server.url("/private")).unwrap();
    request.auth_mut().basic("user", "pass");

    let response = adapter.get(&request).unwrap();
    assert_eq!(
        response.header("x-echo-authorization"),
        Some("Basic dXNlcjpwYXNz")
    );
}

pub fn error_status(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/status/404")).unwrap();
    let response = adapter.get(&request).unwrap();
    assert_eq!(response.code(), 404);
    assert!(response.is_error());
}

pub fn read_timeout(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut request = Request::new(&server.url("/slow")).unwrap();
    request
        .set_read_timeout(Duration::from_millis(200))
        .unwrap();

    let error = adapter.get(&request).unwrap_err();
    assert!(error.is_timeout(), "{error:?}");
}

pub fn through_proxy(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut request = Request::new("http://example.invalid/via-proxy").unwrap();
    request.set_proxy(&server.url("/")).unwrap();

    let response = adapter.get(&request).unwrap();
    assert_eq!(
        response.header("x-uri"),
        Some("http://example.invalid/via-proxy")
    );
    assert_eq!(response.header("x-echo-host"), Some("example.invalid"));
}

pub fn connection_refused(adapter: &mut dyn Adapter) {
    let request = Request::new(&format!("http://{}/", closed_port())).unwrap();
    let error = adapter.get(&request).unwrap_err();
    assert!(matches!(error, Error::Transport(_)), "{error:?}");
}

pub fn url_without_path(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&format!("http://{}", server.addr())).unwrap();
    assert_eq!(request.url().to_string(), format!("http://{}", server.addr()));
    let response = adapter.get(&request).unwrap();
    assert_eq!(response.header("x-uri"), Some("/"));

    let request = Request::new(&format!("http://{}?q=1#top", server.addr())).unwrap();
    let response = adapter.get(&request).unwrap();
    assert_eq!(response.header("x-uri"), Some("/?q=1"));
}

pub fn auth_is_per_request(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut private = Request::new(&server.url("/private")).unwrap();
    private.auth_mut().basic("user", "pass");
    let response = adapter.delete(&private).unwrap();
    assert_eq!(response.header("x-method"), Some("DELETE"));
    assert!(response.header("x-echo-authorization").is_some());

    let public = Request::new(&server.url("/public")).unwrap();
    let response = adapter.get(&public).unwrap();
    assert_eq!(response.header("x-method"), Some("GET"));
    assert_eq!(response.header("x-echo-authorization"), None);
}

pub fn proxy_credentials(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut request = Request::new("http://example.invalid/via-proxy").unwrap();
    request
        .set_proxy(&format!("http://puser:ppass@{}/", server.addr()))
        .unwrap();

    let response = adapter.get(&request).unwrap();
    assert_eq!(
        response.header("x-echo-proxy-authorization"),
        Some("Basic cHVzZXI6cHBhc3M=")
    );
    assert_eq!(response.header("x-echo-authorization"), None);
}

pub fn tls_without_verification(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut request = Request::new(&server.url("/secure")).unwrap();
    request.auth_mut().ssl_mut().verify_mode = VerifyMode::None;

    let response = adapter.get(&request).unwrap();
    assert_eq!(response.code(), 200);
    assert_eq!(response.header("x-uri"), Some("/secure"));
}

pub fn tls_rejects_unknown_issuer(adapter: &mut dyn Adapter, server: &EchoServer) {
    let request = Request::new(&server.url("/secure")).unwrap();

    let error = adapter.get(&request).unwrap_err();
    assert!(
        matches!(error, Error::Transport(_) | Error::Ssl(_)),
        "{error:?}"
    );
}

pub fn tls_with_ca_file(adapter: &mut dyn Adapter, server: &EchoServer) {
    let mut request = Request::new(&server.url("/secure")).unwrap();
    request.auth_mut().ssl_mut().ca_cert_file = Some(ca_file().into());

    let response = adapter.get(&request).unwrap();
    assert_eq!(response.code(), 200);
    assert_eq!(response.header("x-uri"), Some("/secure"));
}
