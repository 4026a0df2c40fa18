//! Dispatching requests to a selected backend.

use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::adapter::NativeClient;
use crate::error::Result;
use crate::registry::Registry;
use crate::request::{IntoRequest, Request};
use crate::response::Response;

type Configure<'a> = Box<dyn FnOnce(NativeClient<'_>) + 'a>;

/// Sends requests through the backends of a [`Registry`].
///
/// Each request builds a fresh adapter, so no state is carried from one
/// request to the next.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl Dispatcher {
    /// Create a dispatcher for the given registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Create a dispatcher with the standard backends.
    pub fn standard() -> Self {
        Self::new(Arc::new(Registry::standard()))
    }

    /// The backends available to this dispatcher.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start a request with per-call options.
    pub fn call(&self) -> Call<'_> {
        Call {
            dispatcher: self,
            adapter: None,
            configure: None,
        }
    }

    /// Send a GET request with the default backend.
    pub fn get(&self, request: impl IntoRequest) -> Result<Response> {
        self.call().get(request)
    }

    /// Send a HEAD request with the default backend.
    pub fn head(&self, request: impl IntoRequest) -> Result<Response> {
        self.call().head(request)
    }

    /// Send a DELETE request with the default backend.
    pub fn delete(&self, request: impl IntoRequest) -> Result<Response> {
        self.call().delete(request)
    }

    /// Send a POST request with the default backend.
    pub fn post(&self, request: impl IntoRequest) -> Result<Response> {
        self.call().post(request)
    }

    /// Send a PUT request with the default backend.
    pub fn put(&self, request: impl IntoRequest) -> Result<Response> {
        self.call().put(request)
    }

    /// Send a request with an arbitrary method with the default backend.
    pub fn request(&self, method: Method, request: impl IntoRequest) -> Result<Response> {
        self.call().request(method, request)
    }
}

/// A single request being prepared by a [`Dispatcher`].
pub struct Call<'d> {
    dispatcher: &'d Dispatcher,
    adapter: Option<String>,
    configure: Option<Configure<'d>>,
}

impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("adapter", &self.adapter)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

impl<'d> Call<'d> {
    /// Use the named backend instead of the registry's default.
    pub fn adapter(mut self, name: impl Into<String>) -> Self {
        self.adapter = Some(name.into());
        self
    }

    /// Adjust the backend's native client before the request is sent.
    ///
    /// The callback runs once, against the freshly built adapter.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(NativeClient<'_>) + 'd,
    {
        self.configure = Some(Box::new(configure));
        self
    }

    /// Send a GET request.
    pub fn get(self, request: impl IntoRequest) -> Result<Response> {
        self.request(Method::GET, request)
    }

    /// Send a HEAD request.
    pub fn head(self, request: impl IntoRequest) -> Result<Response> {
        self.request(Method::HEAD, request)
    }

    /// Send a DELETE request.
    pub fn delete(self, request: impl IntoRequest) -> Result<Response> {
        self.request(Method::DELETE, request)
    }

    /// Send a POST request.
    pub fn post(self, request: impl IntoRequest) -> Result<Response> {
        self.request(Method::POST, request)
    }

    /// Send a PUT request.
    pub fn put(self, request: impl IntoRequest) -> Result<Response> {
        self.request(Method::PUT, request)
    }

    /// Send a request with an arbitrary method.
    pub fn request(self, method: Method, request: impl IntoRequest) -> Result<Response> {
        let request = request.into_request()?;
        self.dispatch(method, &request)
    }

    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(method = %method, url = %request.url(), adapter = tracing::field::Empty)
    )]
    fn dispatch(self, method: Method, request: &Request) -> Result<Response> {
        let backend = self
            .dispatcher
            .registry
            .resolve(self.adapter.as_deref())?;
        tracing::Span::current().record("adapter", backend.name());

        let mut adapter = backend.build()?;
        if let Some(configure) = self.configure {
            tracing::trace!("configuring native client");
            configure(adapter.client());
        }

        let response = adapter.request(method, request);
        match &response {
            Ok(response) => tracing::debug!(status = %response.status(), "request complete"),
            Err(error) => tracing::debug!(%error, "request failed"),
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::{MockAdapter, Reply};
    use crate::error::Error;
    use crate::registry::backend_fn;

    fn dispatcher(mock: &MockAdapter) -> Dispatcher {
        let mock = mock.clone();
        let registry = Registry::new("mock").with(backend_fn("mock", move || mock.clone()));
        Dispatcher::new(Arc::new(registry))
    }

    #[test]
    fn shorthand_is_converted() {
        let mock = MockAdapter::new("mock");
        dispatcher(&mock)
            .post(("http://example.com/", "<x/>"))
            .unwrap();

        let recorded = mock.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, Method::POST);
        assert_eq!(recorded[0].request.body().unwrap().as_ref(), b"<x/>");
    }

    #[test]
    fn invalid_url_never_reaches_registry() {
        let dispatcher = Dispatcher::new(Arc::new(Registry::new("missing")));
        let error = dispatcher.get("not a url").unwrap_err();
        assert!(matches!(error, Error::InvalidRequest(_)), "{error:?}");
    }

    #[test]
    fn configure_runs_before_request() {
        let mock = MockAdapter::new("mock");
        let response = dispatcher(&mock)
            .call()
            .configure(|client| {
                if let NativeClient::Other(reply) = client {
                    if let Some(reply) = reply.downcast_mut::<Reply>() {
                        *reply = Reply::status(201);
                    }
                }
            })
            .get("http://example.com/")
            .unwrap();
        assert_eq!(response.code(), 201);
    }

    #[test]
    fn explicit_adapter_must_exist() {
        let mock = MockAdapter::new("mock");
        let error = dispatcher(&mock)
            .call()
            .adapter("other")
            .get("http://example.com/")
            .unwrap_err();
        assert!(matches!(error, Error::UnknownAdapter(_)));
        assert!(mock.recorded().is_empty());
    }
}
