//! Registry of named backends.
//!
//! A [`Registry`] maps backend names to [`Backend`] descriptors and keeps track
//! of the default backend. Availability is checked lazily: a backend's
//! transport is only probed when the backend is selected, so registering a
//! backend whose transport is missing is harmless until someone asks for it.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapter::Adapter;
use crate::error::{Error, Result};
use crate::BoxError;

/// Name of the backend used when no other default is set.
pub const DEFAULT_ADAPTER: &str = "reqwest";

/// Describes a backend which can be selected by name.
pub trait Backend: Send + Sync {
    /// Name the backend is registered under.
    fn name(&self) -> &str;

    /// Check that the backend's transport is available.
    fn probe(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Create a fresh adapter.
    fn build(&self) -> Result<Box<dyn Adapter>>;
}

impl fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend").field("name", &self.name()).finish()
    }
}

type Probe = fn() -> Result<(), BoxError>;

/// A [`Backend`] built from a factory function.
///
/// Created with [`backend_fn`].
pub struct FnBackend<F> {
    name: String,
    factory: F,
    probe: Option<Probe>,
}

impl<F> FnBackend<F> {
    /// Check availability with `probe` before the backend is selected.
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = Some(probe);
        self
    }
}

impl<F> fmt::Debug for FnBackend<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackend")
            .field("name", &self.name)
            .field("probe", &self.probe.is_some())
            .finish()
    }
}

impl<F, A> Backend for FnBackend<F>
where
    F: Fn() -> A + Send + Sync,
    A: Adapter + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self) -> Result<(), BoxError> {
        self.probe.map_or(Ok(()), |probe| probe())
    }

    fn build(&self) -> Result<Box<dyn Adapter>> {
        Ok(Box::new((self.factory)()))
    }
}

/// Create a backend named `name` which builds adapters with `factory`.
pub fn backend_fn<F, A>(name: impl Into<String>, factory: F) -> FnBackend<F>
where
    F: Fn() -> A + Send + Sync,
    A: Adapter + 'static,
{
    FnBackend {
        name: name.into(),
        factory,
        probe: None,
    }
}

/// A standard backend whose transport was not compiled in.
#[derive(Debug)]
#[cfg_attr(
    all(feature = "hyper", feature = "reqwest", feature = "curl"),
    allow(dead_code)
)]
struct Missing {
    name: &'static str,
}

impl Missing {
    fn error(&self) -> BoxError {
        format!("built without the `{}` feature", self.name).into()
    }
}

impl Backend for Missing {
    fn name(&self) -> &str {
        self.name
    }

    fn probe(&self) -> Result<(), BoxError> {
        Err(self.error())
    }

    fn build(&self) -> Result<Box<dyn Adapter>> {
        Err(Error::unavailable(self.name, self.error()))
    }
}

fn hyper() -> Arc<dyn Backend> {
    #[cfg(feature = "hyper")]
    {
        use crate::adapter::hyper::{HyperAdapter, NAME};
        Arc::new(backend_fn(NAME, HyperAdapter::new))
    }

    #[cfg(not(feature = "hyper"))]
    {
        Arc::new(Missing { name: "hyper" })
    }
}

fn reqwest() -> Arc<dyn Backend> {
    #[cfg(feature = "reqwest")]
    {
        use crate::adapter::reqwest::{ReqwestAdapter, NAME};
        Arc::new(backend_fn(NAME, ReqwestAdapter::new))
    }

    #[cfg(not(feature = "reqwest"))]
    {
        Arc::new(Missing { name: "reqwest" })
    }
}

fn curl() -> Arc<dyn Backend> {
    #[cfg(feature = "curl")]
    {
        use crate::adapter::curl::{probe, CurlAdapter, NAME};
        Arc::new(backend_fn(NAME, CurlAdapter::new).with_probe(probe))
    }

    #[cfg(not(feature = "curl"))]
    {
        Arc::new(Missing {
            name: crate::adapter::curl::NAME,
        })
    }
}

/// Named backends and the current default.
pub struct Registry {
    backends: BTreeMap<String, Arc<dyn Backend>>,
    default: RwLock<String>,
}

struct NamesDebug<'a>(&'a BTreeMap<String, Arc<dyn Backend>>);

impl fmt::Debug for NamesDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &NamesDebug(&self.backends))
            .field("default", &*self.default.read())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    /// Create an empty registry.
    ///
    /// The default name is not checked until a backend is resolved, so it
    /// may be registered afterwards.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            backends: BTreeMap::new(),
            default: RwLock::new(default.into()),
        }
    }

    /// Create a registry with the `hyper`, `reqwest` and `curl` backends,
    /// defaulting to [`DEFAULT_ADAPTER`].
    ///
    /// Backends whose cargo feature is disabled are still registered, but
    /// selecting them fails with [`Error::BackendUnavailable`].
    pub fn standard() -> Self {
        let mut registry = Self::new(DEFAULT_ADAPTER);
        for backend in [hyper(), reqwest(), curl()] {
            registry.insert(backend);
        }
        registry
    }

    fn insert(&mut self, backend: Arc<dyn Backend>) {
        let name = backend.name().to_owned();
        if self.backends.insert(name.clone(), backend).is_some() {
            tracing::debug!(adapter = %name, "replaced backend");
        }
    }

    /// Add a backend, replacing any backend registered under the same name.
    pub fn register<B>(&mut self, backend: B) -> &mut Self
    where
        B: Backend + 'static,
    {
        self.insert(Arc::new(backend));
        self
    }

    /// Add a backend, builder style.
    pub fn with<B>(mut self, backend: B) -> Self
    where
        B: Backend + 'static,
    {
        self.register(backend);
        self
    }

    /// Select a backend.
    ///
    /// An explicit `name` takes precedence over the default. The backend is
    /// probed before it is returned.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Backend>> {
        let name = match name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(self.default.read().clone()),
        };

        let backend = self
            .backends
            .get(name.as_ref())
            .ok_or_else(|| Error::UnknownAdapter(name.clone().into_owned()))?;

        backend
            .probe()
            .map_err(|source| Error::unavailable(name.as_ref(), source))?;

        tracing::trace!(adapter = %name, "resolved backend");
        Ok(backend.clone())
    }

    /// Change the default backend.
    ///
    /// The backend must be registered and available. On error the previous
    /// default stays in place.
    pub fn set_default(&self, name: &str) -> Result<()> {
        self.resolve(Some(name))?;
        *self.default.write() = name.to_owned();
        tracing::debug!(adapter = %name, "default backend changed");
        Ok(())
    }

    /// Name of the default backend.
    pub fn default_name(&self) -> String {
        self.default.read().clone()
    }

    /// Names of all registered backends, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockAdapter;

    use static_assertions::assert_impl_all;

    assert_impl_all!(Registry: Send, Sync);

    fn registry() -> Registry {
        Registry::new("a")
            .with(backend_fn("a", || MockAdapter::new("a")))
            .with(backend_fn("b", || MockAdapter::new("b")))
    }

    fn broken() -> Result<(), BoxError> {
        Err("library not found".into())
    }

    #[test]
    fn resolve_explicit_and_default() {
        let registry = registry();
        assert_eq!(registry.resolve(None).unwrap().name(), "a");
        assert_eq!(registry.resolve(Some("b")).unwrap().name(), "b");
    }

    #[test]
    fn resolve_unknown() {
        let error = registry().resolve(Some("httpclient")).unwrap_err();
        assert!(matches!(error, Error::UnknownAdapter(name) if name == "httpclient"));
    }

    #[test]
    fn set_default_validates() {
        let registry = registry();
        registry.set_default("b").unwrap();
        assert_eq!(registry.default_name(), "b");

        assert!(registry.set_default("nope").is_err());
        assert_eq!(registry.default_name(), "b");
    }

    #[test]
    fn unavailable_backend() {
        let registry =
            registry().with(backend_fn("c", || MockAdapter::new("c")).with_probe(broken));

        let error = registry.resolve(Some("c")).unwrap_err();
        assert!(matches!(error, Error::BackendUnavailable { ref backend, .. } if backend == "c"));

        assert!(registry.set_default("c").is_err());
        assert_eq!(registry.default_name(), "a");
    }

    #[test]
    fn register_replaces() {
        let mut registry = registry();
        registry.register(backend_fn("b", || MockAdapter::new("replacement")));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let adapter = registry.resolve(Some("b")).unwrap().build().unwrap();
        assert_eq!(adapter.name(), "replacement");
    }

    #[test]
    fn standard_backends() {
        let registry = Registry::standard();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["curl", "hyper", "reqwest"]
        );
        assert_eq!(registry.default_name(), DEFAULT_ADAPTER);
    }

    #[cfg(not(feature = "curl"))]
    #[test]
    fn curl_without_feature_is_unavailable() {
        let registry = Registry::standard();
        let error = registry.resolve(Some("curl")).unwrap_err();
        assert!(error.to_string().contains("`curl` feature"), "{error}");
    }
}
