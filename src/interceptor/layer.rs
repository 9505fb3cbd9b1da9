//! Tower layer that resolves virtual requests before they reach a transport.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::Request;
use tower::{Layer, Service, ServiceExt};

use crate::cache::{AddressCache, ResolutionDefaults};
use crate::error::{BoxError, DiscoveryError};
use crate::interceptor::target::{VirtualRequest, VirtualTarget};
use crate::observability::metrics;
use crate::resolver::ResolverRegistry;

/// Wraps a transport in a [`DiscoveryService`].
///
/// All services produced by one layer share one [`AddressCache`], so a scheme
/// gets a single resolver no matter how many clones are in flight.
#[derive(Debug, Clone)]
pub struct DiscoveryLayer {
    cache: Arc<AddressCache>,
}

impl DiscoveryLayer {
    pub fn new(registry: ResolverRegistry) -> Self {
        Self::with_defaults(registry, ResolutionDefaults::default())
    }

    pub fn with_defaults(registry: ResolverRegistry, defaults: ResolutionDefaults) -> Self {
        Self::from_cache(Arc::new(AddressCache::new(Arc::new(registry), defaults)))
    }

    pub fn from_cache(cache: Arc<AddressCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<AddressCache> {
        &self.cache
    }
}

impl<S> Layer<S> for DiscoveryLayer {
    type Service = DiscoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DiscoveryService {
            inner,
            cache: self.cache.clone(),
        }
    }
}

/// Service accepting [`VirtualRequest`]s and forwarding rewritten
/// `http::Request`s to `S`.
#[derive(Debug, Clone)]
pub struct DiscoveryService<S> {
    inner: S,
    cache: Arc<AddressCache>,
}

impl<S> DiscoveryService<S> {
    pub fn cache(&self) -> &Arc<AddressCache> {
        &self.cache
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, B> Service<VirtualRequest<B>> for DiscoveryService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<BoxError>,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = DiscoveryError;
    type Future = BoxFuture<'static, Result<S::Response, DiscoveryError>>;

    // Readiness of the transport is awaited after resolution, in `call`, so
    // a slow resolver never holds a reserved transport slot.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: VirtualRequest<B>) -> Self::Future {
        let inner = self.inner.clone();
        let cache = self.cache.clone();

        Box::pin(async move {
            let target = VirtualTarget::parse(req.target())?;
            let entry = cache.get_or_create(&target.scheme, &target.config_path)?;
            let address = entry.wait(cache.defaults().wait_timeout).await?;

            let request = req.into_request(&target, &address)?;
            tracing::debug!(
                scheme = %target.scheme,
                config_path = %target.config_path,
                uri = %request.uri(),
                host_override = ?address.host_override(),
                "Forwarding rewritten request"
            );
            metrics::record_rewrite(&target.scheme);

            inner
                .oneshot(request)
                .await
                .map_err(|e| DiscoveryError::Transport(e.into()))
        })
    }
}
