//! Virtual URI parsing and the request type that carries one.
//!
//! `http::Uri` requires an authority on absolute URIs, so `config:///key/path`
//! cannot live in an `http::Request`. A [`VirtualRequest`] keeps the target as
//! a `url::Url` until the interceptor rewrites it into a real request.

use http::header::{HeaderMap, HOST};
use http::{Extensions, HeaderValue, Method, Request, Uri, Version};
use url::Url;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::resolver::ResolvedAddress;

/// Scheme every rewritten request is sent with.
pub const SECURE_SCHEME: &str = "https";

/// A virtual URI split into its routing parts.
///
/// For `config:///addresses:backend/api/product/1?id=2`:
/// - `scheme` = `config`
/// - `config_path` = `addresses:backend`
/// - `request_path` = `/api/product/1`
/// - `query` = `Some("id=2")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualTarget {
    pub scheme: String,
    pub config_path: String,
    pub request_path: String,
    pub query: Option<String>,
}

impl VirtualTarget {
    pub fn parse(url: &Url) -> DiscoveryResult<Self> {
        let path = url.path().trim_start_matches('/');
        let (config_path, request_path) = match path.find('/') {
            Some(end) => (&path[..end], &path[end..]),
            None => (path, ""),
        };

        if config_path.is_empty() {
            return Err(DiscoveryError::InvalidTarget {
                target: url.to_string(),
                reason: "missing resolver key in path".to_string(),
            });
        }

        Ok(Self {
            scheme: url.scheme().to_string(),
            config_path: config_path.to_string(),
            request_path: request_path.to_string(),
            query: url.query().map(str::to_string),
        })
    }

    /// `https://host:port{request_path}[?query]` for the resolved address.
    ///
    /// An empty request path is sent as `/`.
    pub fn rewrite_uri(&self, address: &ResolvedAddress) -> Result<Uri, http::Error> {
        let path_and_query = match &self.query {
            Some(q) => format!("{}?{}", self.request_path, q),
            None => self.request_path.clone(),
        };

        Uri::builder()
            .scheme(SECURE_SCHEME)
            .authority(address.endpoint.to_string())
            .path_and_query(path_and_query)
            .build()
    }
}

/// An outbound request addressed to a virtual URI.
#[derive(Debug)]
pub struct VirtualRequest<B> {
    target: Url,
    method: Method,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: B,
}

impl<B> VirtualRequest<B> {
    /// A `GET` request to `target`.
    pub fn new(target: Url, body: B) -> Self {
        Self {
            target,
            method: Method::GET,
            version: Version::default(),
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            body,
        }
    }

    /// Parse `target` and build a request with the given method.
    pub fn parse(method: Method, target: &str, body: B) -> DiscoveryResult<Self> {
        let url = Url::parse(target).map_err(|e| DiscoveryError::InvalidTarget {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        let mut req = Self::new(url, body);
        req.method = method;
        Ok(req)
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    /// Rewrite into a concrete request for `address`.
    ///
    /// Method, version, headers, extensions and body carry over unchanged. If
    /// the address has a `HostOverride` attribute it becomes the `Host`
    /// header; the URI still points at the resolved endpoint.
    pub fn into_request(
        self,
        target: &VirtualTarget,
        address: &ResolvedAddress,
    ) -> Result<Request<B>, http::Error> {
        let uri = target.rewrite_uri(address)?;

        let mut request = Request::builder()
            .method(self.method)
            .version(self.version)
            .uri(uri)
            .body(self.body)?;
        *request.headers_mut() = self.headers;
        *request.extensions_mut() = self.extensions;

        if let Some(host) = address.host_override() {
            match HeaderValue::from_str(host) {
                Ok(value) => {
                    request.headers_mut().insert(HOST, value);
                }
                Err(e) => {
                    tracing::warn!(host_override = %host, error = %e, "Ignoring host override that is not a valid header value");
                }
            }
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::HOST_OVERRIDE;

    fn target(s: &str) -> VirtualTarget {
        VirtualTarget::parse(&Url::parse(s).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_with_request_path() {
        let t = target("config:///addresses:backend/api/product/1?id=2&x=y");
        assert_eq!(t.scheme, "config");
        assert_eq!(t.config_path, "addresses:backend");
        assert_eq!(t.request_path, "/api/product/1");
        assert_eq!(t.query.as_deref(), Some("id=2&x=y"));
    }

    #[test]
    fn test_parse_without_request_path() {
        let t = target("config:///addresses:backend");
        assert_eq!(t.config_path, "addresses:backend");
        assert_eq!(t.request_path, "");
        assert_eq!(t.query, None);
    }

    #[test]
    fn test_parse_trailing_slash() {
        let t = target("dns:///example.com/");
        assert_eq!(t.config_path, "example.com");
        assert_eq!(t.request_path, "/");
    }

    #[test]
    fn test_parse_missing_key() {
        let url = Url::parse("config:///").unwrap();
        assert!(matches!(
            VirtualTarget::parse(&url),
            Err(DiscoveryError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_rewrite_uri() {
        let addr = ResolvedAddress::new("localhost", 80);
        let uri = target("config:///addresses:backend/api/product/1").rewrite_uri(&addr).unwrap();
        assert_eq!(uri.to_string(), "https://localhost:80/api/product/1");

        let uri = target("config:///addresses:backend/api?page=3").rewrite_uri(&addr).unwrap();
        assert_eq!(uri.to_string(), "https://localhost:80/api?page=3");
    }

    #[test]
    fn test_rewrite_empty_path() {
        let addr = ResolvedAddress::new("localhost", 80);
        let uri = target("config:///addresses:backend").rewrite_uri(&addr).unwrap();
        assert_eq!(uri.path(), "/");
        assert_eq!(uri.authority().map(|a| a.as_str()), Some("localhost:80"));
    }

    #[test]
    fn test_into_request_host_override() {
        let mut addr = ResolvedAddress::new("10.1.2.3", 8443);
        addr.attributes.insert(HOST_OVERRIDE, "svc.internal".to_string());

        let mut req = VirtualRequest::parse(Method::POST, "dns:///svc.internal/v1/items", "{}").unwrap();
        req.headers_mut().insert("x-trace", HeaderValue::from_static("abc"));
        let t = VirtualTarget::parse(req.target()).unwrap();

        let out = req.into_request(&t, &addr).unwrap();
        assert_eq!(out.method(), Method::POST);
        assert_eq!(out.uri().to_string(), "https://10.1.2.3:8443/v1/items");
        assert_eq!(out.headers()[HOST], "svc.internal");
        assert_eq!(out.headers()["x-trace"], "abc");
        assert_eq!(*out.body(), "{}");
    }

    #[test]
    fn test_into_request_without_override() {
        let addr = ResolvedAddress::new("localhost", 80);
        let req = VirtualRequest::parse(Method::GET, "config:///k/a", ()).unwrap();
        let t = VirtualTarget::parse(req.target()).unwrap();
        let out = req.into_request(&t, &addr).unwrap();
        assert!(out.headers().get(HOST).is_none());
    }
}
