//! End-to-end tests for the discovery layer in front of a transport.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tower::{Layer, ServiceExt};

use discovery_proxy::config::{parse_config, ConfigSource};
use discovery_proxy::resolver::{
    Attributes, Endpoint, ResolutionResult, ResolvedAddress, Status, StatusCode, HOST_OVERRIDE,
};
use discovery_proxy::{resolvers, DiscoveryError, DiscoveryLayer, ResolutionDefaults, ResolverRegistry, VirtualRequest};

mod common;
use common::{RecordingTransport, ScriptedFactory, StaticFactory};

fn layer_with(factory: StaticFactory) -> (DiscoveryLayer, Arc<StaticFactory>) {
    let factory = Arc::new(factory);
    let registry = ResolverRegistry::default().with_factory(factory.clone());
    let defaults = ResolutionDefaults {
        wait_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    (DiscoveryLayer::with_defaults(registry, defaults), factory)
}

fn get(target: &str) -> VirtualRequest<String> {
    VirtualRequest::parse(Method::GET, target, String::new()).unwrap()
}

#[tokio::test]
async fn test_rewrites_to_resolved_address() {
    let (layer, _) = layer_with(StaticFactory::new("config", vec![ResolvedAddress::new("localhost", 80)]));
    let transport = RecordingTransport::new();
    let service = layer.layer(transport.clone());

    let res = service
        .oneshot(get("config:///addresses:backend/api/product/1?sort=asc"))
        .await
        .unwrap();

    assert_eq!(res.status(), http::StatusCode::OK);
    let seen = transport.last();
    assert_eq!(seen.uri, "https://localhost:80/api/product/1?sort=asc");
    assert_eq!(seen.host, None);
}

#[tokio::test]
async fn test_empty_request_path() {
    let (layer, _) = layer_with(StaticFactory::new("config", vec![ResolvedAddress::new("localhost", 80)]));
    let transport = RecordingTransport::new();

    layer
        .layer(transport.clone())
        .oneshot(get("config:///addresses:backend"))
        .await
        .unwrap();

    assert_eq!(transport.last().uri, "https://localhost:80/");
}

#[tokio::test]
async fn test_host_override_sets_host_header() {
    let address = ResolvedAddress::with_attributes(
        Endpoint::new("10.0.0.5", 8443),
        Attributes::new().with(HOST_OVERRIDE, "svc.internal".to_string()),
    );
    let (layer, _) = layer_with(StaticFactory::new("dns", vec![address]));
    let transport = RecordingTransport::new();

    let mut req = VirtualRequest::parse(Method::POST, "dns:///svc.internal/orders", r#"{"id":1}"#.to_string()).unwrap();
    req.headers_mut().insert(http::header::HOST, http::HeaderValue::from_static("ignored"));
    req.headers_mut().insert("x-request-id", http::HeaderValue::from_static("r-1"));

    layer.layer(transport.clone()).oneshot(req).await.unwrap();

    let seen = transport.last();
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.uri, "https://10.0.0.5:8443/orders");
    assert_eq!(seen.host.as_deref(), Some("svc.internal"));
    assert_eq!(seen.headers.get_all(http::header::HOST).iter().count(), 1);
    assert_eq!(seen.headers["x-request-id"], "r-1");
    assert_eq!(seen.body, r#"{"id":1}"#);
}

#[tokio::test]
async fn test_unknown_scheme_never_reaches_transport() {
    let (layer, factory) = layer_with(StaticFactory::new("config", vec![ResolvedAddress::new("localhost", 80)]));
    let transport = RecordingTransport::new();

    let err = layer
        .layer(transport.clone())
        .oneshot(get("consul:///web/index.html"))
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::UnknownScheme(ref s) if s == "consul"));
    assert_eq!(err.to_string(), "Couldn't create a resolver for the scheme 'consul'.");
    assert!(err.is_routing());
    assert_eq!(transport.calls(), 0);
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_resolution_failure_surfaces() {
    let (layer, _) = layer_with(
        StaticFactory::failing(
            "config",
            Status::new(StatusCode::NotFound, "Resolve failed LookupError: Section 'x' not found"),
        )
        .with_delay(Duration::from_millis(50)),
    );
    let transport = RecordingTransport::new();

    let err = layer
        .layer(transport.clone())
        .oneshot(get("config:///x/a"))
        .await
        .unwrap_err();

    match err {
        DiscoveryError::Resolution { scheme, status } => {
            assert_eq!(scheme, "config");
            assert_eq!(status.code, StatusCode::NotFound);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_transport_error_passes_through() {
    let (layer, _) = layer_with(StaticFactory::new("config", vec![ResolvedAddress::new("localhost", 80)]));
    let transport = RecordingTransport::failing("connection refused");

    let err = layer
        .layer(transport.clone())
        .oneshot(get("config:///addresses:backend/ping"))
        .await
        .unwrap_err();

    match err {
        DiscoveryError::Transport(source) => assert_eq!(source.to_string(), "connection refused"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_invalid_target() {
    let (layer, _) = layer_with(StaticFactory::new("config", vec![ResolvedAddress::new("localhost", 80)]));
    let transport = RecordingTransport::new();

    let err = layer.layer(transport.clone()).oneshot(get("config:///")).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidTarget { .. }));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_delayed_resolution_is_awaited() {
    let (layer, _) = layer_with(
        StaticFactory::new("config", vec![ResolvedAddress::new("slow.local", 9000)])
            .with_delay(Duration::from_millis(50)),
    );
    let transport = RecordingTransport::new();

    layer
        .layer(transport.clone())
        .oneshot(get("config:///k/health"))
        .await
        .unwrap();

    assert_eq!(transport.last().uri, "https://slow.local:9000/health");
}

#[tokio::test]
async fn test_config_resolver_end_to_end() {
    let config = parse_config(
        r#"
[addresses.backend]
host = "localhost"
port = 80

[addresses.edge]
host = "10.0.0.9"
port = 443
host_override = "edge.internal"
"#,
    )
    .unwrap();
    let registry = resolvers::default_registry(ConfigSource::new(config));
    let transport = RecordingTransport::new();
    let service = DiscoveryLayer::new(registry).layer(transport.clone());

    service
        .clone()
        .oneshot(get("config:///addresses:backend/api/product/1"))
        .await
        .unwrap();
    assert_eq!(transport.last().uri, "https://localhost:80/api/product/1");

    // The cache is keyed by scheme: a second config path reuses the first
    // resolver's address.
    service
        .oneshot(get("config:///addresses:edge/status"))
        .await
        .unwrap();
    assert_eq!(transport.last().uri, "https://localhost:80/status");
}

#[tokio::test]
async fn test_failure_before_request_does_not_fail_it() {
    let factory = ScriptedFactory {
        scheme: "dns",
        script: vec![
            (Duration::ZERO, ResolutionResult::Failure(Status::new(StatusCode::Unavailable, "lookup failed"))),
            (Duration::from_millis(100), ResolutionResult::Success(vec![ResolvedAddress::new("10.0.0.1", 443)])),
        ],
    };
    let registry = ResolverRegistry::default().with_factory(Arc::new(factory));
    let transport = RecordingTransport::new();
    let service = DiscoveryLayer::new(registry).layer(transport.clone());

    service.oneshot(get("dns:///api.internal/v1")).await.unwrap();
    assert_eq!(transport.last().uri, "https://10.0.0.1:443/v1");
}

#[tokio::test]
async fn test_failure_fails_only_requests_already_waiting() {
    let factory = ScriptedFactory {
        scheme: "dns",
        script: vec![
            (Duration::from_millis(30), ResolutionResult::Failure(Status::new(StatusCode::Unavailable, "lookup failed"))),
            (Duration::from_millis(100), ResolutionResult::Success(vec![ResolvedAddress::new("10.0.0.2", 443)])),
        ],
    };
    let registry = ResolverRegistry::default().with_factory(Arc::new(factory));
    let transport = RecordingTransport::new();
    let service = DiscoveryLayer::new(registry).layer(transport.clone());

    let err = service
        .clone()
        .oneshot(get("dns:///api.internal/first"))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Resolution { ref status, .. } if status.message == "lookup failed"));

    service.oneshot(get("dns:///api.internal/second")).await.unwrap();
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.last().uri, "https://10.0.0.2:443/second");
}
