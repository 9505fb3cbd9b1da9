//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use http::{Request, Response, StatusCode};
use tower::Service;

use discovery_proxy::resolver::{
    Listener, ResolutionOptions, ResolutionResult, ResolvedAddress, Resolver, ResolverFactory,
    Status,
};
use discovery_proxy::BoxError;

/// What the transport saw for one request.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: http::Method,
    pub uri: String,
    pub host: Option<String>,
    pub headers: http::HeaderMap,
    pub body: String,
}

/// Transport that records every request and answers `200 OK`, or fails with
/// `error` when one is set.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub seen: Arc<Mutex<Vec<Recorded>>>,
    pub error: Option<&'static str>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: &'static str) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> Recorded {
        self.seen.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

impl Service<Request<String>> for RecordingTransport {
    type Response = Response<String>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<String>) -> Self::Future {
        let seen = self.seen.clone();
        let error = self.error;

        Box::pin(async move {
            let host = req
                .headers()
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            seen.lock().unwrap().push(Recorded {
                method: req.method().clone(),
                uri: req.uri().to_string(),
                host,
                headers: req.headers().clone(),
                body: req.body().clone(),
            });

            match error {
                Some(msg) => Err(msg.into()),
                None => Ok(Response::builder()
                    .status(StatusCode::OK)
                    .body("ok".to_string())
                    .unwrap()),
            }
        })
    }
}

/// Factory whose resolvers publish a fixed result, optionally after a delay.
#[allow(dead_code)]
pub struct StaticFactory {
    pub scheme: &'static str,
    pub result: ResolutionResult,
    pub delay: Option<Duration>,
    pub created: Arc<AtomicUsize>,
    pub started: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl StaticFactory {
    pub fn new(scheme: &'static str, addresses: Vec<ResolvedAddress>) -> Self {
        Self {
            scheme,
            result: ResolutionResult::Success(addresses),
            delay: None,
            created: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(scheme: &'static str, status: Status) -> Self {
        Self {
            result: ResolutionResult::Failure(status),
            ..Self::new(scheme, Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl ResolverFactory for StaticFactory {
    fn name(&self) -> &str {
        self.scheme
    }

    fn create(&self, _options: ResolutionOptions) -> Box<dyn Resolver> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(StaticResolver {
            result: self.result.clone(),
            delay: self.delay,
            started: self.started.clone(),
        })
    }
}

struct StaticResolver {
    result: ResolutionResult,
    delay: Option<Duration>,
    started: Arc<AtomicUsize>,
}

impl Resolver for StaticResolver {
    fn start(&self, listener: Listener) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let result = self.result.clone();
        match self.delay {
            None => listener(result),
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    listener(result);
                });
            }
        }
    }
}

/// Factory whose resolvers publish a script of results, each after its own
/// delay measured from the previous one. A zero first delay publishes
/// synchronously inside `start`.
#[allow(dead_code)]
pub struct ScriptedFactory {
    pub scheme: &'static str,
    pub script: Vec<(Duration, ResolutionResult)>,
}

impl ResolverFactory for ScriptedFactory {
    fn name(&self) -> &str {
        self.scheme
    }

    fn create(&self, _options: ResolutionOptions) -> Box<dyn Resolver> {
        Box::new(ScriptedResolver {
            script: self.script.clone(),
        })
    }
}

struct ScriptedResolver {
    script: Vec<(Duration, ResolutionResult)>,
}

impl Resolver for ScriptedResolver {
    fn start(&self, listener: Listener) {
        let mut script = self.script.clone().into_iter().peekable();
        while let Some((delay, _)) = script.peek() {
            if !delay.is_zero() {
                break;
            }
            if let Some((_, result)) = script.next() {
                listener(result);
            }
        }

        let rest: Vec<_> = script.collect();
        if rest.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for (delay, result) in rest {
                tokio::time::sleep(delay).await;
                listener(result);
            }
        });
    }
}
