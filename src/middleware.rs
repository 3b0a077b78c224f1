// src/middleware.rs

//! Request-path rate limiting.
//!
//! [`RateLimitMiddleware`] is the framework-agnostic core: given the client's
//! identity and the rest of the pipeline, it either forwards or short-circuits.
//! [`RateLimitLayer`] wraps it as a `tower` layer for axum routers.
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use axum::{Router, routing::get};
//! use shelf_limiter::{LimiterConfig, RateLimitLayer, RateLimiter, SystemClock};
//!
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = Arc::new(RateLimiter::<String, _>::with_config(LimiterConfig::default(), SystemClock)?);
//! let janitor = limiter.spawn_janitor();
//!
//! let app = Router::new()
//!     .route("/v1/books", get(|| async { "[]" }))
//!     .layer(RateLimitLayer::new(Arc::clone(&limiter)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:4000").await?;
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! janitor.shutdown().await;
//! # Ok(())
//! # }
//! ```

// dependencies
use crate::clock::{Clock, SystemClock};
use crate::errors::{IdentityError, LimiterError};
use crate::identity::{IdentityExtractor, PeerIpExtractor};
use crate::limiter::{RateLimitDecision, RateLimiter};
use axum::Json;
use axum::http::{HeaderValue, Request, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::error;

pub const RATE_LIMIT_EXCEEDED_MESSAGE: &str = "rate limit exceeded";
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// What happened to a request that reached the limiter.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The next handler ran; its result is passed through untouched.
    Forwarded(T),
    /// The client's bucket was empty; the next handler never ran.
    Limited(RateLimitDecision),
}

impl<T> Outcome<T> {
    pub fn is_limited(&self) -> bool {
        matches!(self, Outcome::Limited(_))
    }
}

/// Rate limiting in front of an arbitrary next step.
pub struct RateLimitMiddleware<C = SystemClock>
where
    C: Clock,
{
    limiter: Arc<RateLimiter<String, C>>,
}

impl<C: Clock> Clone for RateLimitMiddleware<C> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<C: Clock> RateLimitMiddleware<C> {
    pub fn new(limiter: Arc<RateLimiter<String, C>>) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter<String, C>> {
        &self.limiter
    }

    /// Admit or reject one request, calling `next` at most once.
    ///
    /// When the limiter is disabled `next` always runs and the identity is not
    /// inspected. An identity error is returned as-is rather than charged to
    /// any bucket. The bucket decision is complete, and its lock released,
    /// before `next` is called.
    pub async fn handle<F, Fut>(
        &self,
        identity: Result<String, IdentityError>,
        next: F,
    ) -> Result<Outcome<Fut::Output>, LimiterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        if !self.limiter.is_enabled() {
            return Ok(Outcome::Forwarded(next().await));
        }

        let client = identity?;
        let decision = self.limiter.check_request(client)?;

        if decision.allowed {
            Ok(Outcome::Forwarded(next().await))
        } else {
            Ok(Outcome::Limited(decision))
        }
    }
}

/// `tower` layer applying a [`RateLimitMiddleware`] to every request.
pub struct RateLimitLayer<E = PeerIpExtractor, C = SystemClock>
where
    C: Clock,
{
    middleware: RateLimitMiddleware<C>,
    extractor: Arc<E>,
}

impl<E, C: Clock> Clone for RateLimitLayer<E, C> {
    fn clone(&self) -> Self {
        Self {
            middleware: self.middleware.clone(),
            extractor: Arc::clone(&self.extractor),
        }
    }
}

impl<C: Clock> RateLimitLayer<PeerIpExtractor, C> {
    /// Layer keyed by the peer IP address.
    pub fn new(limiter: Arc<RateLimiter<String, C>>) -> Self {
        Self {
            middleware: RateLimitMiddleware::new(limiter),
            extractor: Arc::new(PeerIpExtractor),
        }
    }
}

impl<E, C: Clock> RateLimitLayer<E, C> {
    /// Swap in a different way of identifying clients.
    pub fn with_extractor<E2: IdentityExtractor>(self, extractor: E2) -> RateLimitLayer<E2, C> {
        RateLimitLayer {
            middleware: self.middleware,
            extractor: Arc::new(extractor),
        }
    }
}

impl<S, E, C: Clock> Layer<S> for RateLimitLayer<E, C> {
    type Service = RateLimitService<S, E, C>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            middleware: self.middleware.clone(),
            extractor: Arc::clone(&self.extractor),
        }
    }
}

/// Service produced by [`RateLimitLayer`].
pub struct RateLimitService<S, E = PeerIpExtractor, C = SystemClock>
where
    C: Clock,
{
    inner: S,
    middleware: RateLimitMiddleware<C>,
    extractor: Arc<E>,
}

impl<S: Clone, E, C: Clock> Clone for RateLimitService<S, E, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            middleware: self.middleware.clone(),
            extractor: Arc::clone(&self.extractor),
        }
    }
}

impl<S, B, E, C> Service<Request<B>> for RateLimitService<S, E, C>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    E: IdentityExtractor + 'static,
    C: Clock + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        // keep the service that was polled ready, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let middleware = self.middleware.clone();
        let identity = self.extractor.extract(&request);

        Box::pin(async move {
            match middleware.handle(identity, move || inner.call(request)).await {
                Ok(Outcome::Forwarded(result)) => result,
                Ok(Outcome::Limited(decision)) => Ok(rate_limit_exceeded_response(&decision)),
                Err(err) => {
                    error!(error = %err, "rate limiter could not process request");
                    Ok(server_error_response())
                }
            }
        })
    }
}

/// `429 Too Many Requests` with the JSON error envelope and `Retry-After`.
pub fn rate_limit_exceeded_response(decision: &RateLimitDecision) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": RATE_LIMIT_EXCEEDED_MESSAGE })),
    )
        .into_response();

    if let Some(seconds) = decision.retry_after_seconds {
        let whole = seconds.ceil().max(1.0) as u64;
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(whole));
    }
    response
}

/// `500 Internal Server Error` with the JSON error envelope.
pub fn server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": SERVER_ERROR_MESSAGE })),
    )
        .into_response()
}
