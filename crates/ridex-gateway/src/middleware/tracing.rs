//! Request tracing middleware.
//!
//! Opens an `api_request` span per request and records the request counter
//! and latency histogram once the response is ready.

use axum::{body::Body, http::Request, response::Response};
use ridex_telemetry::{HTTP_REQUESTS, HTTP_REQUEST_DURATION};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{debug, info_span, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let method = req.method().clone();
        let span = info_span!(
            "api_request",
            http.method = %method,
            http.target = %req.uri().path(),
            http.status_code = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(req).await;
                let elapsed = started.elapsed();

                let status = match &result {
                    Ok(response) => response.status().as_u16(),
                    Err(_) => 500,
                };
                Span::current().record("http.status_code", status);

                let status_label = status.to_string();
                HTTP_REQUESTS
                    .with_label_values(&[method.as_str(), status_label.as_str()])
                    .inc();
                HTTP_REQUEST_DURATION
                    .with_label_values(&[method.as_str()])
                    .observe(elapsed.as_secs_f64());

                debug!(
                    status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request completed"
                );

                result
            }
            .instrument(span),
        )
    }
}
