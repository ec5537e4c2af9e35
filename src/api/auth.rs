//! API key authentication layer for the HTTP surface
//!
//! With no keys configured the layer is a pass-through, which is how the
//! service runs behind a trusted gateway.

use std::{
    collections::HashSet,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::warn;

use crate::error::{ErrorDetail, ErrorResponse};

#[derive(Clone)]
pub struct ApiKeyLayer {
    api_keys: Arc<HashSet<String>>,
}

impl ApiKeyLayer {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys: Arc::new(api_keys.into_iter().collect()),
        }
    }
}

impl<S> Layer<S> for ApiKeyLayer {
    type Service = ApiKeyMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyMiddleware {
            inner,
            api_keys: self.api_keys.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ApiKeyMiddleware<S> {
    inner: S,
    api_keys: Arc<HashSet<String>>,
}

impl<S> Service<Request<Body>> for ApiKeyMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Liveness checks stay unauthenticated
        if request.uri().path() == "/health" {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        // No configured keys means an open service
        if self.api_keys.is_empty() {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        let api_key = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).to_string());

        match api_key {
            Some(key) if self.api_keys.contains(&key) => {
                let future = self.inner.call(request);
                Box::pin(async move { future.await })
            }
            Some(_) => {
                warn!("Invalid API key provided");
                Box::pin(async move { Ok(unauthorized("Invalid API key")) })
            }
            None => {
                warn!("No API key provided");
                Box::pin(async move {
                    Ok(unauthorized(
                        "API key required. Provide via Authorization header: 'Bearer YOUR_API_KEY'",
                    ))
                })
            }
        }
    }
}

fn unauthorized(message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            message: message.to_string(),
            r#type: "authentication_error".to_string(),
            code: Some("invalid_api_key".to_string()),
        },
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
