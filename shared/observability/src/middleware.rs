//! actix-web middleware that logs each request with a request id.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::{error, info, info_span, warn, Instrument};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Request id stored in the request extensions for handlers that want it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
pub struct RequestLoggingConfig {
    pub service_name: String,
    /// Paths that are passed through without logging, e.g. /health
    pub exclude_paths: Vec<String>,
    pub slow_request_threshold_ms: u64,
}

impl RequestLoggingConfig {
    pub fn for_service(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            exclude_paths: vec!["/health".to_string()],
            slow_request_threshold_ms: 2000,
        }
    }

    pub fn with_slow_threshold(mut self, ms: u64) -> Self {
        self.slow_request_threshold_ms = ms;
        self
    }
}

#[derive(Clone)]
pub struct RequestLogging {
    config: RequestLoggingConfig,
}

impl RequestLogging {
    pub fn new(config: RequestLoggingConfig) -> Self {
        Self { config }
    }
}

/// Helper to create the request logging middleware for a service
pub fn request_logging(service_name: impl Into<String>) -> RequestLogging {
    RequestLogging::new(RequestLoggingConfig::for_service(service_name))
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingService {
            service: Rc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct RequestLoggingService<S> {
    service: Rc<S>,
    config: RequestLoggingConfig,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let config = self.config.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            if config.exclude_paths.iter().any(|p| path.starts_with(p.as_str())) {
                return service.call(req).await;
            }

            let method = req.method().to_string();
            let request_id = header_value(&req, REQUEST_ID_HEADER)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let user_id = header_value(&req, USER_ID_HEADER).unwrap_or_else(|| "-".to_string());
            req.extensions_mut().insert(RequestId(request_id.clone()));

            let span = info_span!(
                "http_request",
                service = %config.service_name,
                request_id = %request_id,
                method = %method,
                path = %path,
                user_id = %user_id,
            );

            let start = Instant::now();
            let result = service.call(req).instrument(span).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(mut res) => {
                    let status = res.status().as_u16();
                    if let (Ok(name), Ok(value)) = (
                        HeaderName::from_bytes(REQUEST_ID_HEADER.as_bytes()),
                        HeaderValue::from_str(&request_id),
                    ) {
                        res.headers_mut().insert(name, value);
                    }

                    if status >= 500 {
                        error!(request_id = %request_id, status, duration_ms, "← {} {} {} {}ms", method, path, status, duration_ms);
                    } else if status >= 400 {
                        warn!(request_id = %request_id, status, duration_ms, "← {} {} {} {}ms", method, path, status, duration_ms);
                    } else if duration_ms > config.slow_request_threshold_ms {
                        warn!(request_id = %request_id, status, duration_ms, "← SLOW {} {} {} {}ms", method, path, status, duration_ms);
                    } else {
                        info!(request_id = %request_id, status, duration_ms, "← {} {} {} {}ms", method, path, status, duration_ms);
                    }
                    Ok(res)
                }
                Err(e) => {
                    error!(request_id = %request_id, duration_ms, error = %e, "← {} {} ERROR {}ms", method, path, duration_ms);
                    Err(e)
                }
            }
        })
    }
}

fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
