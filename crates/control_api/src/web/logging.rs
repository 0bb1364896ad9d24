use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{debug, error, info, warn, Instrument, Span};

/// Request logging settings for the control API
#[derive(Clone, Debug)]
pub struct HttpLoggingConfig {
    /// Path prefixes logged at debug level only (health probes)
    pub quiet_paths: Vec<String>,
}

impl Default for HttpLoggingConfig {
    fn default() -> Self {
        Self {
            quiet_paths: vec!["/health".to_string()],
        }
    }
}

impl HttpLoggingConfig {
    fn is_quiet(&self, path: &str) -> bool {
        self.quiet_paths
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }
}

/// Tower layer that logs method, path, status and latency of every request
#[derive(Clone, Default)]
pub struct HttpLoggingLayer {
    config: HttpLoggingConfig,
}

impl HttpLoggingLayer {
    pub fn new(config: HttpLoggingConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        HttpLoggingService {
            inner: service,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct HttpLoggingService<S> {
    inner: S,
    config: HttpLoggingConfig,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for HttpLoggingService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Error: std::fmt::Display,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let quiet = self.config.is_quiet(&path);
        let start = Instant::now();
        let future = self.inner.call(req);

        let span = Span::current();

        Box::pin(
            async move {
                let result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        if quiet {
                            debug!(%method, path = %path, status, duration_ms, "{method} {path} - {status}");
                        } else if response.status().is_server_error() {
                            warn!(%method, path = %path, status, duration_ms, "{method} {path} - {status}");
                        } else {
                            info!(%method, path = %path, status, duration_ms, "{method} {path} - {status}");
                        }
                    }
                    Err(e) => {
                        error!(
                            %method,
                            path = %path,
                            duration_ms,
                            error = %e,
                            "{method} {path} - ERROR: {e}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
