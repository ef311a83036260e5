//! HTTP surface
//!
//! - `GET /api/data`: one fresh fleet sweep on the current config snapshot
//! - `GET /metrics`: Prometheus text format
//! - `GET /health`: liveness of this process

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ConfigStore;
use crate::health::{HealthChecker, ProbeSettings, SystemStatus};
use crate::metrics::metrics;

/// Envelope for `/api/data`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub data: T,
    pub message: String,
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            data,
            message: "success".to_string(),
            timestamp: unix_timestamp(),
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Shared state for request handlers
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub checker: HealthChecker,
}

impl AppState {
    pub fn new(config: Arc<ConfigStore>, checker: HealthChecker) -> Self {
        Self { config, checker }
    }

    /// Sweep the fleet using the configuration snapshot current at call time
    pub async fn fleet_status(&self) -> Vec<SystemStatus> {
        let snapshot = self.config.snapshot();
        let checker = self
            .checker
            .with_settings(ProbeSettings::from(&snapshot.probe));
        checker.check_fleet(&snapshot.databases).await
    }
}

type HttpResponse = Response<Full<Bytes>>;

fn text_response(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut resp = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *resp.status_mut() = status;
    resp
}

fn json_response<T: Serialize>(value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut resp = Response::new(Full::new(Bytes::from(body)));
            resp.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
            resp.headers_mut().insert(
                CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            );
            resp
        }
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Route one request
pub async fn handle_request<B>(state: Arc<AppState>, req: Request<B>) -> HttpResponse {
    let path = req.uri().path().to_string();
    debug!(method = %req.method(), path = %path, "HTTP request");

    let resp = match (req.method(), path.as_str()) {
        (&Method::GET, "/api/data") => {
            let statuses = state.fleet_status().await;
            json_response(&ApiResponse::success(statuses))
        }
        #[cfg(feature = "mock")]
        (&Method::GET, "/api/mock-data") => {
            json_response(&ApiResponse::success(crate::mock::mock_fleet(12)))
        }
        (&Method::GET, "/metrics") => {
            let mut resp = Response::new(Full::new(Bytes::from(metrics().gather())));
            resp.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            resp
        }
        (&Method::GET, "/health") => text_response(StatusCode::OK, "OK"),
        (_, "/api/data" | "/metrics" | "/health") => {
            text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => return text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    metrics().record_http_request(&path);
    resp
}

/// Accept connections on `addr` until `shutdown` fires
pub async fn serve(addr: &str, state: Arc<AppState>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "dgwatch listening");

    serve_listener(listener, state, shutdown).await
}

/// Accept connections on an already bound listener until `shutdown` fires
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("HTTP server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(v) => v,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle_request(state, req).await) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %peer, error = %e, "HTTP connection error");
            }
        });
    }
}
