use crate::config::GatewayConfig;
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::translate::InboundRequest;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1::Builder as ServerBuilder;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{error, info};
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::response::json_response;

/// The inbound HTTP surface: `/{service}/{path...}` for the five proxied
/// methods, `GET /health`, and permissive CORS as the original deployment
/// had. One task per connection; each request is an independent unit of work.
pub struct GatewayServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    route_prefix: Option<String>,
}

impl GatewayServer {
    pub async fn bind(
        config: &GatewayConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let route_prefix = config
            .route_prefix
            .as_deref()
            .map(|p| format!("/{}", p.trim_matches('/')))
            .filter(|p| p != "/");

        Ok(Self {
            listener,
            dispatcher,
            route_prefix,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        self.listener.local_addr().map_err(GatewayError::Io)
    }

    pub async fn serve(self) -> Result<(), GatewayError> {
        info!("gateway listening on: http://{}", self.local_addr()?);

        loop {
            let (stream, _) = self.listener.accept().await?;
            let dispatcher = self.dispatcher.clone();
            let route_prefix = self.route_prefix.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let dispatcher = dispatcher.clone();
                    let route_prefix = route_prefix.clone();
                    async move {
                        let response = handle(dispatcher, route_prefix.as_deref(), req).await;
                        Ok::<_, Infallible>(with_cors(response))
                    }
                });

                if let Err(err) = ServerBuilder::new().serve_connection(io, service).await {
                    error!("error serving connection: {}", err);
                }
            });
        }
    }
}

async fn handle(
    dispatcher: Arc<Dispatcher>,
    route_prefix: Option<&str>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    if req.method() == Method::OPTIONS {
        return preflight();
    }

    let path = req.uri().path().to_string();
    let path = match strip_route_prefix(&path, route_prefix) {
        Some(p) => p.to_string(),
        None => return json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" })),
    };

    if req.method() == Method::GET && path.trim_end_matches('/') == "/health" {
        return Dispatcher::health();
    }

    if !matches!(
        *req.method(),
        Method::GET | Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    ) {
        return json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({ "error": "method not allowed" }),
        );
    }

    let trimmed = path.trim_start_matches('/');
    let (segment_raw, sub_path) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    if segment_raw.is_empty() {
        return json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" }));
    }
    let segment = percent_decode_str(segment_raw)
        .decode_utf8_lossy()
        .into_owned();

    let method = req.method().clone();
    let query = req.uri().query().map(|q| q.to_string());
    let headers = req.headers().clone();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let sub_path = sub_path.to_string();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": format!("failed to read request body: {}", e) }),
            );
        }
    };

    let inbound = InboundRequest {
        method,
        sub_path,
        query,
        headers,
        body,
        content_type,
    };

    dispatcher.dispatch(&segment, inbound).await
}

/// Strip the configured mount prefix. Requests outside the prefix are not
/// part of the gateway surface.
fn strip_route_prefix<'a>(path: &'a str, prefix: Option<&str>) -> Option<&'a str> {
    match prefix {
        None => Some(path),
        Some(prefix) => match path.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        },
    }
}

fn with_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    response
        .headers_mut()
        .insert("access-control-allow-origin", HeaderValue::from_static("*"));
    response
}

fn preflight() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("access-control-allow-origin", "*")
        .header(
            "access-control-allow-methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS",
        )
        .header("access-control-allow-headers", "*")
        .header("access-control-allow-credentials", "true")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
