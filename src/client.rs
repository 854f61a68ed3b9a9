use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::translate::OutboundRequest;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use log::debug;
use tokio::time::{timeout, Duration};

/// A response actually received from a backend, 2xx or not. Non-2xx statuses
/// are data for the response translator, never a transport error.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Executes outbound requests over a single pooled client shared across all
/// backends. Connections are reused per host instead of being re-established
/// per call, so concurrent load cannot exhaust file descriptors.
pub struct ForwardingClient {
    client: Client<HttpConnector, Full<Bytes>>,
    request_timeout: Duration,
}

impl ForwardingClient {
    pub fn new(config: &GatewayConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build_http();

        Self {
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Issue exactly one HTTP call, bounded by the configured timeout. The
    /// timeout covers the full exchange including body collection, so a
    /// backend that stalls mid-body cannot hang the caller. No retries here;
    /// retry policy belongs to callers, not the client.
    pub async fn forward(
        &self,
        request: OutboundRequest,
    ) -> Result<UpstreamResponse, GatewayError> {
        let uri = request.uri().clone();

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(classify_transport_error)?;

            let status = response.status();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| GatewayError::Http(e.to_string()))?
                .to_bytes();

            Ok::<UpstreamResponse, GatewayError>(UpstreamResponse {
                status,
                content_type,
                body,
            })
        };

        let upstream = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| GatewayError::Timeout(self.request_timeout.as_secs()))??;

        debug!(
            "upstream {} -> {} ({} bytes)",
            uri,
            upstream.status,
            upstream.body.len()
        );
        Ok(upstream)
    }
}

/// Connection-level failures (refused, reset, DNS) are distinguished from
/// other client errors so the dispatcher can log them as transport faults.
fn classify_transport_error(e: hyper_util::client::legacy::Error) -> GatewayError {
    if e.is_connect() {
        GatewayError::Connect(e.to_string())
    } else {
        GatewayError::Http(e.to_string())
    }
}
