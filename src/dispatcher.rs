use crate::client::ForwardingClient;
use crate::error::GatewayError;
use crate::registry::{ServiceId, ServiceRegistry};
use crate::response;
use crate::translate::{self, InboundRequest};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use log::{debug, info, warn};
use std::sync::Arc;

/// Per-request lifecycle. Transitions are strictly sequential and forward;
/// any phase can fail straight to the error boundary, which carries the
/// originating error kind instead of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchPhase {
    Resolving,
    Translating,
    Forwarding,
    ResponseTranslating,
    Completed,
}

/// Entry point for every proxied request: resolve the service, translate the
/// request, forward it, translate the response. Holds the only long-lived
/// state in the process — the read-only registry and the pooled client —
/// and nothing request-scoped between calls.
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    client: ForwardingClient,
}

impl Dispatcher {
    pub fn new(registry: Arc<ServiceRegistry>, client: ForwardingClient) -> Self {
        Self { registry, client }
    }

    /// Proxy one inbound request. Every failure kind is converted into a
    /// structured JSON error response here; nothing escapes as a fault and a
    /// single request's failure never affects other in-flight requests.
    pub async fn dispatch(&self, segment: &str, inbound: InboundRequest) -> Response<Full<Bytes>> {
        match self.run(segment, inbound).await {
            Ok(response) => response,
            Err(err) => {
                warn!("request failed ({}): {}", err.kind(), err);
                response::error_response(&err)
            }
        }
    }

    async fn run(
        &self,
        segment: &str,
        inbound: InboundRequest,
    ) -> Result<Response<Full<Bytes>>, GatewayError> {
        let mut phase = DispatchPhase::Resolving;
        debug!("dispatch phase: {:?}", phase);
        let service: ServiceId = segment.parse()?;
        let address = self.registry.resolve(service);
        info!(
            "routing {} /{}/{} -> {}",
            inbound.method, service, inbound.sub_path, address.as_str()
        );

        phase = DispatchPhase::Translating;
        debug!("dispatch phase: {:?}", phase);
        let outbound = translate::translate(&inbound, address, service)?;

        phase = DispatchPhase::Forwarding;
        debug!("dispatch phase: {:?}", phase);
        let upstream = self.client.forward(outbound).await?;

        phase = DispatchPhase::ResponseTranslating;
        debug!("dispatch phase: {:?}", phase);
        if !upstream.status.is_success() {
            warn!(
                "upstream {} reported status {} for /{}/{}",
                service, upstream.status, service, inbound.sub_path
            );
        }
        let response = response::translate(upstream);

        phase = DispatchPhase::Completed;
        debug!("dispatch phase: {:?}", phase);
        Ok(response)
    }

    pub fn health() -> Response<Full<Bytes>> {
        response::json_response(StatusCode::OK, &serde_json::json!({ "status": "healthy!" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use http_body_util::BodyExt;
    use hyper::header::HeaderMap;
    use hyper::Method;

    fn dispatcher() -> Dispatcher {
        let mut config = GatewayConfig::default();
        for service in ServiceId::ALL {
            config
                .backends
                .insert(service, format!("http://{}.invalid:9", service.segment()));
        }
        let registry = Arc::new(ServiceRegistry::from_config(&config).unwrap());
        let client = ForwardingClient::new(&config);
        Dispatcher::new(registry, client)
    }

    fn inbound(method: Method) -> InboundRequest {
        InboundRequest {
            method,
            sub_path: "search".to_string(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            content_type: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_service_maps_to_404() {
        let response = dispatcher().dispatch("blog", inbound(Method::GET)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].as_str().unwrap().contains("blog"));
    }

    #[tokio::test]
    async fn test_translation_failure_short_circuits_before_forwarding() {
        // POST without a body never reaches the (unroutable) backend.
        let response = dispatcher().dispatch("news", inbound(Method::POST)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_health_payload() {
        let response = Dispatcher::health();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
