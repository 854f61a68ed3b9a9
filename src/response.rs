use crate::client::UpstreamResponse;
use crate::error::GatewayError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde_json::json;

/// Translate an upstream response into the caller-facing one. HTML is passed
/// through byte-for-byte; everything else is treated as JSON with graceful
/// degradation to raw bytes; non-2xx statuses become the uniform error
/// envelope. The caller always sees the original upstream status code.
pub fn translate(upstream: UpstreamResponse) -> Response<Full<Bytes>> {
    let content_type = upstream.content_type.as_deref().unwrap_or_default();

    if content_type.to_ascii_lowercase().contains("text/html") {
        return passthrough(upstream.status, content_type, upstream.body);
    }

    if upstream.status.is_success() {
        match serde_json::from_slice::<serde_json::Value>(&upstream.body) {
            Ok(value) => json_response(upstream.status, &value),
            // A 2xx with an undecodable body is still a success; hand the
            // bytes back as-is rather than failing the request.
            Err(_) => {
                let content_type = if content_type.is_empty() {
                    "application/octet-stream"
                } else {
                    content_type
                };
                passthrough(upstream.status, content_type, upstream.body)
            }
        }
    } else {
        let text = String::from_utf8_lossy(&upstream.body);
        json_response(
            upstream.status,
            &json!({ "detail": format!("Service error: {}", text) }),
        )
    }
}

/// Boundary conversion for every gateway-side failure: structured JSON body,
/// mapped status code, nothing surfaces as an unhandled fault.
pub fn error_response(err: &GatewayError) -> Response<Full<Bytes>> {
    json_response(
        err.status_code(),
        &json!({ err.envelope_field(): err.caller_detail() }),
    )
}

pub fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn passthrough(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(body))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn upstream(status: u16, content_type: Option<&str>, body: &[u8]) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.map(|s| s.to_string()),
            body: Bytes::copy_from_slice(body),
        }
    }

    async fn response_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_html_passes_through_unchanged() {
        let response = translate(upstream(200, Some("text/html; charset=utf-8"), b"<p>hi</p>"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(&response_bytes(response).await[..], b"<p>hi</p>");
    }

    #[tokio::test]
    async fn test_json_success_reencoded_with_original_status() {
        let response = translate(upstream(
            201,
            Some("application/json"),
            b"{ \"msg\" : \"created\" }",
        ));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(&response_bytes(response).await[..], b"{\"msg\":\"created\"}");
    }

    #[tokio::test]
    async fn test_malformed_json_on_success_degrades_to_raw_bytes() {
        let response = translate(upstream(200, Some("application/json"), b"{broken"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(&response_bytes(response).await[..], b"{broken");
    }

    #[tokio::test]
    async fn test_missing_content_type_defaults_to_octet_stream() {
        let response = translate(upstream(200, None, b"\x00\x01\x02"));
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_upstream_error_wrapped_in_detail_envelope() {
        let response = translate(upstream(
            503,
            Some("application/json"),
            b"{\"msg\":\"down\"}",
        ));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response_bytes(response).await;
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let detail = value["detail"].as_str().unwrap();
        assert!(detail.starts_with("Service error:"));
        assert!(detail.contains("down"));
    }

    #[tokio::test]
    async fn test_error_response_shapes() {
        let response = error_response(&GatewayError::UnknownService("blog".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let value: serde_json::Value =
            serde_json::from_slice(&response_bytes(response).await).unwrap();
        assert!(value["error"].as_str().unwrap().contains("blog"));

        let response = error_response(&GatewayError::Timeout(5));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value: serde_json::Value =
            serde_json::from_slice(&response_bytes(response).await).unwrap();
        assert_eq!(value["detail"], "backend request timed out");
    }
}
