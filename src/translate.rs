use crate::error::GatewayError;
use crate::registry::{BackendAddress, ServiceId};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request, Uri};

/// A fully-formed request ready for the forwarding client.
pub type OutboundRequest = Request<Full<Bytes>>;

/// Inbound request after the service segment has been split off the path.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub sub_path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Headers that must not be forwarded to a backend: hop-by-hop headers, plus
/// the framing headers the translator owns. Host and Content-Length are
/// recomputed for the outbound connection, and Content-Type always describes
/// the translated body (canonical JSON), not whatever the caller declared.
fn is_unforwardable(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "host"
            | "content-length"
            | "content-type"
    )
}

/// Join base address, service segment and sub-path with exactly one slash at
/// each boundary, regardless of how the inputs are slashed. The query string
/// is carried over verbatim when present.
pub fn join_url(base: &str, segment: &str, sub_path: &str, query: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_matches('/');
    let path = sub_path.trim_matches('/');

    let mut url = if path.is_empty() {
        format!("{}/{}", base, segment)
    } else {
        format!("{}/{}/{}", base, segment, path)
    };

    if let Some(q) = query {
        if !q.is_empty() {
            url.push('?');
            url.push_str(q);
        }
    }

    url
}

/// Build the outbound request for a resolved backend. The method is
/// forwarded unchanged; headers start from the JSON defaults with caller
/// headers merged on top (caller wins); the body follows the per-method
/// policy in `prepare_body`.
pub fn translate(
    inbound: &InboundRequest,
    address: &BackendAddress,
    service: ServiceId,
) -> Result<OutboundRequest, GatewayError> {
    let body = prepare_body(inbound)?;

    let url = join_url(
        address.as_str(),
        service.segment(),
        &inbound.sub_path,
        inbound.query.as_deref(),
    );
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| GatewayError::Http(e.to_string()))?;

    let mut request = Request::builder()
        .method(inbound.method.clone())
        .uri(uri)
        .body(Full::new(body))
        .map_err(|e| GatewayError::Http(e.to_string()))?;

    *request.headers_mut() = merge_headers(&inbound.headers);

    Ok(request)
}

/// Default headers first, then caller headers on top — the caller wins for
/// any header it supplies, and duplicate caller values are kept in order.
/// The only exceptions are the unforwardable names above, which the gateway
/// owns outright.
fn merge_headers(caller: &HeaderMap) -> HeaderMap {
    let mut merged = HeaderMap::new();
    merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    merged.insert(ACCEPT, HeaderValue::from_static("application/json"));

    for name in caller.keys() {
        if is_unforwardable(name.as_str()) {
            continue;
        }
        merged.remove(name);
    }
    for (name, value) in caller.iter() {
        if is_unforwardable(name.as_str()) {
            continue;
        }
        merged.append(name.clone(), value.clone());
    }

    merged
}

/// Body policy. GET and DELETE forward an empty body. Body-bearing methods
/// must supply JSON (re-encoded to canonical bytes), the `json_data` form
/// field fallback, or a file upload — the last is rejected as unsupported
/// rather than silently mishandled, and anything else is rejected outright
/// instead of forwarding an empty body.
fn prepare_body(inbound: &InboundRequest) -> Result<Bytes, GatewayError> {
    if inbound.method == Method::GET || inbound.method == Method::DELETE {
        return Ok(Bytes::new());
    }

    let content_type = inbound
        .content_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.contains("application/json") {
        return reencode_json(&inbound.body);
    }

    if content_type.contains("multipart/form-data") {
        return Err(GatewayError::UnsupportedMedia(
            "file uploads are not yet supported".to_string(),
        ));
    }

    if content_type.contains("application/x-www-form-urlencoded") {
        let json_data = url::form_urlencoded::parse(&inbound.body)
            .find(|(key, _)| key == "json_data")
            .map(|(_, value)| value.into_owned());
        return match json_data {
            Some(raw) => reencode_json(raw.as_bytes()),
            None => Err(GatewayError::MissingBody(
                "form data must carry a json_data field".to_string(),
            )),
        };
    }

    Err(GatewayError::MissingBody(
        "a JSON body, a json_data form field, or an application/json request is required"
            .to_string(),
    ))
}

/// Decode and re-encode as canonical JSON bytes. Key order and numeric
/// precision survive the round trip; whitespace does not.
fn reencode_json(raw: &[u8]) -> Result<Bytes, GatewayError> {
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| GatewayError::MalformedBody(e.to_string()))?;
    let bytes = serde_json::to_vec(&value).map_err(|e| GatewayError::Http(e.to_string()))?;
    Ok(Bytes::from(bytes))
}
