use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("request body is required: {0}")]
    MissingBody(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("backend connection failed: {0}")]
    Connect(String),

    #[error("backend request timed out after {0}s")]
    Timeout(u64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Status code returned to the caller for this error kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownService(_) => StatusCode::NOT_FOUND,
            GatewayError::UnsupportedMedia(_) => StatusCode::NOT_IMPLEMENTED,
            GatewayError::MissingBody(_) | GatewayError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. Transport failures get a generic message so
    /// backend addresses never leak; the full error goes to the log instead.
    pub fn caller_detail(&self) -> String {
        match self {
            GatewayError::Connect(_) => "backend request failed".to_string(),
            GatewayError::Timeout(_) => "backend request timed out".to_string(),
            other => other.to_string(),
        }
    }

    /// Short tag used in log lines to classify where the failure originated.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownService(_) => "resolution",
            GatewayError::UnsupportedMedia(_)
            | GatewayError::MissingBody(_)
            | GatewayError::MalformedBody(_) => "translation",
            GatewayError::Connect(_) | GatewayError::Timeout(_) => "transport",
            GatewayError::Config(_) => "config",
            GatewayError::Url(_) | GatewayError::Http(_) | GatewayError::Io(_) => "internal",
        }
    }

    /// Transport failures use the `detail` envelope field, the same shape
    /// backends report their own errors in; gateway-side rejections use
    /// `error`.
    pub fn envelope_field(&self) -> &'static str {
        match self {
            GatewayError::Connect(_) | GatewayError::Timeout(_) => "detail",
            _ => "error",
        }
    }
}
