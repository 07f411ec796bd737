use thiserror::Error;

/// Main error type for the overlay client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// Non-2xx response from a REST command; carries the response body verbatim
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connection(_) | ClientError::WebSocket(_) => true,
            ClientError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ClientError::Connection(_) => "connection_error",
            ClientError::Status { .. } => "http_status",
            ClientError::Parse(_) => "parse_error",
            ClientError::WebSocket(_) => "websocket_error",
            ClientError::Config(_) => "config_error",
            ClientError::Internal(_) => "internal_error",
        }
    }

    /// Status code of a failed REST command, if this error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Connection("Request timeout. Is the analysis backend running?".to_string())
        } else if err.is_connect() {
            ClientError::Connection(format!("Failed to connect to analysis backend: {}", err))
        } else if err.is_decode() {
            ClientError::Parse(format!("Response body could not be decoded: {}", err))
        } else if let Some(status) = err.status() {
            ClientError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ClientError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(format!("JSON parsing failed: {}", err))
    }
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_carries_code_and_body() {
        let err = ClientError::Status {
            status: 404,
            body: "{\"detail\":\"session not found\"}".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.error_type(), "http_status");
        assert!(err.to_string().contains("session not found"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::Connection("down".into()).is_retryable());
        assert!(ClientError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!ClientError::Parse("bad".into()).is_retryable());
    }
}
