use thiserror::Error;

/// Failure of a single request to the assistant endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No response arrived: connect failure, dropped connection or timeout.
    #[error("network error: {0}")]
    Network(String),
    /// A response arrived but was non-2xx or not the expected payload.
    #[error("server error: {0}")]
    Server(String),
}

impl TransportError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            TransportError::Network(err.to_string())
        } else {
            TransportError::Server(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("message failed to send: {0}")]
    Transport(#[from] TransportError),
    #[error("identity storage failed: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid api url {value}: {reason}")]
    InvalidApiUrl { value: String, reason: String },
    #[error("invalid primary color {0}: expected #rgb or #rrggbb")]
    InvalidColor(String),
    #[error("invalid integer in {key}: {value}")]
    ParseInt { key: String, value: String },
}
