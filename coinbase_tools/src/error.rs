use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoinbaseApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Coinbase Commerce is not configured. Set CCG_COINBASE_API_KEY to enable crypto payments.")]
    NotConfigured,
    #[error("The request to Coinbase Commerce timed out. {0}")]
    Timeout(String),
    #[error("Could not reach Coinbase Commerce: {0}")]
    Transport(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl CoinbaseApiError {
    /// True if retrying the same request later could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True if the failure comes from missing or rejected credentials rather than the request itself.
    pub fn is_configuration_problem(&self) -> bool {
        match self {
            Self::NotConfigured | Self::Initialization(_) => true,
            Self::QueryError { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("No webhook secret has been configured. All webhook deliveries are rejected.")]
    NotConfigured,
    #[error("The webhook signature header is missing.")]
    MissingSignature,
    #[error("The webhook signature is not a valid hex digest.")]
    MalformedSignature,
    #[error("The webhook signature does not match the payload.")]
    InvalidSignature,
    #[error("The webhook payload could not be parsed. {0}")]
    InvalidPayload(String),
}
