use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use ccg_engine::{traits::LedgerError, CartApiError, CheckoutError, PaymentFlowError};
use coinbase_tools::WebhookError;
use log::{error, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("{0}")]
    OrderAlreadyProcessed(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    GatewayUnavailable(String),
    #[error("{0}")]
    GatewayTransient(String),
    #[error("{0}")]
    GatewayRejected(String),
    #[error("Webhook rejected. {0}")]
    InvalidWebhookSignature(WebhookError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
}

impl ServerError {
    /// The machine-readable code sent alongside the message.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody(_) | Self::InvalidRequestPath(_) => "invalid_request",
            Self::EmptyCart => "empty_cart",
            Self::OrderAlreadyProcessed(_) => "order_already_processed",
            Self::NoRecordFound(_) => "not_found",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::GatewayTransient(_) => "gateway_transient",
            Self::GatewayRejected(_) => "gateway_rejected",
            Self::InvalidWebhookSignature(_) => "invalid_signature",
            Self::AuthenticationError(AuthError::MissingToken | AuthError::ValidationError(_)) => "unauthorized",
            Self::AuthenticationError(_) => "forbidden",
            Self::InitializeError(_)
            | Self::BackendError(_)
            | Self::IOError(_)
            | Self::ConfigurationError(_)
            | Self::Unspecified(_) => "internal_error",
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::OrderAlreadyProcessed(_) => StatusCode::BAD_REQUEST,
            Self::InvalidWebhookSignature(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTransient(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            Self::GatewayUnavailable(_) => {
                warn!("💻️ Payment gateway unavailable. {self}");
                "The payment provider is not available".to_string()
            },
            Self::GatewayTransient(_) => {
                error!("💻️ Payment gateway call failed. {self}");
                "The payment provider could not be reached. Please try again".to_string()
            },
            Self::GatewayRejected(_) => {
                error!("💻️ Payment gateway rejected the request. {self}");
                "The payment provider rejected the request".to_string()
            },
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("💻️ Request failed with an internal error. {self}");
                "Internal server error".to_string()
            },
            _ => self.to_string(),
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message, "reason": self.reason() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("The access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Requests from this address are not allowed.")]
    ForbiddenPeer,
}

impl From<CartApiError> for ServerError {
    fn from(e: CartApiError) -> Self {
        match e {
            CartApiError::Validation(s) => Self::InvalidRequestBody(s),
            CartApiError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CartApiError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart => Self::EmptyCart,
            CheckoutError::Validation(s) => Self::InvalidRequestBody(s),
            CheckoutError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::Validation(s) => Self::InvalidRequestBody(s),
            PaymentFlowError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            // A second concurrent payment attempt loses the claim and sees the order as taken
            PaymentFlowError::OrderAlreadyProcessed(..) | PaymentFlowError::PaymentInProgress(_) => {
                Self::OrderAlreadyProcessed(e.to_string())
            },
            PaymentFlowError::GatewayUnavailable(_) => Self::GatewayUnavailable(e.to_string()),
            PaymentFlowError::GatewayTransient(_) => Self::GatewayTransient(e.to_string()),
            PaymentFlowError::GatewayRejected(_) => Self::GatewayRejected(e.to_string()),
            PaymentFlowError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        Self::BackendError(e.to_string())
    }
}
