//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. The response body is a
//! machine-readable JSON envelope:
//!
//! ```json
//! { "error": { "code": "stock", "message": "insufficient stock for: Mug",
//!              "articles": ["Mug"] } }
//! ```
//!
//! Payment failures additionally carry `"success": false` at the top level,
//! matching the checkout response shape. Server-side failures are captured
//! to Sentry and their details are hidden from clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::services::{CartError, CheckoutError};
use crate::store::RepositoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input, unknown payment/shipping method, cross-site request.
    #[error("{0}")]
    Validation(String),

    /// Unknown article, cart item, or order.
    #[error("{0}")]
    NotFound(String),

    /// The addressed resource belongs to someone else.
    #[error("{0}")]
    Authorization(String),

    /// The stock validator rejected the request; names the articles.
    #[error("insufficient stock for: {}", .0.join(", "))]
    Stock(Vec<String>),

    /// The payment dispatcher reported failure or timed out. The order is
    /// persisted in `failed` state.
    #[error("{0}")]
    Payment(String),

    /// Rate limited.
    #[error("too many requests")]
    RateLimited,

    /// Storage failure.
    #[error("database error: {0}")]
    Repository(RepositoryError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the error class.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Authorization(_) => "authorization",
            Self::Stock(_) => "stock",
            Self::Payment(_) => "payment_failed",
            Self::RateLimited => "rate_limited",
            Self::Repository(_) | Self::Internal(_) => "internal",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Stock(_) | Self::Payment(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("not found".to_owned()),
            RepositoryError::OutOfStock(names) => Self::Stock(names),
            other => Self::Repository(other),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ArticleNotFound => Self::NotFound("article not found".to_owned()),
            CartError::ItemNotFound => Self::NotFound("cart item not found".to_owned()),
            CartError::NotOwned => {
                Self::Authorization("cart item does not belong to your cart".to_owned())
            }
            CartError::InsufficientStock { article } => Self::Stock(vec![article]),
            CartError::Repository(e) => e.into(),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            e @ (CheckoutError::EmptyCart
            | CheckoutError::UnknownPaymentMethod
            | CheckoutError::UnknownShippingMethod) => Self::Validation(e.to_string()),
            CheckoutError::UnsupportedPaymentMethod(method) => {
                Self::Validation(format!("payment method {method} is not available"))
            }
            CheckoutError::OutOfStock(names) => Self::Stock(names),
            CheckoutError::PaymentDeclined { message, .. } => Self::Payment(message),
            CheckoutError::Repository(e) => e.into(),
            CheckoutError::State(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Repository(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        let status = self.status();
        let code = self.code();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Repository(_) | Self::Internal(_) => "internal server error".to_owned(),
            other => other.to_string(),
        };

        let mut error = json!({ "code": code, "message": message });
        if let Self::Stock(articles) = &self
            && let Some(map) = error.as_object_mut()
        {
            map.insert("articles".to_owned(), json!(articles));
        }

        // Checkout failures answer in the checkout response shape.
        let body = if matches!(self, Self::Payment(_)) {
            json!({ "success": false, "error": error })
        } else {
            json!({ "error": error })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
