use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Typed failures of the cart/checkout core. Every operation returns one of
/// these as a value; nothing on the request path panics.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("user is not logged-in")]
    Unauthenticated,

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("book {0} does not exist in the catalog")]
    BookNotFound(i32),

    #[error("no cart exists for this user")]
    CartNotFound,

    #[error("book {0} is not in the cart")]
    LineNotFound(i32),

    #[error("cart is empty")]
    EmptyCart,

    #[error("something happened during checkout")]
    CheckoutFailed,

    #[error("conflicting update on the cart, retries exhausted")]
    ConcurrencyConflict,

    #[error("{0} is unreachable")]
    CatalogUnreachable(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<DieselError> for CartError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                CartError::ConcurrencyConflict
            }
            other => CartError::Storage(other.into()),
        }
    }
}

/// HTTP-facing error for the route layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("user is not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is unreachable")]
    ServiceUnreachable(String),

    #[error("something happened during checkout")]
    CheckoutFailed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Unauthenticated => AppError::Unauthenticated,
            CartError::InvalidQuantity(_) | CartError::EmptyCart => {
                AppError::BadRequest(err.to_string())
            }
            CartError::BookNotFound(_) | CartError::CartNotFound | CartError::LineNotFound(_) => {
                AppError::NotFound
            }
            CartError::CheckoutFailed => AppError::CheckoutFailed,
            CartError::ConcurrencyConflict => AppError::Conflict(err.to_string()),
            CartError::CatalogUnreachable(service) => AppError::ServiceUnreachable(service),
            CartError::Storage(err) => AppError::Other(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnreachable(_) => StatusCode::BAD_GATEWAY,
            AppError::CheckoutFailed | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Responding with error");
        }

        let body = Json(json!({
            "data": null,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Standard response envelope shared by every handler.
#[derive(Serialize, ToSchema)]
pub struct StdResponse<T: Serialize, M: Serialize> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(json!({
            "data": self.data,
            "message": self.message,
        }))
        .into_response()
    }
}
