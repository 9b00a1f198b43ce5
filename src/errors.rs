use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error body returned by every JSON endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request", "Internal Server Error")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail, only set when it is safe to show to the customer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Message shown when an order could not be recorded after a successful payment.
pub const PERSISTENCE_SUPPORT_NOTICE: &str =
    "Payment was successful, but saving the order failed. Please contact support.";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Simulator launch error: {0}")]
    SimulatorLaunchError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateUnavailable(_)
            | Self::SimulationFailed(_)
            | Self::SimulatorLaunchError(_)
            | Self::PersistenceError(_)
            | Self::InternalError(_)
            | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Launch and storage internals are replaced by generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::ValidationError(msg)
            | Self::InvalidOperation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::SimulationFailed(msg) => msg.clone(),
            Self::RateUnavailable(_) => "Could not fetch exchange rate".to_string(),
            Self::SimulatorLaunchError(_) => {
                "Server error while trying to run simulation.".to_string()
            }
            Self::PersistenceError(_) => PERSISTENCE_SUPPORT_NOTICE.to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            Self::DatabaseError(_) => "Database error".to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
