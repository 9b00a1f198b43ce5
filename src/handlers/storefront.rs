//! Endpoints used by the storefront page: one-shot order placement, the
//! crypto amount preview, and a stateless payment simulation.

use super::AppState;
use crate::{
    errors::ServiceError,
    models::{CartLine, Credential, CustomerDetails},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

const MISSING_TOTAL: &str = "Total amount is required";
const MISSING_SIMULATION_INPUT: &str = "Error: Missing total amount or private key.";
const SIMULATION_SERVER_ERROR: &str = "Server error while trying to run simulation.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    #[serde(default)]
    pub cakes: Vec<CartLine>,
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_mode: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderError {
    pub message: String,
    pub error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoAmountRequest {
    #[serde(alias = "totalAmount")]
    pub fiat_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoAmountResponse {
    /// Always rendered with 18 fractional digits
    pub crypto_amount: String,
    pub rate_used: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatePaymentRequest {
    #[serde(alias = "totalAmount")]
    pub fiat_amount: Option<Decimal>,
    #[serde(alias = "userPrivateKey")]
    pub credential: Option<Credential>,
}

#[derive(Debug, Serialize)]
pub struct SimulatePaymentResponse {
    pub success: bool,
    pub log: String,
}

/// A missing or zero total counts as absent
fn present_amount(amount: Option<Decimal>) -> Option<Decimal> {
    amount.filter(|amount| !amount.is_zero())
}

/// Records a complete order sent by the storefront
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Response {
    info!(
        lines = request.cakes.len(),
        payment_mode = %request.payment_mode,
        "Placing order"
    );

    match state
        .orchestrator
        .place_order(
            request.customer,
            request.cakes,
            request.total_amount,
            request.payment_mode,
        )
        .await
    {
        Ok((_, receipt)) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e @ ServiceError::ValidationError(_)) => {
            warn!(error = %e, "Rejected order");
            e.into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to place order");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PlaceOrderError {
                    message: "Error placing order".to_string(),
                    error: e.response_message(),
                }),
            )
                .into_response()
        }
    }
}

/// Converts a fiat total to the crypto amount at the live rate
pub async fn crypto_amount(
    State(state): State<AppState>,
    Json(request): Json<CryptoAmountRequest>,
) -> Result<Json<CryptoAmountResponse>, ServiceError> {
    let fiat_amount = present_amount(request.fiat_amount)
        .ok_or_else(|| ServiceError::ValidationError(MISSING_TOTAL.to_string()))?;

    let quote = state
        .orchestrator
        .quote_crypto(fiat_amount)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to quote crypto amount");
            e
        })?;

    Ok(Json(CryptoAmountResponse {
        crypto_amount: quote.crypto_amount_display(),
        rate_used: quote.rate,
    }))
}

/// Quotes and simulates a payment without touching any checkout session
pub async fn simulate_payment(
    State(state): State<AppState>,
    Json(request): Json<SimulatePaymentRequest>,
) -> Response {
    let (fiat_amount, credential) = match (
        present_amount(request.fiat_amount),
        request.credential.filter(|c| !c.is_blank()),
    ) {
        (Some(amount), Some(credential)) => (amount, credential),
        _ => {
            return simulation_response(StatusCode::BAD_REQUEST, false, MISSING_SIMULATION_INPUT)
        }
    };

    match state
        .orchestrator
        .simulate_payment(fiat_amount, &credential)
        .await
    {
        Ok(report) if report.success => {
            info!("Payment simulation succeeded");
            simulation_response(StatusCode::OK, true, &report.log)
        }
        Ok(report) => {
            warn!("Payment simulation failed");
            simulation_response(StatusCode::INTERNAL_SERVER_ERROR, false, &report.log)
        }
        Err(ServiceError::ValidationError(message)) => {
            simulation_response(StatusCode::BAD_REQUEST, false, &message)
        }
        Err(e) => {
            error!(error = %e, "Error in simulation endpoint");
            simulation_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                SIMULATION_SERVER_ERROR,
            )
        }
    }
}

fn simulation_response(status: StatusCode, success: bool, log: &str) -> Response {
    (
        status,
        Json(SimulatePaymentResponse {
            success,
            log: log.to_string(),
        }),
    )
        .into_response()
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/place-order", post(place_order))
        .route("/get-eth-amount", post(crypto_amount))
        .route("/simulate-payment", post(simulate_payment))
}
