use super::AppState;
use crate::{
    checkout::SessionView,
    errors::ServiceError,
    models::{CartLine, Credential, CustomerDetails, Order, PaymentMode},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default, alias = "items")]
    pub cakes: Vec<CartLine>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(rename = "cakeName", alias = "itemName")]
    pub item_name: String,
    #[serde(rename = "price", alias = "unitPrice")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentModeRequest {
    pub payment_mode: PaymentMode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub payment_mode: Option<PaymentMode>,
    #[serde(alias = "userPrivateKey")]
    pub credential: Option<Credential>,
}

fn log_failure(action: &str, session_id: Uuid, e: &ServiceError) {
    if e.status_code().is_server_error() {
        error!(%session_id, error = %e, "Failed to {}", action);
    } else {
        warn!(%session_id, error = %e, "Rejected {}", action);
    }
}

/// Create a checkout session
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ServiceError> {
    let session = state.orchestrator.start_session(request.cakes).await?;
    let view = session.view();
    state.sessions.insert(session);
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ServiceError> {
    let session = state.sessions.lock(session_id)?;
    Ok(Json(session.view()))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state
        .orchestrator
        .add_item(&mut session, &request.item_name, request.unit_price)
        .map_err(|e| {
            log_failure("add item", session_id, &e);
            e
        })?;
    Ok(Json(session.view()))
}

pub async fn set_quantity(
    State(state): State<AppState>,
    Path((session_id, item_name)): Path<(Uuid, String)>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state
        .orchestrator
        .set_quantity(&mut session, &item_name, request.quantity)
        .map_err(|e| {
            log_failure("update quantity", session_id, &e);
            e
        })?;
    Ok(Json(session.view()))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((session_id, item_name)): Path<(Uuid, String)>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state
        .orchestrator
        .remove_item(&mut session, &item_name)
        .map_err(|e| {
            log_failure("remove item", session_id, &e);
            e
        })?;
    Ok(Json(session.view()))
}

/// Address step
pub async fn submit_customer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(details): Json<CustomerDetails>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state
        .orchestrator
        .submit_customer(&mut session, details)
        .map_err(|e| {
            log_failure("submit delivery details", session_id, &e);
            e
        })?;
    info!(%session_id, "Delivery details accepted");
    Ok(Json(session.view()))
}

pub async fn back_to_address(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state.orchestrator.back_to_address(&mut session)?;
    Ok(Json(session.view()))
}

pub async fn select_payment_mode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<PaymentModeRequest>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state
        .orchestrator
        .select_payment_mode(&mut session, request.payment_mode)?;
    Ok(Json(session.view()))
}

/// Confirm payment. The payment runs on its own task holding the session
/// lock, so a dropped request neither cancels it nor strands the session;
/// a concurrent request gets 409 until it settles.
pub async fn pay(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<PayRequest>,
) -> Result<Json<SessionView>, ServiceError> {
    let session = state.sessions.lock(session_id)?;
    info!(%session_id, mode = ?request.payment_mode, "Payment requested");

    let view = state
        .orchestrator
        .clone()
        .pay_to_completion(session, request.payment_mode, request.credential)
        .await
        .map_err(|e| {
            log_failure("pay", session_id, &e);
            e
        })?;

    info!(%session_id, "Checkout confirmed");
    Ok(Json(view))
}

/// Start a new order after confirmation
pub async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.sessions.lock(session_id)?;
    state.orchestrator.reset(&mut session)?;
    Ok(Json(session.view()))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ServiceError> {
    Ok(Json(state.orchestrator.find_order(order_id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/sessions", post(create_session))
        .route("/checkout/sessions/:id", get(get_session))
        .route("/checkout/sessions/:id/items", post(add_item))
        .route(
            "/checkout/sessions/:id/items/:item_name",
            put(set_quantity).delete(remove_item),
        )
        .route("/checkout/sessions/:id/customer", post(submit_customer))
        .route("/checkout/sessions/:id/back-to-address", post(back_to_address))
        .route("/checkout/sessions/:id/payment-mode", post(select_payment_mode))
        .route("/checkout/sessions/:id/pay", post(pay))
        .route("/checkout/sessions/:id/reset", post(reset))
        .route("/orders/:id", get(get_order))
}
