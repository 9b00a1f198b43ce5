mod common;

use std::sync::Arc;

use cakeshop_api::services::InMemoryOrderStore;
use common::{
    customer_json, decimal, response_json, response_text, FailingOrderStore, TestApp,
    FAILING_SCRIPT, SUCCEEDING_SCRIPT,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use wiremock::ResponseTemplate;

fn order_body(total: Value) -> Value {
    let mut body = customer_json();
    let fields = body.as_object_mut().unwrap();
    fields.insert(
        "cakes".into(),
        json!([{"cakeName": "Chocolate Cake", "price": 500, "quantity": 1}]),
    );
    fields.insert("totalAmount".into(), total);
    fields.insert("gst".into(), json!(90));
    fields.insert("vat".into(), json!(25));
    fields.insert("paymentMode".into(), json!("COD"));
    body
}

#[tokio::test]
async fn place_order_returns_receipt_and_persists() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;

    let response = app.post("/place-order", order_body(json!(615))).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Order placed successfully");

    let order_id = body["orderId"].as_str().unwrap();
    let order = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(order["customer"]["message"], "N/A");
    assert_eq!(decimal(&order["quote"]["gst"]), dec!(90));
    assert_eq!(decimal(&order["quote"]["grandTotal"]), dec!(615));
}

#[tokio::test]
async fn place_order_rejects_mismatched_total() {
    let store = Arc::new(InMemoryOrderStore::new());
    let app = TestApp::with_store(SUCCEEDING_SCRIPT, store.clone()).await;

    let response = app.post("/place-order", order_body(json!(10))).await;
    assert_eq!(response.status(), 400);
    assert!(store.is_empty());
}

#[tokio::test]
async fn place_order_rejects_missing_fields() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let mut body = order_body(json!(615));
    body["deliveryAddress"] = json!("");

    let response = app.post("/place-order", body).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn place_order_reports_storage_failure() {
    let app = TestApp::with_store(SUCCEEDING_SCRIPT, Arc::new(FailingOrderStore)).await;

    let response = app.post("/place-order", order_body(json!(615))).await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Error placing order");
    assert!(!body["error"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn eth_amount_uses_live_rate() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;

    let response = app.post("/get-eth-amount", json!({"totalAmount": 615})).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["cryptoAmount"], "0.002050000000000000");
    assert_eq!(decimal(&body["rateUsed"]), dec!(300000));
}

#[tokio::test]
async fn eth_amount_requires_total() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;

    for body in [json!({}), json!({"totalAmount": 0})] {
        let response = app.post("/get-eth-amount", body).await;
        assert_eq!(response.status(), 400);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Total amount is required");
    }
}

#[tokio::test]
async fn eth_amount_reports_rate_outage() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    app.price_service_returns(ResponseTemplate::new(503)).await;

    let response = app.post("/get-eth-amount", json!({"totalAmount": 615})).await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Could not fetch exchange rate");
}

#[tokio::test]
async fn eth_amount_rejects_malformed_rate() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    app.price_service_returns(
        ResponseTemplate::new(200).set_body_json(json!({"ethereum": {}})),
    )
    .await;

    let response = app.post("/get-eth-amount", json!({"totalAmount": 615})).await;
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn simulate_payment_success_includes_header_and_transcript() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;

    let response = app
        .post(
            "/simulate-payment",
            json!({"totalAmount": 615, "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);

    let log = body["log"].as_str().unwrap();
    assert!(log.starts_with("--- Order & Exchange Rate ---\n"));
    assert!(log.contains("Live ETH Price: ₹300000\n"));
    assert!(log.contains("Sending 0.002050000000000000 ETH to contract..."));
    assert!(!log.contains("0xfeedbeef"));
}

#[tokio::test]
async fn simulate_payment_failure_returns_report() {
    let app = TestApp::new(FAILING_SCRIPT).await;

    let response = app
        .post(
            "/simulate-payment",
            json!({"totalAmount": 615, "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    let log = body["log"].as_str().unwrap();
    assert!(log.contains("Error running simulation.\n\n"));
    assert!(log.contains("[ERROR] Insufficient funds."));
}

#[tokio::test]
async fn simulate_payment_requires_amount_and_key() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;

    for body in [
        json!({"totalAmount": 615}),
        json!({"userPrivateKey": "0xfeedbeef"}),
        json!({"totalAmount": 615, "userPrivateKey": ""}),
    ] {
        let response = app.post("/simulate-payment", body).await;
        assert_eq!(response.status(), 400);
        let body = response_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["log"], "Error: Missing total amount or private key.");
    }
}

#[tokio::test]
async fn simulate_payment_hides_rate_failure_details() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    app.price_service_returns(ResponseTemplate::new(500)).await;

    let response = app
        .post(
            "/simulate-payment",
            json!({"totalAmount": 615, "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert_eq!(body["log"], "Server error while trying to run simulation.");
}

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"], "up");

    let app = TestApp::with_store(SUCCEEDING_SCRIPT, Arc::new(InMemoryOrderStore::new())).await;
    let body = response_json(app.get("/health").await).await;
    assert_eq!(body["database"], "not_configured");
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    app.session_with_cake().await;

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), 200);
    let body = response_text(response).await;
    assert!(body.contains("checkout_sessions_created"));
}
