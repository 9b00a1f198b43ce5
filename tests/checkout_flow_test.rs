mod common;

use std::{sync::Arc, time::Duration};

use axum::http::Method;
use cakeshop_api::{errors::PERSISTENCE_SUPPORT_NOTICE, services::InMemoryOrderStore};
use common::{
    customer_json, decimal, response_json, FailingOrderStore, TestApp, FAILING_SCRIPT,
    SUCCEEDING_SCRIPT,
};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::ResponseTemplate;

fn session_uri(id: &str, suffix: &str) -> String {
    format!("/api/v1/checkout/sessions/{}{}", id, suffix)
}

#[tokio::test]
async fn new_session_prices_the_cart() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let response = app
        .post(
            "/api/v1/checkout/sessions",
            json!({"cakes": [{"cakeName": "Chocolate Cake", "price": 500, "quantity": 1}]}),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    assert_eq!(body["state"], "address_entry");
    assert_eq!(decimal(&body["quote"]["subtotal"]), dec!(500));
    assert_eq!(decimal(&body["quote"]["gst"]), dec!(90));
    assert_eq!(decimal(&body["quote"]["vat"]), dec!(25));
    assert_eq!(decimal(&body["quote"]["grandTotal"]), dec!(615));
}

#[tokio::test]
async fn cart_edits_reprice_the_session() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_with_cake().await;

    let response = app
        .post(
            &session_uri(&id, "/items"),
            json!({"cakeName": "Red Velvet", "price": 350}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::PUT,
            &session_uri(&id, "/items/Red%20Velvet"),
            Some(json!({"quantity": 2})),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(decimal(&body["quote"]["subtotal"]), dec!(1200));
    assert_eq!(decimal(&body["quote"]["grandTotal"]), dec!(1476));

    let response = app
        .request(Method::DELETE, &session_uri(&id, "/items/Chocolate%20Cake"), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["cart"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&body["quote"]["subtotal"]), dec!(700));
}

#[tokio::test]
async fn removing_unknown_item_is_not_found() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_with_cake().await;

    let response = app
        .request(Method::DELETE, &session_uri(&id, "/items/Lemon%20Tart"), None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn empty_cart_cannot_reach_payment() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let response = app
        .post("/api/v1/checkout/sessions", json!({"cakes": []}))
        .await;
    let id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app.post(&session_uri(&id, "/customer"), customer_json()).await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Your cart is empty!");
}

#[tokio::test]
async fn missing_contact_keeps_address_step() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_with_cake().await;

    let response = app
        .post(
            &session_uri(&id, "/customer"),
            json!({"customerName": "Asha Rao", "deliveryAddress": "12 MG Road, Pune", "contactNumber": ""}),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "Please fill in all the required fields (Name, Address, Contact)."
    );

    let body = response_json(app.get(&session_uri(&id, "")).await).await;
    assert_eq!(body["state"], "address_entry");
    assert!(body["customer"].is_null());
}

#[tokio::test]
async fn blank_note_defaults_and_back_navigation_works() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_at_payment().await;

    let body = response_json(app.get(&session_uri(&id, "")).await).await;
    assert_eq!(body["state"], "payment_selection");
    assert_eq!(body["customer"]["message"], "N/A");

    let response = app.post(&session_uri(&id, "/back-to-address"), json!({})).await;
    let body = response_json(response).await;
    assert_eq!(body["state"], "address_entry");
}

#[tokio::test]
async fn cash_on_delivery_records_order() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(&session_uri(&id, "/pay"), json!({"paymentMode": "COD"}))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["state"], "confirmed");
    assert_eq!(body["payment"]["outcome"], "succeeded");
    assert_eq!(body["payment"]["log"], "Order placed with dummy payment.");
    assert_eq!(body["receipt"]["message"], "Order placed successfully");

    let order_id = body["receipt"]["orderId"].as_str().unwrap().to_string();
    let response = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(response.status(), 200);
    let order = response_json(response).await;
    assert_eq!(order["paymentMode"], "COD");
    assert_eq!(order["customer"]["customerName"], "Asha Rao");
    assert_eq!(decimal(&order["quote"]["grandTotal"]), dec!(615));
    assert_eq!(order["cakes"][0]["cakeName"], "Chocolate Cake");
}

#[tokio::test]
async fn crypto_payment_records_order_after_simulation() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(
            &session_uri(&id, "/pay"),
            json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;

    assert_eq!(body["state"], "confirmed");
    assert_eq!(decimal(&body["exchangeQuote"]["cryptoAmount"]), dec!(0.00205));
    let log = body["payment"]["log"].as_str().unwrap();
    assert!(log.contains("Order Total: ₹615.00"));
    assert!(log.contains("Calculated Payment: 0.002050000000000000 ETH"));
    assert!(log.contains("--- Simulation Complete ---"));
    assert!(!body.to_string().contains("0xfeedbeef"));

    let order_id = body["receipt"]["orderId"].as_str().unwrap();
    let order = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(order["paymentMode"], "ETH (Sepolia)");
}

#[tokio::test]
async fn crypto_payment_requires_credential() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(
            &session_uri(&id, "/pay"),
            json!({"paymentMode": "ETH", "userPrivateKey": "   "}),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(app.get(&session_uri(&id, "")).await).await;
    assert_eq!(body["state"], "payment_selection");
    assert!(body["payment"].is_null());
}

#[tokio::test]
async fn rate_outage_returns_to_payment_selection() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    app.price_service_returns(ResponseTemplate::new(503)).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(
            &session_uri(&id, "/pay"),
            json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Could not fetch exchange rate");

    let body = response_json(app.get(&session_uri(&id, "")).await).await;
    assert_eq!(body["state"], "payment_selection");
    assert_eq!(body["lastError"], "Could not fetch exchange rate");
    assert!(body["order"].is_null());
}

#[tokio::test]
async fn failed_simulation_can_be_retried() {
    let marker_dir = tempfile::tempdir().unwrap();
    let marker = marker_dir.path().join("attempted");
    let script = format!(
        "if [ -f '{m}' ]; then echo 'Transaction confirmed'; else touch '{m}'; echo '[ERROR] Insufficient funds.' >&2; exit 1; fi",
        m = marker.display()
    );
    let app = TestApp::new(&script).await;
    let id = app.session_at_payment().await;
    let pay = json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"});

    let response = app.post(&session_uri(&id, "/pay"), pay.clone()).await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Error running simulation."));
    assert!(message.contains("Insufficient funds"));

    let body = response_json(app.get(&session_uri(&id, "")).await).await;
    assert_eq!(body["state"], "failed");
    assert_eq!(body["reason"], "simulation_failed");
    assert_eq!(body["payment"]["outcome"], "failed");
    assert!(body["order"].is_null());

    let response = app.post(&session_uri(&id, "/pay"), pay).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["state"], "confirmed");
    assert!(body["payment"]["log"]
        .as_str()
        .unwrap()
        .contains("Transaction confirmed"));
}

#[tokio::test]
async fn failed_simulation_allows_switching_to_cash() {
    let app = TestApp::new(FAILING_SCRIPT).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(
            &session_uri(&id, "/pay"),
            json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 500);

    let response = app
        .post(&session_uri(&id, "/pay"), json!({"paymentMode": "COD"}))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["state"], "confirmed");
    assert_eq!(body["paymentMode"], "COD");
}

#[tokio::test]
async fn persistence_failure_is_terminal() {
    let app = TestApp::with_store(SUCCEEDING_SCRIPT, Arc::new(FailingOrderStore)).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(
            &session_uri(&id, "/pay"),
            json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"}),
        )
        .await;
    assert_eq!(response.status(), 500);
    let body = response_json(response).await;
    assert_eq!(body["message"], PERSISTENCE_SUPPORT_NOTICE);

    let body = response_json(app.get(&session_uri(&id, "")).await).await;
    assert_eq!(body["state"], "failed");
    assert_eq!(body["reason"], "persistence_failed");
    assert_eq!(body["payment"]["outcome"], "succeeded");

    let response = app
        .post(&session_uri(&id, "/pay"), json!({"paymentMode": "COD"}))
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["message"], PERSISTENCE_SUPPORT_NOTICE);

    let response = app.post(&session_uri(&id, "/reset"), json!({})).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn cart_is_frozen_after_confirmation_until_reset() {
    let store = Arc::new(InMemoryOrderStore::new());
    let app = TestApp::with_store(SUCCEEDING_SCRIPT, store.clone()).await;
    let id = app.session_at_payment().await;

    let response = app
        .post(&session_uri(&id, "/pay"), json!({"paymentMode": "UPI"}))
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(store.len(), 1);

    let response = app
        .post(
            &session_uri(&id, "/items"),
            json!({"cakeName": "Red Velvet", "price": 350}),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app.post(&session_uri(&id, "/reset"), json!({})).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["state"], "address_entry");
    assert!(body["cart"].as_array().unwrap().is_empty());
    assert!(body["receipt"].is_null());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn concurrent_payment_is_rejected() {
    let app = Arc::new(TestApp::new("sleep 1; echo 'Transaction confirmed'").await);
    let id = app.session_at_payment().await;
    let uri = session_uri(&id, "/pay");

    let first = {
        let app = app.clone();
        let uri = uri.clone();
        tokio::spawn(async move {
            app.post(&uri, json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"}))
                .await
                .status()
        })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    let second = app.post(&uri, json!({"paymentMode": "COD"})).await;
    assert_eq!(second.status(), 409);

    assert_eq!(first.await.unwrap(), 200);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let response = app
        .get("/api/v1/checkout/sessions/6f1d0c3e-1b4a-4c8e-9a47-5a2f4b0e9d11")
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn abandoned_payment_request_still_confirms() {
    let app = TestApp::new("sleep 1; echo 'Transaction confirmed'").await;
    let id = app.session_at_payment().await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(200),
        app.post(
            &session_uri(&id, "/pay"),
            json!({"paymentMode": "ETH", "userPrivateKey": "0xfeedbeef"}),
        ),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(app.get(&session_uri(&id, "")).await.status(), 409);

    let mut settled = None;
    for _ in 0..50 {
        let response = app.get(&session_uri(&id, "")).await;
        if response.status() == 200 {
            settled = Some(response_json(response).await);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let body = settled.expect("session settled after the payment finished");
    assert_eq!(body["state"], "confirmed");
    assert!(body["payment"]["log"]
        .as_str()
        .unwrap()
        .contains("Transaction confirmed"));
}

#[tokio::test]
async fn last_item_cannot_be_removed_at_payment_step() {
    let app = TestApp::new(SUCCEEDING_SCRIPT).await;
    let id = app.session_at_payment().await;

    let response = app
        .request(Method::DELETE, &session_uri(&id, "/items/Chocolate%20Cake"), None)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response_json(response).await["message"], "Your cart is empty!");

    let response = app
        .post(&session_uri(&id, "/pay"), json!({"paymentMode": "COD"}))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["cart"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&body["order"]["quote"]["grandTotal"]), dec!(615));
}
