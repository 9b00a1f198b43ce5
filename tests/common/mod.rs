//! Shared harness for router-level tests.
//!
//! Builds the production wiring against a wiremock price service, an
//! in-memory SQLite order store and a `sh -c` simulation script.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use cakeshop_api::{
    checkout::SessionStore,
    config::AppConfig,
    db, events,
    errors::ServiceError,
    models::{NewOrder, Order},
    services::{OrderStore, SeaOrmOrderStore},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// INR per ETH served by the fake price service
pub const TEST_RATE: u64 = 300_000;

/// Script that prints a short transcript and succeeds
pub const SUCCEEDING_SCRIPT: &str =
    "echo '--- Simulation Started ---'; echo \"Sending $1 ETH to contract...\"; echo '--- Simulation Complete ---'";

/// Script that reports insufficient funds and exits nonzero
pub const FAILING_SCRIPT: &str =
    "echo '--- Simulation Started ---'; echo '[ERROR] Insufficient funds.' >&2; exit 1";

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub price_server: MockServer,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// App with a SQLite backed store and the given simulation script
    pub async fn new(simulator_script: &str) -> Self {
        let db = Arc::new(
            db::connect("sqlite::memory:")
                .await
                .expect("in-memory database"),
        );
        let store = Arc::new(SeaOrmOrderStore::new(db.clone()));
        Self::build(simulator_script, store, Some(db)).await
    }

    /// App with a caller supplied order store
    pub async fn with_store(simulator_script: &str, store: Arc<dyn OrderStore>) -> Self {
        Self::build(simulator_script, store, None).await
    }

    async fn build(
        simulator_script: &str,
        store: Arc<dyn OrderStore>,
        db: Option<Arc<db::DbPool>>,
    ) -> Self {
        let price_server = MockServer::start().await;
        mount_rate(&price_server, json!({"ethereum": {"inr": TEST_RATE}})).await;

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.price_service_url = price_server.uri();
        cfg.rate_timeout_secs = 1;
        cfg.simulator_program = "sh".to_string();
        cfg.simulator_args = vec![
            "-c".to_string(),
            simulator_script.to_string(),
            "simulation".to_string(),
        ];
        cfg.simulation_timeout_secs = 10;

        let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let orchestrator =
            cakeshop_api::build_orchestrator(&cfg, store, event_sender).expect("orchestrator");
        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            sessions: Arc::new(SessionStore::new()),
            db,
        };

        Self {
            router: cakeshop_api::build_router(state.clone(), None),
            state,
            price_server,
            _event_task: event_task,
        }
    }

    /// Replaces the price service behaviour
    pub async fn price_service_returns(&self, template: ResponseTemplate) {
        self.price_server.reset().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(template)
            .mount(&self.price_server)
            .await;
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }

    /// Creates a session holding one chocolate cake and returns its id
    pub async fn session_with_cake(&self) -> String {
        let response = self
            .post(
                "/api/v1/checkout/sessions",
                json!({"cakes": [{"cakeName": "Chocolate Cake", "price": 500, "quantity": 1}]}),
            )
            .await;
        assert_eq!(response.status(), 201);
        response_json(response).await["id"]
            .as_str()
            .expect("session id")
            .to_string()
    }

    /// Session that has passed the address step
    pub async fn session_at_payment(&self) -> String {
        let id = self.session_with_cake().await;
        let response = self
            .post(&format!("/api/v1/checkout/sessions/{}/customer", id), customer_json())
            .await;
        assert_eq!(response.status(), 200);
        id
    }
}

pub async fn mount_rate(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn customer_json() -> Value {
    json!({
        "customerName": "Asha Rao",
        "deliveryAddress": "12 MG Road, Pune",
        "contactNumber": "9876543210",
        "message": ""
    })
}

/// Store whose writes always fail
pub struct FailingOrderStore;

#[async_trait]
impl OrderStore for FailingOrderStore {
    async fn insert(&self, _order: NewOrder) -> Result<Order, ServiceError> {
        Err(ServiceError::PersistenceError("database is locked".to_string()))
    }

    async fn find(&self, _id: Uuid) -> Result<Option<Order>, ServiceError> {
        Ok(None)
    }
}

/// Reads a decimal serialized as a JSON string or number
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    use std::str::FromStr;
    match value {
        Value::String(s) => rust_decimal::Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => rust_decimal::Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {}", other),
    }
}
