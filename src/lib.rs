//! Cake storefront backend
//!
//! Prices a cart, converts the total to a crypto amount at a live exchange
//! rate, drives an external payment simulation and records the order once
//! payment has succeeded.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod checkout;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

use axum::Router;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    checkout::{CheckoutOrchestrator, CurrencyLabels},
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    services::{
        CoinGeckoRateSource, ExchangeRateGateway, OrderStore, OrderSubmissionGateway,
        PricingCalculator, ProcessSimulator,
    },
};

pub use handlers::AppState;

/// Wires the production collaborators described by the configuration
pub fn build_orchestrator(
    cfg: &AppConfig,
    store: Arc<dyn OrderStore>,
    event_sender: EventSender,
) -> Result<CheckoutOrchestrator, ServiceError> {
    let rate_source = CoinGeckoRateSource::new(cfg.price_service_url.clone(), cfg.rate_timeout())?;
    let rates = ExchangeRateGateway::new(
        Arc::new(rate_source),
        cfg.crypto_asset.clone(),
        cfg.fiat_currency.clone(),
    );
    let simulator = ProcessSimulator::new(
        cfg.simulator_program.clone(),
        cfg.simulator_args.clone(),
        cfg.simulation_timeout(),
    );

    Ok(CheckoutOrchestrator::new(
        PricingCalculator::new(cfg.gst_rate, cfg.vat_rate),
        rates,
        Arc::new(simulator),
        OrderSubmissionGateway::new(store),
        event_sender,
        CurrencyLabels {
            fiat_currency: cfg.fiat_currency.clone(),
            crypto_symbol: cfg.crypto_symbol.clone(),
        },
    ))
}

/// Storefront endpoints at the root, the session API under `/api/v1`,
/// and the static pages as fallback when a directory is configured.
pub fn build_router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .merge(handlers::health::routes())
        .merge(handlers::storefront::routes())
        .nest("/api/v1", handlers::checkout::routes());

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
