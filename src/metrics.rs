use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref CHECKOUT_SESSIONS_CREATED: IntCounter = register_int_counter!(
        "checkout_sessions_created_total",
        "Total number of checkout sessions created"
    ).unwrap();

    pub static ref ORDERS_CREATED: IntCounter = register_int_counter!(
        "orders_created_total",
        "Total number of orders created"
    ).unwrap();

    pub static ref ORDER_PERSISTENCE_FAILURES: IntCounter = register_int_counter!(
        "order_persistence_failures_total",
        "Total number of orders that could not be recorded"
    ).unwrap();

    pub static ref RATE_FETCH_FAILURES: IntCounter = register_int_counter!(
        "rate_fetch_failures_total",
        "Total number of failed exchange rate lookups"
    ).unwrap();

    pub static ref SIMULATIONS_SUCCEEDED: IntCounter = register_int_counter!(
        "payment_simulations_succeeded_total",
        "Total number of payment simulations that succeeded"
    ).unwrap();

    pub static ref SIMULATIONS_FAILED: IntCounter = register_int_counter!(
        "payment_simulations_failed_total",
        "Total number of payment simulations that failed"
    ).unwrap();
}

pub fn record_simulation(succeeded: bool) {
    if succeeded {
        SIMULATIONS_SUCCEEDED.inc();
    } else {
        SIMULATIONS_FAILED.inc();
    }
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
