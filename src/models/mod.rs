//! Domain types for the checkout workflow.

pub mod cart;
pub mod customer;
pub mod order;
pub mod payment;
pub mod quote;

pub use cart::{Cart, CartLine};
pub use customer::{CustomerDetails, DEFAULT_NOTE};
pub use order::{NewOrder, Order, OrderReceipt, ORDER_PLACED_MESSAGE};
pub use payment::{
    Credential, PaymentAttempt, PaymentMode, PaymentOutcome, SimulationOutcome,
    PLACEHOLDER_PAYMENT_LOG,
};
pub use quote::{format_crypto, format_fiat, round_fiat, ExchangeQuote, PriceQuote};
