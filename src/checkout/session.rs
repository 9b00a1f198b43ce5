use super::state::{CheckoutEvent, CheckoutStep};
use crate::{
    errors::ServiceError,
    models::{
        Cart, CartLine, CustomerDetails, ExchangeQuote, Order, OrderReceipt, PaymentAttempt,
        PaymentMode, PriceQuote,
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty!";

/// State of one customer's checkout
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    id: Uuid,
    step: CheckoutStep,
    cart: Cart,
    quote: PriceQuote,
    customer: Option<CustomerDetails>,
    payment_mode: Option<PaymentMode>,
    exchange_quote: Option<ExchangeQuote>,
    attempt: Option<PaymentAttempt>,
    order: Option<Order>,
    receipt: Option<OrderReceipt>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(cart: Cart, quote: PriceQuote) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            step: CheckoutStep::AddressEntry,
            cart,
            quote,
            customer: None,
            payment_mode: None,
            exchange_quote: None,
            attempt: None,
            order: None,
            receipt: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Runs the reducer and updates session data. On error nothing changes.
    pub fn apply(&mut self, event: CheckoutEvent) -> Result<(), ServiceError> {
        let next = self.step.next(&event)?;

        match event {
            CheckoutEvent::CartUpdated { cart, quote } => {
                if cart.is_empty() && self.step == CheckoutStep::PaymentSelection {
                    return Err(ServiceError::ValidationError(EMPTY_CART_MESSAGE.to_string()));
                }
                self.cart = cart;
                self.quote = quote;
            }
            CheckoutEvent::AddressSubmitted(details) => {
                if self.cart.is_empty() {
                    return Err(ServiceError::ValidationError(EMPTY_CART_MESSAGE.to_string()));
                }
                self.customer = Some(details.into_complete()?);
                self.last_error = None;
            }
            CheckoutEvent::BackToAddress => {}
            CheckoutEvent::PaymentModeSelected(mode) => {
                self.payment_mode = Some(mode);
                self.last_error = None;
            }
            CheckoutEvent::PlaceholderPaid(attempt) => {
                self.attempt = Some(attempt);
                self.last_error = None;
            }
            CheckoutEvent::QuoteRequested => {
                self.exchange_quote = None;
                self.attempt = Some(PaymentAttempt::pending(PaymentMode::CryptoSimulated));
                self.last_error = None;
            }
            CheckoutEvent::QuoteFailed(message) => {
                self.attempt = None;
                self.last_error = Some(message);
            }
            CheckoutEvent::QuoteReceived(quote) => {
                self.exchange_quote = Some(quote);
            }
            CheckoutEvent::SimulationFinished(attempt) => {
                if !attempt.succeeded() {
                    self.last_error = Some(attempt.log.clone());
                }
                self.attempt = Some(attempt);
            }
            CheckoutEvent::OrderRecorded { order, receipt } => {
                self.order = Some(order);
                self.receipt = Some(receipt);
                self.last_error = None;
            }
            CheckoutEvent::OrderRecordingFailed(message) => {
                self.last_error = Some(message);
            }
            CheckoutEvent::Reset => {
                self.cart.clear();
                self.quote = PriceQuote::default();
                self.customer = None;
                self.payment_mode = None;
                self.exchange_quote = None;
                self.attempt = None;
                self.order = None;
                self.receipt = None;
                self.last_error = None;
            }
        }

        self.step = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn quote(&self) -> &PriceQuote {
        &self.quote
    }

    pub fn customer(&self) -> Option<&CustomerDetails> {
        self.customer.as_ref()
    }

    pub fn payment_mode(&self) -> Option<PaymentMode> {
        self.payment_mode
    }

    pub fn exchange_quote(&self) -> Option<&ExchangeQuote> {
        self.exchange_quote.as_ref()
    }

    pub fn attempt(&self) -> Option<&PaymentAttempt> {
        self.attempt.as_ref()
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn receipt(&self) -> Option<&OrderReceipt> {
        self.receipt.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Customer-facing snapshot with display-rounded totals
    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            step: self.step,
            cart: self.cart.lines().to_vec(),
            quote: self.quote.rounded(),
            customer: self.customer.clone(),
            payment_mode: self.payment_mode,
            exchange_quote: self.exchange_quote,
            payment: self.attempt.clone(),
            order: self.order.clone(),
            receipt: self.receipt.clone(),
            last_error: self.last_error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    #[serde(flatten)]
    pub step: CheckoutStep,
    pub cart: Vec<CartLine>,
    pub quote: PriceQuote,
    pub customer: Option<CustomerDetails>,
    pub payment_mode: Option<PaymentMode>,
    pub exchange_quote: Option<ExchangeQuote>,
    pub payment: Option<PaymentAttempt>,
    pub order: Option<Order>,
    pub receipt: Option<OrderReceipt>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
