use crate::{
    errors::ServiceError,
    models::{
        Cart, CustomerDetails, ExchangeQuote, Order, OrderReceipt, PaymentAttempt, PaymentMode,
        PriceQuote,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session ended up in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The simulation reported failure or could not run. Retry is allowed.
    SimulationFailed,
    /// Payment went through but the order was not recorded. Terminal.
    PersistenceFailed,
}

/// Where a checkout session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum CheckoutStep {
    AddressEntry,
    PaymentSelection,
    QuoteFetch,
    SimulationRun,
    Persisting,
    Confirmed,
    Failed(FailureKind),
}

/// Inputs to the session reducer. Effects have already happened when these are applied.
#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    CartUpdated { cart: Cart, quote: PriceQuote },
    AddressSubmitted(CustomerDetails),
    BackToAddress,
    PaymentModeSelected(PaymentMode),
    PlaceholderPaid(PaymentAttempt),
    QuoteRequested,
    QuoteFailed(String),
    QuoteReceived(ExchangeQuote),
    SimulationFinished(PaymentAttempt),
    OrderRecorded { order: Order, receipt: OrderReceipt },
    OrderRecordingFailed(String),
    Reset,
}

impl CheckoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutEvent::CartUpdated { .. } => "editing the cart",
            CheckoutEvent::AddressSubmitted(_) => "submitting delivery details",
            CheckoutEvent::BackToAddress => "going back to the address step",
            CheckoutEvent::PaymentModeSelected(_) => "choosing a payment mode",
            CheckoutEvent::PlaceholderPaid(_) => "confirming payment",
            CheckoutEvent::QuoteRequested => "requesting an exchange quote",
            CheckoutEvent::QuoteFailed(_) => "reporting a failed quote",
            CheckoutEvent::QuoteReceived(_) => "accepting an exchange quote",
            CheckoutEvent::SimulationFinished(_) => "finishing the payment simulation",
            CheckoutEvent::OrderRecorded { .. } => "recording the order",
            CheckoutEvent::OrderRecordingFailed(_) => "reporting a failed order",
            CheckoutEvent::Reset => "starting a new order",
        }
    }
}

impl CheckoutStep {
    /// Pure transition function. Returns `InvalidOperation` when the event
    /// is not allowed in the current step.
    pub fn next(&self, event: &CheckoutEvent) -> Result<CheckoutStep, ServiceError> {
        use CheckoutEvent as E;
        use CheckoutStep::*;

        let next = match (*self, event) {
            (AddressEntry | PaymentSelection, E::CartUpdated { .. }) => *self,
            (AddressEntry, E::AddressSubmitted(_)) => PaymentSelection,
            (PaymentSelection, E::BackToAddress) => AddressEntry,
            (PaymentSelection | Failed(FailureKind::SimulationFailed), E::PaymentModeSelected(_)) => {
                PaymentSelection
            }
            (PaymentSelection, E::PlaceholderPaid(_)) => Persisting,
            (PaymentSelection | Failed(FailureKind::SimulationFailed), E::QuoteRequested) => {
                QuoteFetch
            }
            (QuoteFetch, E::QuoteFailed(_)) => PaymentSelection,
            (QuoteFetch, E::QuoteReceived(_)) => SimulationRun,
            (SimulationRun, E::SimulationFinished(attempt)) => {
                if attempt.succeeded() {
                    Persisting
                } else {
                    Failed(FailureKind::SimulationFailed)
                }
            }
            (Persisting, E::OrderRecorded { .. }) => Confirmed,
            (Persisting, E::OrderRecordingFailed(_)) => Failed(FailureKind::PersistenceFailed),
            (Confirmed, E::Reset) => AddressEntry,
            (step, event) => {
                return Err(ServiceError::InvalidOperation(format!(
                    "Not allowed: {} while the checkout is in {}",
                    event.name(),
                    step
                )))
            }
        };

        Ok(next)
    }

    /// Whether the cart may still change
    pub fn cart_is_editable(&self) -> bool {
        matches!(self, CheckoutStep::AddressEntry | CheckoutStep::PaymentSelection)
    }

    /// Whether a payment may be started from here
    pub fn accepts_payment(&self) -> bool {
        matches!(
            self,
            CheckoutStep::PaymentSelection | CheckoutStep::Failed(FailureKind::SimulationFailed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStep::Failed(FailureKind::PersistenceFailed))
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckoutStep::AddressEntry => "address entry",
            CheckoutStep::PaymentSelection => "payment selection",
            CheckoutStep::QuoteFetch => "quote fetch",
            CheckoutStep::SimulationRun => "simulation run",
            CheckoutStep::Persisting => "order recording",
            CheckoutStep::Confirmed => "confirmed",
            CheckoutStep::Failed(FailureKind::SimulationFailed) => "failed payment",
            CheckoutStep::Failed(FailureKind::PersistenceFailed) => "failed order recording",
        };
        f.write_str(label)
    }
}
