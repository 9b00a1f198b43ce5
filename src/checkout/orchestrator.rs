use super::{
    session::{CheckoutSession, SessionView, EMPTY_CART_MESSAGE},
    state::{CheckoutEvent, CheckoutStep},
};
use crate::{
    errors::{ServiceError, PERSISTENCE_SUPPORT_NOTICE},
    events::{Event, EventSender},
    metrics,
    models::{
        round_fiat, Cart, CartLine, Credential, CustomerDetails, ExchangeQuote, NewOrder, Order,
        OrderReceipt, PaymentAttempt, PaymentMode,
    },
    services::{
        final_report, report_header, ExchangeRateGateway, OrderSubmissionGateway,
        PaymentSimulator, PricingCalculator,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const MISSING_CREDENTIAL: &str = "Private key is required.";
const LAUNCH_FAILURE_LOG: &str = "Server error while trying to run simulation.";

/// Allowed gap between a client supplied total and the recomputed one
const TOTAL_TOLERANCE: Decimal = dec!(0.01);

/// Labels used in customer-facing payment logs
#[derive(Debug, Clone)]
pub struct CurrencyLabels {
    pub fiat_currency: String,
    pub crypto_symbol: String,
}

impl Default for CurrencyLabels {
    fn default() -> Self {
        Self {
            fiat_currency: "inr".to_string(),
            crypto_symbol: "ETH".to_string(),
        }
    }
}

/// Result of a stateless simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub success: bool,
    pub log: String,
}

/// Drives a checkout session through pricing, quoting, simulation and recording
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    pricing: PricingCalculator,
    rates: ExchangeRateGateway,
    simulator: Arc<dyn PaymentSimulator>,
    submissions: OrderSubmissionGateway,
    event_sender: EventSender,
    labels: CurrencyLabels,
}

impl CheckoutOrchestrator {
    pub fn new(
        pricing: PricingCalculator,
        rates: ExchangeRateGateway,
        simulator: Arc<dyn PaymentSimulator>,
        submissions: OrderSubmissionGateway,
        event_sender: EventSender,
        labels: CurrencyLabels,
    ) -> Self {
        Self {
            pricing,
            rates,
            simulator,
            submissions,
            event_sender,
            labels,
        }
    }

    /// Opens a session, optionally pre-filled with cart lines
    #[instrument(skip(self, lines))]
    pub async fn start_session(&self, lines: Vec<CartLine>) -> Result<CheckoutSession, ServiceError> {
        let cart = Cart::from_lines(lines)?;
        let quote = self.pricing.compute_quote(cart.lines())?;
        let session = CheckoutSession::new(cart, quote);

        metrics::CHECKOUT_SESSIONS_CREATED.inc();
        self.event_sender
            .send_or_log(Event::CheckoutStarted(session.id()))
            .await;

        info!(session_id = %session.id(), "Created checkout session");
        Ok(session)
    }

    pub fn add_item(
        &self,
        session: &mut CheckoutSession,
        item_name: &str,
        unit_price: Decimal,
    ) -> Result<(), ServiceError> {
        let mut cart = session.cart().clone();
        cart.add_item(item_name, unit_price)?;
        self.replace_cart(session, cart)
    }

    pub fn set_quantity(
        &self,
        session: &mut CheckoutSession,
        item_name: &str,
        quantity: u32,
    ) -> Result<(), ServiceError> {
        let mut cart = session.cart().clone();
        cart.set_quantity(item_name, quantity)?;
        self.replace_cart(session, cart)
    }

    pub fn remove_item(
        &self,
        session: &mut CheckoutSession,
        item_name: &str,
    ) -> Result<(), ServiceError> {
        let mut cart = session.cart().clone();
        cart.remove_item(item_name)?;
        self.replace_cart(session, cart)
    }

    fn replace_cart(&self, session: &mut CheckoutSession, cart: Cart) -> Result<(), ServiceError> {
        if !session.step().cart_is_editable() {
            return Err(ServiceError::InvalidOperation(format!(
                "The cart cannot be changed while the checkout is in {}",
                session.step()
            )));
        }
        let quote = self.pricing.compute_quote(cart.lines())?;
        session.apply(CheckoutEvent::CartUpdated { cart, quote })
    }

    /// Address step: complete details move the session to payment selection
    pub fn submit_customer(
        &self,
        session: &mut CheckoutSession,
        details: CustomerDetails,
    ) -> Result<(), ServiceError> {
        session.apply(CheckoutEvent::AddressSubmitted(details))
    }

    pub fn back_to_address(&self, session: &mut CheckoutSession) -> Result<(), ServiceError> {
        session.apply(CheckoutEvent::BackToAddress)
    }

    pub fn select_payment_mode(
        &self,
        session: &mut CheckoutSession,
        mode: PaymentMode,
    ) -> Result<(), ServiceError> {
        session.apply(CheckoutEvent::PaymentModeSelected(mode))
    }

    /// Only a confirmed session can be reset; this is what empties the cart
    pub fn reset(&self, session: &mut CheckoutSession) -> Result<(), ServiceError> {
        session.apply(CheckoutEvent::Reset)
    }

    /// Confirms payment with the chosen mode and records the order on success.
    ///
    /// Every error leaves the session in a stable step: payment selection after
    /// a failed quote, failed-and-retryable after a failed simulation, and
    /// terminally failed when the order could not be recorded.
    #[instrument(skip(self, session, credential), fields(session_id = %session.id()))]
    pub async fn pay(
        &self,
        session: &mut CheckoutSession,
        mode: Option<PaymentMode>,
        credential: Option<Credential>,
    ) -> Result<(), ServiceError> {
        if !session.step().accepts_payment() {
            return Err(self.payment_rejected(session.step()));
        }
        if session.cart().is_empty() {
            return Err(ServiceError::ValidationError(EMPTY_CART_MESSAGE.to_string()));
        }

        let mode = mode.or(session.payment_mode()).ok_or_else(|| {
            ServiceError::ValidationError("Please choose a payment mode.".to_string())
        })?;

        let credential = if mode.requires_simulation() {
            match credential {
                Some(credential) if !credential.is_blank() => Some(credential),
                _ => {
                    return Err(ServiceError::ValidationError(
                        MISSING_CREDENTIAL.to_string(),
                    ))
                }
            }
        } else {
            None
        };

        if session.payment_mode() != Some(mode)
            || (session.step() != CheckoutStep::PaymentSelection && !mode.requires_simulation())
        {
            session.apply(CheckoutEvent::PaymentModeSelected(mode))?;
        }

        match credential {
            Some(credential) => self.pay_with_simulation(session, &credential).await?,
            None => {
                session.apply(CheckoutEvent::PlaceholderPaid(PaymentAttempt::placeholder(mode)))?;
            }
        }

        self.record_order(session, mode).await
    }

    /// Runs `pay` on its own task, which owns the session lock.
    ///
    /// Dropping the returned future does not cancel the payment: the task
    /// still drives the session to a stable step and then releases the lock.
    pub async fn pay_to_completion(
        self: Arc<Self>,
        mut session: OwnedMutexGuard<CheckoutSession>,
        mode: Option<PaymentMode>,
        credential: Option<Credential>,
    ) -> Result<SessionView, ServiceError> {
        let session_id = session.id();
        let task = tokio::spawn(async move {
            let result = self.pay(&mut session, mode, credential).await;
            result.map(|()| session.view())
        });

        task.await.map_err(|e| {
            error!(%session_id, error = %e, "Payment task did not finish");
            ServiceError::InternalError(format!("payment task failed: {}", e))
        })?
    }

    async fn pay_with_simulation(
        &self,
        session: &mut CheckoutSession,
        credential: &Credential,
    ) -> Result<(), ServiceError> {
        session.apply(CheckoutEvent::QuoteRequested)?;

        let quote = match self.rates.quote(session.quote().grand_total).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(error = %e, "Exchange rate lookup failed");
                session.apply(CheckoutEvent::QuoteFailed(e.response_message()))?;
                return Err(e);
            }
        };
        session.apply(CheckoutEvent::QuoteReceived(quote))?;

        let mut attempt = PaymentAttempt::pending(PaymentMode::CryptoSimulated);
        let header = self.report_header(&quote);

        match self.simulator.run_simulation(quote.crypto_amount, credential).await {
            Ok(outcome) => {
                metrics::record_simulation(outcome.succeeded);
                self.event_sender
                    .send_or_log(Event::PaymentSimulated {
                        session_id: session.id(),
                        succeeded: outcome.succeeded,
                    })
                    .await;

                let report = final_report(&header, &outcome);
                attempt.resolve(outcome.succeeded, report.clone());
                session.apply(CheckoutEvent::SimulationFinished(attempt))?;

                if !outcome.succeeded {
                    return Err(ServiceError::SimulationFailed(report));
                }
                Ok(())
            }
            Err(e) => {
                metrics::record_simulation(false);
                attempt.resolve(false, LAUNCH_FAILURE_LOG.to_string());
                session.apply(CheckoutEvent::SimulationFinished(attempt))?;
                Err(e)
            }
        }
    }

    async fn record_order(
        &self,
        session: &mut CheckoutSession,
        mode: PaymentMode,
    ) -> Result<(), ServiceError> {
        let customer = session.customer().cloned().ok_or_else(|| {
            ServiceError::InternalError("session reached payment without delivery details".into())
        })?;

        let new_order = NewOrder {
            customer,
            lines: session.cart().lines().to_vec(),
            quote: session.quote().rounded(),
            payment_mode: mode.record_label(&self.labels.crypto_symbol),
        };

        match self.submissions.submit(new_order).await {
            Ok((order, receipt)) => {
                let order_id = order.id;
                session.apply(CheckoutEvent::OrderRecorded { order, receipt })?;
                self.event_sender
                    .send_or_log(Event::OrderCreated {
                        session_id: Some(session.id()),
                        order_id,
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                session.apply(CheckoutEvent::OrderRecordingFailed(
                    PERSISTENCE_SUPPORT_NOTICE.to_string(),
                ))?;
                self.event_sender
                    .send_or_log(Event::OrderRecordingFailed {
                        session_id: Some(session.id()),
                    })
                    .await;
                Err(e)
            }
        }
    }

    fn payment_rejected(&self, step: CheckoutStep) -> ServiceError {
        if step.is_terminal() {
            ServiceError::InvalidOperation(PERSISTENCE_SUPPORT_NOTICE.to_string())
        } else {
            ServiceError::InvalidOperation(format!(
                "Payment cannot be made while the checkout is in {}",
                step
            ))
        }
    }

    fn report_header(&self, quote: &ExchangeQuote) -> String {
        report_header(quote, &self.labels.fiat_currency, &self.labels.crypto_symbol)
    }

    /// Converts a fiat total at the live rate, without touching any session
    pub async fn quote_crypto(&self, fiat_amount: Decimal) -> Result<ExchangeQuote, ServiceError> {
        self.rates.quote(fiat_amount).await
    }

    /// Fetches a rate and runs one simulation for a fiat total.
    ///
    /// Rate and launch failures surface as errors; a failed run is a report
    /// with `success = false`.
    #[instrument(skip(self, credential))]
    pub async fn simulate_payment(
        &self,
        fiat_amount: Decimal,
        credential: &Credential,
    ) -> Result<SimulationReport, ServiceError> {
        if credential.is_blank() {
            return Err(ServiceError::ValidationError(MISSING_CREDENTIAL.to_string()));
        }

        let quote = self.rates.quote(fiat_amount).await?;
        let header = self.report_header(&quote);
        let outcome = self
            .simulator
            .run_simulation(quote.crypto_amount, credential)
            .await?;
        metrics::record_simulation(outcome.succeeded);

        Ok(SimulationReport {
            success: outcome.succeeded,
            log: final_report(&header, &outcome),
        })
    }

    /// Records an order submitted in one piece by the storefront.
    ///
    /// Totals are recomputed from the lines; a client total that disagrees by
    /// more than one paisa is rejected.
    #[instrument(skip(self, customer, lines))]
    pub async fn place_order(
        &self,
        customer: CustomerDetails,
        lines: Vec<CartLine>,
        claimed_total: Option<Decimal>,
        payment_mode: String,
    ) -> Result<(Order, OrderReceipt), ServiceError> {
        let customer = customer.into_complete()?;
        let cart = Cart::from_lines(lines)?;
        if cart.is_empty() {
            return Err(ServiceError::ValidationError(
                EMPTY_CART_MESSAGE.to_string(),
            ));
        }
        if payment_mode.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Payment mode is required".to_string(),
            ));
        }

        let quote = self.pricing.compute_quote(cart.lines())?.rounded();
        if let Some(claimed) = claimed_total {
            let within_tolerance = round_fiat(claimed)
                .checked_sub(quote.grand_total)
                .map_or(false, |gap| gap.abs() <= TOTAL_TOLERANCE);
            if !within_tolerance {
                return Err(ServiceError::ValidationError(format!(
                    "Order total {} does not match the cart total {}",
                    round_fiat(claimed),
                    quote.grand_total
                )));
            }
        }

        let new_order = NewOrder {
            customer,
            lines: cart.lines().to_vec(),
            quote,
            payment_mode: payment_mode.trim().to_string(),
        };

        match self.submissions.submit(new_order).await {
            Ok((order, receipt)) => {
                self.event_sender
                    .send_or_log(Event::OrderCreated {
                        session_id: None,
                        order_id: order.id,
                    })
                    .await;
                Ok((order, receipt))
            }
            Err(e) => {
                self.event_sender
                    .send_or_log(Event::OrderRecordingFailed { session_id: None })
                    .await;
                Err(e)
            }
        }
    }

    pub async fn find_order(&self, id: Uuid) -> Result<Order, ServiceError> {
        self.submissions.find(id).await
    }
}
