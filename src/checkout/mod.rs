//! Checkout workflow: a pure step reducer, the session it drives, the
//! orchestrator that performs the side effects, and the live session store.

pub mod orchestrator;
pub mod session;
pub mod state;
pub mod store;

pub use orchestrator::{CheckoutOrchestrator, CurrencyLabels, SimulationReport};
pub use session::{CheckoutSession, SessionView, EMPTY_CART_MESSAGE};
pub use state::{CheckoutEvent, CheckoutStep, FailureKind};
pub use store::SessionStore;
