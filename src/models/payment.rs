use serde::{Deserialize, Serialize};
use std::fmt;

/// Log written for payment modes that do not move any funds
pub const PLACEHOLDER_PAYMENT_LOG: &str = "Order placed with dummy payment.";

/// How the customer pays for the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "COD", alias = "cash_on_delivery")]
    CashOnDelivery,
    #[serde(rename = "UPI", alias = "online")]
    OnlinePlaceholder,
    #[serde(rename = "ETH", alias = "crypto")]
    CryptoSimulated,
}

impl PaymentMode {
    /// Only the crypto mode goes through the rate quote and the simulation
    pub fn requires_simulation(&self) -> bool {
        matches!(self, PaymentMode::CryptoSimulated)
    }

    /// Label written to the order record
    pub fn record_label(&self, crypto_symbol: &str) -> String {
        match self {
            PaymentMode::CashOnDelivery => "COD".to_string(),
            PaymentMode::OnlinePlaceholder => "UPI".to_string(),
            PaymentMode::CryptoSimulated => format!("{} (Sepolia)", crypto_symbol),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// One try at paying. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    pub mode: PaymentMode,
    pub outcome: PaymentOutcome,
    pub log: String,
}

impl PaymentAttempt {
    pub fn pending(mode: PaymentMode) -> Self {
        Self {
            mode,
            outcome: PaymentOutcome::Pending,
            log: String::new(),
        }
    }

    pub fn placeholder(mode: PaymentMode) -> Self {
        Self {
            mode,
            outcome: PaymentOutcome::Succeeded,
            log: PLACEHOLDER_PAYMENT_LOG.to_string(),
        }
    }

    pub fn resolve(&mut self, succeeded: bool, log: String) {
        self.outcome = if succeeded {
            PaymentOutcome::Succeeded
        } else {
            PaymentOutcome::Failed
        };
        self.log = log;
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == PaymentOutcome::Succeeded
    }
}

/// Result of one run of the external simulation routine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub succeeded: bool,
    pub log: String,
}

/// Wallet secret handed to the simulation routine.
///
/// Only deserializable; `Debug` and `Display` are redacted.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Raw secret, for building the simulator command line only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
