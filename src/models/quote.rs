use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Fractional digits used when rendering crypto amounts
pub const CRYPTO_DISPLAY_DP: u32 = 18;

/// Fractional digits used when rendering fiat amounts
pub const FIAT_DISPLAY_DP: u32 = 2;

/// Cart totals. `grand_total` keeps full precision for the exchange step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub subtotal: Decimal,
    pub gst: Decimal,
    pub vat: Decimal,
    pub grand_total: Decimal,
}

impl PriceQuote {
    /// Display form: every amount rounded half away from zero to 2 dp.
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_fiat(self.subtotal),
            gst: round_fiat(self.gst),
            vat: round_fiat(self.vat),
            grand_total: round_fiat(self.grand_total),
        }
    }
}

/// A fiat amount converted at a freshly fetched rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeQuote {
    pub fiat_amount: Decimal,
    /// Fiat units per one unit of the crypto asset
    pub rate: Decimal,
    pub crypto_amount: Decimal,
}

impl ExchangeQuote {
    pub fn crypto_amount_display(&self) -> String {
        format_crypto(self.crypto_amount)
    }
}

pub fn round_fiat(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(FIAT_DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_fiat(amount: Decimal) -> String {
    format!("{:.2}", round_fiat(amount))
}

/// Renders a crypto amount with exactly 18 fractional digits
pub fn format_crypto(amount: Decimal) -> String {
    let rounded =
        amount.round_dp_with_strategy(CRYPTO_DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.18}", rounded)
}
