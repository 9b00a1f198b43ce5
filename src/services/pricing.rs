use crate::{
    errors::ServiceError,
    models::{CartLine, PriceQuote},
};
use rust_decimal::Decimal;
use tracing::debug;

/// Computes subtotal, GST, VAT and grand total for a set of cart lines
#[derive(Debug, Clone, Copy)]
pub struct PricingCalculator {
    gst_rate: Decimal,
    vat_rate: Decimal,
}

impl PricingCalculator {
    pub fn new(gst_rate: Decimal, vat_rate: Decimal) -> Self {
        Self { gst_rate, vat_rate }
    }

    /// Full precision quote for the given lines. An empty set of lines prices to zero.
    pub fn compute_quote(&self, lines: &[CartLine]) -> Result<PriceQuote, ServiceError> {
        let mut subtotal = Decimal::ZERO;
        for line in lines {
            line.validate()?;
            subtotal = subtotal
                .checked_add(line.line_total()?)
                .ok_or_else(amount_too_large)?;
        }

        let gst = subtotal.checked_mul(self.gst_rate).ok_or_else(amount_too_large)?;
        let vat = subtotal.checked_mul(self.vat_rate).ok_or_else(amount_too_large)?;
        let grand_total = subtotal
            .checked_add(gst)
            .and_then(|total| total.checked_add(vat))
            .ok_or_else(amount_too_large)?;

        debug!(
            lines = lines.len(),
            %subtotal,
            %gst,
            %vat,
            %grand_total,
            "Computed price quote"
        );

        Ok(PriceQuote {
            subtotal,
            gst,
            vat,
            grand_total,
        })
    }
}

fn amount_too_large() -> ServiceError {
    ServiceError::ValidationError("Order total is too large".to_string())
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(Decimal::new(18, 2), Decimal::new(5, 2))
    }
}
