use crate::{errors::ServiceError, metrics, models::ExchangeQuote};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

/// Source of live fiat-per-asset prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Price of one unit of `asset` expressed in `fiat`
    async fn fetch_rate(&self, asset: &str, fiat: &str) -> Result<Decimal, ServiceError>;
}

/// CoinGecko `simple/price` client
#[derive(Clone)]
pub struct CoinGeckoRateSource {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoRateSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateSource for CoinGeckoRateSource {
    #[instrument(skip(self))]
    async fn fetch_rate(&self, asset: &str, fiat: &str) -> Result<Decimal, ServiceError> {
        let url = format!("{}/simple/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", asset), ("vs_currencies", fiat)])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Price service request failed");
                ServiceError::RateUnavailable(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Price service returned an error status");
            return Err(ServiceError::RateUnavailable(format!(
                "price service returned {}",
                status
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            warn!(error = %e, "Price service returned an unreadable body");
            ServiceError::RateUnavailable(format!("malformed response: {}", e))
        })?;

        let rate = parse_price(&body, asset, fiat)?;
        debug!(%rate, "Fetched exchange rate");
        Ok(rate)
    }
}

/// Extracts `body[asset][fiat]` as a positive decimal
fn parse_price(body: &serde_json::Value, asset: &str, fiat: &str) -> Result<Decimal, ServiceError> {
    let number = body
        .get(asset)
        .and_then(|prices| prices.get(fiat))
        .and_then(|price| match price {
            serde_json::Value::Number(number) => Some(number),
            _ => None,
        })
        .ok_or_else(|| {
            ServiceError::RateUnavailable(format!("no {} price for {} in response", fiat, asset))
        })?;

    let rate = Decimal::from_str(&number.to_string())
        .or_else(|_| Decimal::from_scientific(&number.to_string()))
        .map_err(|e| ServiceError::RateUnavailable(format!("unusable price {}: {}", number, e)))?;

    if rate <= Decimal::ZERO {
        return Err(ServiceError::RateUnavailable(format!(
            "non-positive price {}",
            rate
        )));
    }
    Ok(rate)
}

/// Converts a fiat amount into crypto units at `rate` fiat per unit
pub fn convert(fiat_amount: Decimal, rate: Decimal) -> Result<Decimal, ServiceError> {
    if rate <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Exchange rate must be positive".to_string(),
        ));
    }
    if fiat_amount.is_sign_negative() && !fiat_amount.is_zero() {
        return Err(ServiceError::ValidationError(
            "Amount cannot be negative".to_string(),
        ));
    }

    fiat_amount
        .checked_div(rate)
        .ok_or_else(|| ServiceError::ValidationError("Amount is out of range".to_string()))
}

/// Fetches a fresh rate for every quote; nothing is cached
#[derive(Clone)]
pub struct ExchangeRateGateway {
    source: Arc<dyn RateSource>,
    asset: String,
    fiat: String,
}

impl ExchangeRateGateway {
    pub fn new(source: Arc<dyn RateSource>, asset: impl Into<String>, fiat: impl Into<String>) -> Self {
        Self {
            source,
            asset: asset.into(),
            fiat: fiat.into(),
        }
    }

    pub async fn fetch_rate(&self) -> Result<Decimal, ServiceError> {
        self.source
            .fetch_rate(&self.asset, &self.fiat)
            .await
            .map_err(|e| {
                metrics::RATE_FETCH_FAILURES.inc();
                e
            })
    }

    #[instrument(skip(self), fields(asset = %self.asset, fiat = %self.fiat))]
    pub async fn quote(&self, fiat_amount: Decimal) -> Result<ExchangeQuote, ServiceError> {
        if fiat_amount.is_sign_negative() && !fiat_amount.is_zero() {
            return Err(ServiceError::ValidationError(
                "Amount cannot be negative".to_string(),
            ));
        }

        let rate = self.fetch_rate().await?;
        let crypto_amount = convert(fiat_amount, rate)?;

        Ok(ExchangeQuote {
            fiat_amount,
            rate,
            crypto_amount,
        })
    }
}
