use super::{CartLine, CustomerDetails, PriceQuote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message returned once an order has been recorded
pub const ORDER_PLACED_MESSAGE: &str = "Order placed successfully";

/// A finalized order waiting to be recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: CustomerDetails,
    #[serde(rename = "cakes")]
    pub lines: Vec<CartLine>,
    pub quote: PriceQuote,
    pub payment_mode: String,
}

/// A recorded order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer: CustomerDetails,
    #[serde(rename = "cakes")]
    pub lines: Vec<CartLine>,
    pub quote: PriceQuote,
    pub payment_mode: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn from_new(id: Uuid, order: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer: order.customer,
            lines: order.lines,
            quote: order.quote,
            payment_mode: order.payment_mode,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub message: String,
    pub order_id: Uuid,
}

impl OrderReceipt {
    pub fn placed(order_id: Uuid) -> Self {
        Self {
            message: ORDER_PLACED_MESSAGE.to_string(),
            order_id,
        }
    }
}
