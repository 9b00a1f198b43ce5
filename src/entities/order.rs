use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded cake order. Money columns hold decimal strings.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_name: String,
    pub delivery_address: String,
    pub contact_number: String,
    pub message: String,
    /// Snapshot of the cart lines
    pub cakes: Json,
    pub subtotal: String,
    pub total_amount: String,
    pub gst: String,
    pub vat: String,
    pub payment_mode: String,
    pub order_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
