use crate::{
    db::DbPool,
    entities::order as order_entity,
    errors::ServiceError,
    metrics,
    models::{CartLine, CustomerDetails, NewOrder, Order, OrderReceipt, PriceQuote},
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::{str::FromStr, sync::Arc};
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Persistence collaborator for finalized orders
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Records the order and assigns its id
    async fn insert(&self, order: NewOrder) -> Result<Order, ServiceError>;

    async fn find(&self, id: Uuid) -> Result<Option<Order>, ServiceError>;
}

/// SeaORM backed store writing to the `orders` table
#[derive(Clone)]
pub struct SeaOrmOrderStore {
    db: Arc<DbPool>,
}

impl SeaOrmOrderStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderStore for SeaOrmOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, ServiceError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let cakes = serde_json::to_value(&order.lines)
            .map_err(|e| ServiceError::PersistenceError(format!("cannot encode cakes: {}", e)))?;

        let model = order_entity::ActiveModel {
            id: Set(id),
            customer_name: Set(order.customer.name.clone()),
            delivery_address: Set(order.customer.address.clone()),
            contact_number: Set(order.customer.contact.clone()),
            message: Set(order.customer.note.clone()),
            cakes: Set(cakes),
            subtotal: Set(order.quote.subtotal.to_string()),
            total_amount: Set(order.quote.grand_total.to_string()),
            gst: Set(order.quote.gst.to_string()),
            vat: Set(order.quote.vat.to_string()),
            payment_mode: Set(order.payment_mode.clone()),
            order_date: Set(created_at),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| ServiceError::PersistenceError(e.to_string()))?;

        Ok(Order::from_new(id, order, created_at))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, ServiceError> {
        let model = order_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?;

        model.map(order_from_model).transpose()
    }
}

fn parse_amount(column: &str, value: &str) -> Result<Decimal, ServiceError> {
    Decimal::from_str(value)
        .map_err(|e| ServiceError::InternalError(format!("invalid {} '{}': {}", column, value, e)))
}

fn order_from_model(model: order_entity::Model) -> Result<Order, ServiceError> {
    let lines: Vec<CartLine> = serde_json::from_value(model.cakes)
        .map_err(|e| ServiceError::InternalError(format!("invalid cakes column: {}", e)))?;

    Ok(Order {
        id: model.id,
        customer: CustomerDetails::new(
            model.customer_name,
            model.delivery_address,
            model.contact_number,
            model.message,
        ),
        lines,
        quote: PriceQuote {
            subtotal: parse_amount("subtotal", &model.subtotal)?,
            gst: parse_amount("gst", &model.gst)?,
            vat: parse_amount("vat", &model.vat)?,
            grand_total: parse_amount("total_amount", &model.total_amount)?,
        },
        payment_mode: model.payment_mode,
        created_at: model.order_date,
    })
}

/// Process-local store, used by tests and when no database is wanted
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<Uuid, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, ServiceError> {
        let order = Order::from_new(Uuid::new_v4(), order, Utc::now());
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }
}

/// Hands finalized orders to the store, exactly one call per submission
#[derive(Clone)]
pub struct OrderSubmissionGateway {
    store: Arc<dyn OrderStore>,
}

impl OrderSubmissionGateway {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, order), fields(payment_mode = %order.payment_mode))]
    pub async fn submit(&self, order: NewOrder) -> Result<(Order, OrderReceipt), ServiceError> {
        match self.store.insert(order).await {
            Ok(order) => {
                metrics::ORDERS_CREATED.inc();
                info!(order_id = %order.id, "Order recorded");
                let receipt = OrderReceipt::placed(order.id);
                Ok((order, receipt))
            }
            Err(e) => {
                metrics::ORDER_PERSISTENCE_FAILURES.inc();
                error!(error = %e, "Failed to record order");
                Err(match e {
                    ServiceError::PersistenceError(_) => e,
                    other => ServiceError::PersistenceError(other.to_string()),
                })
            }
        }
    }

    pub async fn find(&self, id: Uuid) -> Result<Order, ServiceError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
    }
}
