use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One cake in the cart. Item names are unique within a cart.
///
/// Serialized with the storefront's field names (`cakeName`, `price`, `quantity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "cakeName", alias = "itemName")]
    pub item_name: String,
    #[serde(rename = "price", alias = "unitPrice")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(item_name: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            item_name: item_name.into(),
            unit_price,
            quantity,
        }
    }

    /// Rejects blank names, negative prices and zero quantities
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.item_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Item name is required".to_string(),
            ));
        }
        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(ServiceError::ValidationError(format!(
                "Unit price for {} cannot be negative",
                self.item_name
            )));
        }
        if self.quantity == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for {} must be at least 1",
                self.item_name
            )));
        }
        Ok(())
    }

    pub fn line_total(&self) -> Result<Decimal, ServiceError> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Line total for {} is too large", self.item_name))
            })
    }

    fn add_quantity(&mut self, extra: u32) -> Result<(), ServiceError> {
        self.quantity = self.quantity.checked_add(extra).ok_or_else(|| {
            ServiceError::ValidationError(format!("Quantity for {} is too large", self.item_name))
        })?;
        Ok(())
    }
}

/// Ordered collection of cart lines, keyed by item name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from raw lines, merging repeated item names into one line.
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, ServiceError> {
        let mut cart = Self::new();
        for line in lines {
            line.validate()?;
            match cart.find_mut(&line.item_name) {
                Some(existing) => existing.add_quantity(line.quantity)?,
                None => cart.lines.push(line),
            }
        }
        Ok(cart)
    }

    /// Adds one unit of an item; re-adding an existing item bumps its quantity.
    pub fn add_item(&mut self, item_name: &str, unit_price: Decimal) -> Result<(), ServiceError> {
        if let Some(existing) = self.find_mut(item_name) {
            return existing.add_quantity(1);
        }

        let line = CartLine::new(item_name, unit_price, 1);
        line.validate()?;
        self.lines.push(line);
        Ok(())
    }

    /// Sets the quantity of an existing line. Zero removes the line.
    pub fn set_quantity(&mut self, item_name: &str, quantity: u32) -> Result<(), ServiceError> {
        if quantity == 0 {
            return self.remove_item(item_name);
        }

        match self.find_mut(item_name) {
            Some(existing) => {
                existing.quantity = quantity;
                Ok(())
            }
            None => Err(ServiceError::NotFound(format!(
                "{} is not in the cart",
                item_name
            ))),
        }
    }

    pub fn remove_item(&mut self, item_name: &str) -> Result<(), ServiceError> {
        let before = self.lines.len();
        self.lines.retain(|line| line.item_name != item_name);
        if self.lines.len() == before {
            return Err(ServiceError::NotFound(format!(
                "{} is not in the cart",
                item_name
            )));
        }
        Ok(())
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn find_mut(&mut self, item_name: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.item_name == item_name)
    }
}
