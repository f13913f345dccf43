use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The catalog fields the order core reads for a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductStock {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProductStock {
    pub fn can_supply(&self, quantity: i32) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }
}
