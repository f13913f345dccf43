use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use super::money::round_money;

/// One cart line joined with the product row it pointed at when read.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineSnapshot {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub product_active: bool,
}

impl CartLineSnapshot {
    pub fn line_total(&self) -> BigDecimal {
        round_money(&(&self.unit_price * &BigDecimal::from(self.quantity)))
    }
}

/// Sum of `quantity × unit_price` across the snapshot.
pub fn snapshot_total(lines: &[CartLineSnapshot]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.line_total())
}
