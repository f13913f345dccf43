use bigdecimal::BigDecimal;
use log::debug;
use uuid::Uuid;

use crate::domain::cart::{snapshot_total, CartLineSnapshot};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, InventoryLedger};

#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub lines: Vec<CartLineSnapshot>,
    pub total: BigDecimal,
}

pub struct CartService<S> {
    store: S,
}

impl<S: CartRepository + InventoryLedger> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn view(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let lines = self.store.snapshot(user_id)?;
        let total = snapshot_total(&lines);
        Ok(CartView { lines, total })
    }

    pub fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let in_cart = self
            .store
            .snapshot(user_id)?
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity);
        let line_total = in_cart.checked_add(quantity).ok_or_else(|| {
            DomainError::InvalidInput("Quantity is too large".to_string())
        })?;
        self.ensure_orderable(product_id, line_total)?;
        self.store.add_item(user_id, product_id, quantity)?;
        debug!("User {} added {} x {} to cart", user_id, quantity, product_id);
        self.view(user_id)
    }

    /// Zero removes the line.
    pub fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 0 {
            return Err(DomainError::InvalidInput(
                "Quantity must not be negative".to_string(),
            ));
        }
        if quantity > 0 {
            self.ensure_orderable(product_id, quantity)?;
        }
        self.store.set_quantity(user_id, product_id, quantity)?;
        self.view(user_id)
    }

    pub fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView, DomainError> {
        if !self.store.remove_item(user_id, product_id)? {
            return Err(DomainError::InvalidInput(format!(
                "Product {} is not in the cart",
                product_id
            )));
        }
        self.view(user_id)
    }

    fn ensure_orderable(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let product = self
            .store
            .find_product(product_id)?
            .ok_or(DomainError::ProductNotFound(product_id))?;
        if !product.is_active {
            return Err(DomainError::ProductInactive(product_id));
        }
        if !product.can_supply(quantity) {
            return Err(DomainError::InsufficientStock { product_id });
        }
        Ok(())
    }
}
