use thiserror::Error;
use uuid::Uuid;

use super::discount::DiscountRejection;
use super::order::{OrderStatus, OrderTransition};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: Uuid },
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),
    #[error("Product {0} is not available")]
    ProductInactive(Uuid),
    #[error("Discount rejected: {0}")]
    Discount(#[from] DiscountRejection),
    #[error("Order total must be greater than zero")]
    NonPositiveTotal,
    #[error("Cannot {transition} an order in status {from}")]
    InvalidStateTransition {
        from: OrderStatus,
        transition: OrderTransition,
    },
    #[error("Order not found")]
    OrderNotFound,
    #[error("Order belongs to another user")]
    NotOrderOwner,
    #[error("Operation requires an administrator")]
    Forbidden,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
