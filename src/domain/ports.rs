use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cart::CartLineSnapshot;
use super::discount::Discount;
use super::errors::DomainError;
use super::order::{Order, OrderTransition};
use super::product::ProductStock;
use super::user::UserProfile;

/// Per-product stock with atomic reserve and release.
pub trait InventoryLedger: Send + Sync + 'static {
    fn find_product(&self, product_id: Uuid) -> Result<Option<ProductStock>, DomainError>;

    /// Advisory check: the product is active and has at least `quantity` in stock.
    fn has_sufficient_stock(&self, product_id: Uuid, quantity: i32) -> Result<bool, DomainError>;

    /// Compare-and-decrement. Stock is re-checked at mutation time.
    fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;

    fn release(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscountUsageRecord {
    pub discount_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub used_at: DateTime<Utc>,
}

pub trait DiscountRepository: Send + Sync + 'static {
    /// Lookup by an already-normalized code.
    fn find_by_code(&self, code: &str) -> Result<Option<Discount>, DomainError>;

    fn count_usages_by_user(&self, discount_id: Uuid, user_id: Uuid) -> Result<i64, DomainError>;

    /// Increment `used_count` under the usage limit and append the usage row,
    /// both or neither. Not idempotent.
    fn record_usage(&self, usage: &DiscountUsageRecord) -> Result<(), DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    /// Lines joined with current product price, read at one instant.
    fn snapshot(&self, user_id: Uuid) -> Result<Vec<CartLineSnapshot>, DomainError>;

    /// Adds `quantity` to the line for `product_id`, creating cart and line as needed.
    fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;

    /// Sets the line quantity; zero removes the line.
    fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32)
        -> Result<(), DomainError>;

    /// Returns whether a line was removed.
    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError>;

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// One unit of work: reserve stock for every line, persist the order and
    /// its lines, record the discount usage if any, clear the owner's cart
    /// and write the `OrderPlaced` event. Any failure rolls back everything.
    fn commit_checkout(&self, order: &Order) -> Result<(), DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;

    /// Orders of `user_id`, newest first.
    fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError>;

    /// Guarded status change. The status precondition, the change itself, the
    /// stock release on cancellation and the event are one unit of work.
    fn transition(
        &self,
        order_id: Uuid,
        transition: OrderTransition,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError>;
}

pub trait UserDirectory: Send + Sync + 'static {
    fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError>;
}

/// Everything the application services need from persistence.
pub trait Store:
    InventoryLedger + DiscountRepository + CartRepository + OrderRepository + UserDirectory
{
}

impl<T> Store for T where
    T: InventoryLedger + DiscountRepository + CartRepository + OrderRepository + UserDirectory
{
}
