//! Mutex-backed store used by the service tests.
//!
//! Every mutation runs against a clone of the state that replaces the real
//! state only when the whole unit of work succeeds, which gives the same
//! all-or-nothing behaviour as the Postgres transactions.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cart::CartLineSnapshot;
use crate::domain::discount::{check_per_user_limit, Discount, DiscountRejection, DiscountType};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus, OrderTransition};
use crate::domain::ports::{
    CartRepository, DiscountRepository, DiscountUsageRecord, InventoryLedger, OrderRepository,
    UserDirectory,
};
use crate::domain::product::ProductStock;
use crate::domain::user::UserProfile;

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub order_id: Uuid,
    pub event_type: String,
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, ProductStock>,
    carts: HashMap<Uuid, Vec<(Uuid, i32)>>,
    discounts: HashMap<Uuid, Discount>,
    usages: Vec<DiscountUsageRecord>,
    orders: HashMap<Uuid, Order>,
    users: HashMap<Uuid, UserProfile>,
    events: Vec<RecordedEvent>,
}

impl MemoryState {
    fn reserve(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;
        if !product.is_active {
            return Err(DomainError::ProductInactive(product_id));
        }
        if product.stock_quantity < quantity {
            return Err(DomainError::InsufficientStock { product_id });
        }
        product.stock_quantity -= quantity;
        product.updated_at = Utc::now();
        Ok(())
    }

    fn release(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;
        product.stock_quantity = product
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::Internal("stock quantity overflow".to_string()))?;
        product.updated_at = Utc::now();
        Ok(())
    }

    fn consume_cart_line(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let lines = self.carts.entry(user_id).or_default();
        let before = lines.len();
        lines.retain(|line| *line != (product_id, quantity));
        if lines.len() + 1 != before {
            return Err(DomainError::Conflict(format!(
                "cart line for product {} changed during checkout",
                product_id
            )));
        }
        Ok(())
    }

    fn record_usage(&mut self, usage: &DiscountUsageRecord) -> Result<(), DomainError> {
        let discount = self
            .discounts
            .get_mut(&usage.discount_id)
            .ok_or(DiscountRejection::NotFound)?;
        if discount
            .usage_limit
            .is_some_and(|limit| discount.used_count >= limit)
        {
            return Err(DiscountRejection::UsageLimitReached.into());
        }
        let used_by_user = self
            .usages
            .iter()
            .filter(|u| u.discount_id == usage.discount_id && u.user_id == usage.user_id)
            .count();
        check_per_user_limit(discount.per_user_limit, used_by_user as i64)?;
        discount.used_count += 1;
        self.usages.push(usage.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> Result<T, DomainError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| DomainError::Internal("store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn unit_of_work<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| DomainError::Internal("store lock poisoned".to_string()))?;
        let mut draft = guard.clone();
        let value = f(&mut draft)?;
        *guard = draft;
        Ok(value)
    }

    // ── fixtures ─────────────────────────────────────────────────────────────

    pub fn add_product(&self, name: &str, price: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        let product = ProductStock {
            id,
            name: name.to_string(),
            price: BigDecimal::from_str(price).expect("valid price"),
            stock_quantity: stock,
            is_active: true,
            updated_at: Utc::now(),
        };
        self.state
            .lock()
            .expect("lock")
            .products
            .insert(id, product);
        id
    }

    pub fn set_product_active(&self, product_id: Uuid, active: bool) {
        let mut state = self.state.lock().expect("lock");
        if let Some(p) = state.products.get_mut(&product_id) {
            p.is_active = active;
        }
    }

    pub fn set_product_price(&self, product_id: Uuid, price: &str) {
        let mut state = self.state.lock().expect("lock");
        if let Some(p) = state.products.get_mut(&product_id) {
            p.price = BigDecimal::from_str(price).expect("valid price");
        }
    }

    pub fn add_user(&self, full_name: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().expect("lock").users.insert(
            id,
            UserProfile {
                id,
                full_name: full_name.to_string(),
                email: email.to_string(),
                is_admin: false,
            },
        );
        id
    }

    pub fn add_discount(&self, discount: Discount) -> Uuid {
        let id = discount.id;
        self.state
            .lock()
            .expect("lock")
            .discounts
            .insert(id, discount);
        id
    }

    pub fn stock_of(&self, product_id: Uuid) -> i32 {
        self.state.lock().expect("lock").products[&product_id].stock_quantity
    }

    pub fn discount(&self, discount_id: Uuid) -> Discount {
        self.state.lock().expect("lock").discounts[&discount_id].clone()
    }

    pub fn usages(&self) -> Vec<DiscountUsageRecord> {
        self.state.lock().expect("lock").usages.clone()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.lock().expect("lock").events.clone()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().expect("lock").orders.len()
    }
}

/// A percentage discount with no limits, for tests to customise.
pub fn percentage_discount(code: &str, percent: &str) -> Discount {
    Discount {
        id: Uuid::new_v4(),
        code: code.to_string(),
        description: None,
        discount_type: DiscountType::Percentage,
        value: BigDecimal::from_str(percent).expect("valid percent"),
        min_order_amount: None,
        max_discount_amount: None,
        usage_limit: None,
        used_count: 0,
        per_user_limit: None,
        start_date: None,
        end_date: None,
        is_active: true,
    }
}

impl InventoryLedger for InMemoryStore {
    fn find_product(&self, product_id: Uuid) -> Result<Option<ProductStock>, DomainError> {
        self.read(|s| s.products.get(&product_id).cloned())
    }

    fn has_sufficient_stock(&self, product_id: Uuid, quantity: i32) -> Result<bool, DomainError> {
        self.read(|s| {
            s.products
                .get(&product_id)
                .is_some_and(|p| p.can_supply(quantity))
        })
    }

    fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        self.unit_of_work(|s| s.reserve(product_id, quantity))
    }

    fn release(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        self.unit_of_work(|s| s.release(product_id, quantity))
    }
}

impl DiscountRepository for InMemoryStore {
    fn find_by_code(&self, code: &str) -> Result<Option<Discount>, DomainError> {
        self.read(|s| {
            s.discounts
                .values()
                .find(|d| d.code.eq_ignore_ascii_case(code))
                .cloned()
        })
    }

    fn count_usages_by_user(&self, discount_id: Uuid, user_id: Uuid) -> Result<i64, DomainError> {
        self.read(|s| {
            s.usages
                .iter()
                .filter(|u| u.discount_id == discount_id && u.user_id == user_id)
                .count() as i64
        })
    }

    fn record_usage(&self, usage: &DiscountUsageRecord) -> Result<(), DomainError> {
        self.unit_of_work(|s| s.record_usage(usage))
    }
}

impl CartRepository for InMemoryStore {
    fn snapshot(&self, user_id: Uuid) -> Result<Vec<CartLineSnapshot>, DomainError> {
        self.read(|s| {
            s.carts
                .get(&user_id)
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|(product_id, quantity)| {
                            s.products.get(product_id).map(|p| CartLineSnapshot {
                                product_id: p.id,
                                product_name: p.name.clone(),
                                quantity: *quantity,
                                unit_price: p.price.clone(),
                                product_active: p.is_active,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        self.unit_of_work(|s| {
            let lines = s.carts.entry(user_id).or_default();
            match lines.iter_mut().find(|(p, _)| *p == product_id) {
                Some((_, q)) => *q += quantity,
                None => lines.push((product_id, quantity)),
            }
            Ok(())
        })
    }

    fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        self.unit_of_work(|s| {
            let lines = s.carts.entry(user_id).or_default();
            if quantity == 0 {
                lines.retain(|(p, _)| *p != product_id);
            } else {
                match lines.iter_mut().find(|(p, _)| *p == product_id) {
                    Some((_, q)) => *q = quantity,
                    None => lines.push((product_id, quantity)),
                }
            }
            Ok(())
        })
    }

    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        self.unit_of_work(|s| {
            let Some(lines) = s.carts.get_mut(&user_id) else {
                return Ok(false);
            };
            let before = lines.len();
            lines.retain(|(p, _)| *p != product_id);
            Ok(lines.len() != before)
        })
    }

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        self.unit_of_work(|s| {
            s.carts.remove(&user_id);
            Ok(())
        })
    }
}

impl OrderRepository for InMemoryStore {
    fn commit_checkout(&self, order: &Order) -> Result<(), DomainError> {
        self.unit_of_work(|s| {
            for line in &order.lines {
                s.consume_cart_line(order.user_id, line.product_id, line.quantity)?;
            }
            for line in &order.lines {
                s.reserve(line.product_id, line.quantity)?;
            }
            if s.orders.values().any(|o| o.order_number == order.order_number) {
                return Err(DomainError::Conflict(format!(
                    "order number {} already exists",
                    order.order_number
                )));
            }
            s.orders.insert(order.id, order.clone());
            if let Some(applied) = &order.discount {
                s.record_usage(&DiscountUsageRecord {
                    discount_id: applied.discount_id,
                    user_id: order.user_id,
                    order_id: Some(order.id),
                    amount: applied.amount.clone(),
                    used_at: order.created_at,
                })?;
            }
            s.events.push(RecordedEvent {
                order_id: order.id,
                event_type: "OrderPlaced".to_string(),
                from: None,
                to: order.status,
            });
            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.read(|s| s.orders.get(&id).cloned())
    }

    fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        self.read(|s| {
            let mut orders: Vec<Order> = s
                .orders
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders
        })
    }

    fn transition(
        &self,
        order_id: Uuid,
        transition: OrderTransition,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        self.unit_of_work(|s| {
            let mut order = s
                .orders
                .get(&order_id)
                .cloned()
                .ok_or(DomainError::OrderNotFound)?;
            let from = order.status;
            order.apply(transition, now)?;
            if transition == OrderTransition::Cancel {
                for line in &order.lines {
                    s.release(line.product_id, line.quantity)?;
                }
            }
            s.orders.insert(order_id, order.clone());
            s.events.push(RecordedEvent {
                order_id,
                event_type: transition.event_type().to_string(),
                from: Some(from),
                to: order.status,
            });
            Ok(order)
        })
    }
}

impl UserDirectory for InMemoryStore {
    fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        self.read(|s| s.users.get(&user_id).cloned())
    }
}
