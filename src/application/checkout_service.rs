use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::domain::cart::{snapshot_total, CartLineSnapshot};
use crate::domain::errors::DomainError;
use crate::domain::order::{AppliedDiscount, ContactInfo, Order, OrderLine, OrderTransition};
use crate::domain::ports::Store;
use crate::domain::user::Actor;

use super::discount_service::DiscountService;

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub contact: ContactInfo,
    pub discount_code: Option<String>,
}

/// Turns carts into orders and cancels them again.
pub struct CheckoutService<S> {
    store: S,
    discounts: DiscountService<S>,
}

impl<S: Store + Clone> CheckoutService<S> {
    pub fn new(store: S) -> Self {
        Self {
            discounts: DiscountService::new(store.clone()),
            store,
        }
    }

    pub fn place_order(&self, user_id: Uuid, request: CheckoutRequest) -> Result<Order, DomainError> {
        let shipping_address = request.shipping_address.trim().to_string();
        if shipping_address.is_empty() {
            return Err(DomainError::InvalidInput(
                "Shipping address is required".to_string(),
            ));
        }

        let cart = self.store.snapshot(user_id)?;
        if cart.is_empty() {
            warn!("Checkout rejected for user {}: cart is empty", user_id);
            return Err(DomainError::EmptyCart);
        }

        for line in &cart {
            self.ensure_available(line).inspect_err(|e| {
                warn!("Checkout rejected for user {}: {}", user_id, e);
            })?;
        }

        let lines = cart
            .iter()
            .zip(1..)
            .map(|(line, line_no)| {
                OrderLine::new(
                    line_no,
                    line.product_id,
                    line.product_name.clone(),
                    line.quantity,
                    line.unit_price.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let subtotal = snapshot_total(&cart);

        let discount = match request
            .discount_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(code) => {
                let quote = self
                    .discounts
                    .quote_for_user(code, &subtotal, user_id)
                    .inspect_err(|e| {
                        warn!("Checkout rejected for user {}: {}", user_id, e);
                    })?;
                Some(AppliedDiscount {
                    discount_id: quote.discount_id,
                    code: quote.code,
                    amount: quote.amount,
                })
            }
            None => None,
        };

        let contact = self.fill_contact(user_id, request.contact)?;
        let order = Order::place(
            user_id,
            lines,
            discount,
            shipping_address,
            contact,
            Utc::now(),
        )?;

        self.store.commit_checkout(&order).inspect_err(|e| {
            warn!("Checkout for user {} rolled back: {}", user_id, e);
        })?;

        info!(
            "Order {} placed by user {}: {} item(s), total {}",
            order.order_number,
            user_id,
            order.item_count(),
            order.total_amount
        );
        Ok(order)
    }

    /// Cancel an order and put its stock back. Discount usage is kept.
    pub fn cancel_order(&self, order_id: Uuid, actor: Actor) -> Result<Order, DomainError> {
        let order = self
            .store
            .find_by_id(order_id)?
            .ok_or(DomainError::OrderNotFound)?;
        if !actor.may_access(order.user_id) {
            return Err(DomainError::NotOrderOwner);
        }
        order.status.next(OrderTransition::Cancel)?;

        let cancelled = self
            .store
            .transition(order_id, OrderTransition::Cancel, Utc::now())?;
        info!(
            "Order {} cancelled by user {}; released {} item(s)",
            cancelled.order_number,
            actor.user_id,
            cancelled.item_count()
        );
        Ok(cancelled)
    }

    fn ensure_available(&self, line: &CartLineSnapshot) -> Result<(), DomainError> {
        if !line.product_active {
            return Err(DomainError::ProductInactive(line.product_id));
        }
        if self.store.has_sufficient_stock(line.product_id, line.quantity)? {
            return Ok(());
        }
        match self.store.find_product(line.product_id)? {
            None => Err(DomainError::ProductNotFound(line.product_id)),
            Some(product) if !product.is_active => Err(DomainError::ProductInactive(product.id)),
            Some(_) => Err(DomainError::InsufficientStock {
                product_id: line.product_id,
            }),
        }
    }

    fn fill_contact(&self, user_id: Uuid, mut contact: ContactInfo) -> Result<ContactInfo, DomainError> {
        if contact.customer_name.is_some() && contact.customer_email.is_some() {
            return Ok(contact);
        }
        if let Some(profile) = self.store.find_user(user_id)? {
            contact.customer_name.get_or_insert(profile.full_name);
            contact.customer_email.get_or_insert(profile.email);
        }
        Ok(contact)
    }
}
