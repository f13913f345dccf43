use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderTransition};
use crate::domain::ports::OrderRepository;
use crate::domain::user::Actor;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_order(&self, id: Uuid, actor: Actor) -> Result<Order, DomainError> {
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::OrderNotFound)?;
        if !actor.may_access(order.user_id) {
            return Err(DomainError::NotOrderOwner);
        }
        Ok(order)
    }

    pub fn list_orders(&self, actor: Actor) -> Result<Vec<Order>, DomainError> {
        self.repo.list_by_user(actor.user_id)
    }

    pub fn confirm_order(&self, id: Uuid, actor: Actor) -> Result<Order, DomainError> {
        self.admin_transition(id, OrderTransition::Confirm, actor)
    }

    /// Ship and deliver in one step.
    pub fn deliver_order(&self, id: Uuid, actor: Actor) -> Result<Order, DomainError> {
        self.admin_transition(id, OrderTransition::Deliver, actor)
    }

    fn admin_transition(
        &self,
        id: Uuid,
        transition: OrderTransition,
        actor: Actor,
    ) -> Result<Order, DomainError> {
        if !actor.is_admin {
            return Err(DomainError::Forbidden);
        }
        let order = self
            .repo
            .transition(id, transition, Utc::now())
            .inspect_err(|e| warn!("Admin {} could not {} order {}: {}", actor.user_id, transition, id, e))?;
        info!(
            "Order {} moved to {} by admin {}",
            order.order_number, order.status, actor.user_id
        );
        Ok(order)
    }
}
