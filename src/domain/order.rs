use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::money::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether stock reserved for an order in this status is still held.
    pub fn holds_stock(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// Target status of `transition` from `self`, if the edge exists.
    pub fn next(self, transition: OrderTransition) -> Result<OrderStatus, DomainError> {
        match (self, transition) {
            (OrderStatus::Pending, OrderTransition::Confirm) => Ok(OrderStatus::Confirmed),
            (OrderStatus::Confirmed, OrderTransition::Deliver) => Ok(OrderStatus::Delivered),
            (OrderStatus::Pending | OrderStatus::Confirmed, OrderTransition::Cancel) => {
                Ok(OrderStatus::Cancelled)
            }
            (from, transition) => Err(DomainError::InvalidStateTransition { from, transition }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Internal(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderTransition {
    Confirm,
    Deliver,
    Cancel,
}

impl OrderTransition {
    /// Statuses from which this transition is legal.
    pub fn allowed_from(&self) -> &'static [OrderStatus] {
        match self {
            OrderTransition::Confirm => &[OrderStatus::Pending],
            OrderTransition::Deliver => &[OrderStatus::Confirmed],
            OrderTransition::Cancel => &[OrderStatus::Pending, OrderStatus::Confirmed],
        }
    }

    pub fn target(&self) -> OrderStatus {
        match self {
            OrderTransition::Confirm => OrderStatus::Confirmed,
            OrderTransition::Deliver => OrderStatus::Delivered,
            OrderTransition::Cancel => OrderStatus::Cancelled,
        }
    }

    /// Outbox event type recorded when the transition commits.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderTransition::Confirm => "OrderConfirmed",
            OrderTransition::Deliver => "OrderDelivered",
            OrderTransition::Cancel => "OrderCancelled",
        }
    }
}

impl fmt::Display for OrderTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderTransition::Confirm => "confirm",
            OrderTransition::Deliver => "deliver",
            OrderTransition::Cancel => "cancel",
        })
    }
}

/// A line frozen at checkout. Product is referenced by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

impl OrderLine {
    pub fn new(
        line_no: i32,
        product_id: Uuid,
        product_name: String,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Self, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "Quantity for product {} must be at least 1",
                product_id
            )));
        }
        let subtotal = round_money(&(&unit_price * &BigDecimal::from(quantity)));
        Ok(Self {
            id: Uuid::new_v4(),
            line_no,
            product_id,
            product_name,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDiscount {
    pub discount_id: Uuid,
    pub code: String,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub subtotal: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub discount: Option<AppliedDiscount>,
    pub shipping_address: String,
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Build a new `PENDING` order from frozen lines.
    ///
    /// Fails with `EmptyCart` when there are no lines and `NonPositiveTotal`
    /// when the discount consumes the whole subtotal.
    pub fn place(
        user_id: Uuid,
        lines: Vec<OrderLine>,
        discount: Option<AppliedDiscount>,
        shipping_address: String,
        contact: ContactInfo,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        let mut order = Self {
            id: Uuid::new_v4(),
            order_number: generate_order_number(user_id, now),
            user_id,
            status: OrderStatus::Pending,
            subtotal: BigDecimal::zero(),
            discount_amount: discount
                .as_ref()
                .map(|d| round_money(&d.amount))
                .unwrap_or_else(BigDecimal::zero),
            total_amount: BigDecimal::zero(),
            discount,
            shipping_address,
            contact,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            lines,
        };
        order.recalculate_total();
        if order.total_amount <= BigDecimal::zero() {
            return Err(DomainError::NonPositiveTotal);
        }
        Ok(order)
    }

    /// `subtotal = Σ line.subtotal`, `total = subtotal - discount_amount`.
    pub fn recalculate_total(&mut self) {
        let subtotal = self
            .lines
            .iter()
            .fold(BigDecimal::zero(), |acc, line| acc + &line.subtotal);
        self.subtotal = round_money(&subtotal);
        self.total_amount = round_money(&(&self.subtotal - &self.discount_amount));
    }

    /// Move to the next status and stamp the matching timestamp.
    pub fn apply(&mut self, transition: OrderTransition, now: DateTime<Utc>) -> Result<(), DomainError> {
        let next = self.status.next(transition)?;
        self.status = next;
        self.updated_at = now;
        match transition {
            OrderTransition::Confirm => self.confirmed_at = Some(now),
            OrderTransition::Deliver => {
                self.shipped_at = Some(now);
                self.delivered_at = Some(now);
            }
            OrderTransition::Cancel => self.cancelled_at = Some(now),
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }
}

/// `ORD-<yyyymmddHHMMSSmmm>-<user prefix>-<random>`; uniqueness is enforced
/// by the store.
pub fn generate_order_number(user_id: Uuid, now: DateTime<Utc>) -> String {
    let user = user_id.simple().to_string();
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}-{}",
        now.format("%Y%m%d%H%M%S%3f"),
        &user[..8],
        &nonce[..8]
    )
    .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn line(qty: i32, price: &str) -> OrderLine {
        OrderLine::new(1, Uuid::new_v4(), "Mango".to_string(), qty, dec(price)).expect("line")
    }

    fn pending_order() -> Order {
        Order::place(
            Uuid::new_v4(),
            vec![line(2, "50000")],
            None,
            "1 Orchard Road".to_string(),
            ContactInfo::default(),
            Utc::now(),
        )
        .expect("order")
    }

    #[test]
    fn line_subtotal_is_quantity_times_price() {
        let l = line(3, "12.50");
        assert_eq!(l.subtotal, dec("37.50"));
    }

    #[test]
    fn line_rejects_zero_quantity() {
        assert!(matches!(
            OrderLine::new(1, Uuid::new_v4(), "Kiwi".to_string(), 0, dec("1")),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn place_computes_totals_without_discount() {
        let order = pending_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, dec("100000"));
        assert_eq!(order.discount_amount, dec("0"));
        assert_eq!(order.total_amount, dec("100000"));
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn place_subtracts_discount() {
        let order = Order::place(
            Uuid::new_v4(),
            vec![line(2, "50000")],
            Some(AppliedDiscount {
                discount_id: Uuid::new_v4(),
                code: "WELCOME10".to_string(),
                amount: dec("10000"),
            }),
            "addr".to_string(),
            ContactInfo::default(),
            Utc::now(),
        )
        .expect("order");
        assert_eq!(order.total_amount, dec("90000"));
        assert_eq!(
            order.total_amount,
            &order.subtotal - &order.discount_amount
        );
    }

    #[test]
    fn place_rejects_empty_and_fully_discounted_orders() {
        let empty = Order::place(
            Uuid::new_v4(),
            vec![],
            None,
            "addr".to_string(),
            ContactInfo::default(),
            Utc::now(),
        );
        assert_eq!(empty, Err(DomainError::EmptyCart));

        let free = Order::place(
            Uuid::new_v4(),
            vec![line(1, "100")],
            Some(AppliedDiscount {
                discount_id: Uuid::new_v4(),
                code: "ALLFREE".to_string(),
                amount: dec("100"),
            }),
            "addr".to_string(),
            ContactInfo::default(),
            Utc::now(),
        );
        assert_eq!(free, Err(DomainError::NonPositiveTotal));
    }

    #[test]
    fn happy_path_transitions_stamp_timestamps() {
        let mut order = pending_order();
        let now = Utc::now();
        order.apply(OrderTransition::Confirm, now).expect("confirm");
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.confirmed_at, Some(now));

        order.apply(OrderTransition::Deliver, now).expect("deliver");
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.delivered_at, Some(now));
        assert_eq!(order.shipped_at, Some(now));
    }

    #[test]
    fn cancel_allowed_from_pending_and_confirmed() {
        let mut pending = pending_order();
        pending.apply(OrderTransition::Cancel, Utc::now()).expect("cancel");
        assert_eq!(pending.status, OrderStatus::Cancelled);
        assert!(pending.cancelled_at.is_some());

        let mut confirmed = pending_order();
        confirmed.apply(OrderTransition::Confirm, Utc::now()).expect("confirm");
        confirmed.apply(OrderTransition::Cancel, Utc::now()).expect("cancel");
        assert_eq!(confirmed.status, OrderStatus::Cancelled);
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for transition in [
                OrderTransition::Confirm,
                OrderTransition::Deliver,
                OrderTransition::Cancel,
            ] {
                assert_eq!(
                    terminal.next(transition),
                    Err(DomainError::InvalidStateTransition {
                        from: terminal,
                        transition
                    })
                );
            }
        }
    }

    #[test]
    fn rejected_transition_leaves_order_unchanged() {
        let mut order = pending_order();
        let before = order.clone();
        assert!(order.apply(OrderTransition::Deliver, Utc::now()).is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn allowed_from_matches_next() {
        for transition in [
            OrderTransition::Confirm,
            OrderTransition::Deliver,
            OrderTransition::Cancel,
        ] {
            for status in [
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ] {
                let legal = transition.allowed_from().contains(&status);
                assert_eq!(status.next(transition).is_ok(), legal);
                if legal {
                    assert_eq!(status.next(transition), Ok(transition.target()));
                }
            }
        }
    }

    #[test]
    fn status_round_trips_case_insensitively() {
        assert_eq!("pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert_eq!("Cancelled".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_numbers_are_prefixed_and_distinct() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let a = generate_order_number(user, now);
        let b = generate_order_number(user, now);
        assert!(a.starts_with("ORD-"));
        assert!(a.contains(&user.simple().to_string()[..8].to_uppercase()));
        assert_ne!(a, b);
    }
}
