use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::money::format_money;
use crate::domain::order::{AppliedDiscount, ContactInfo, Order, OrderLine, OrderStatus, OrderTransition};
use crate::domain::ports::{DiscountUsageRecord, OrderRepository};
use crate::schema::{order_lines, order_outbox, orders};

use super::models::{NewOrderLineRow, NewOrderRow, NewOutboxEventRow, OrderLineRow, OrderRow};
use super::store::DieselStore;
use super::{cart_repo, discount_repo, inventory_ledger};

fn to_domain(row: OrderRow, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
    let discount = match (row.discount_id, row.discount_code) {
        (Some(discount_id), Some(code)) => Some(AppliedDiscount {
            discount_id,
            code,
            amount: row.discount_amount.clone(),
        }),
        _ => None,
    };
    Ok(Order {
        id: row.id,
        order_number: row.order_number,
        user_id: row.user_id,
        status: row.status.parse()?,
        subtotal: row.subtotal,
        discount_amount: row.discount_amount,
        total_amount: row.total_amount,
        discount,
        shipping_address: row.shipping_address,
        contact: ContactInfo {
            phone: row.phone,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            notes: row.notes,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
        confirmed_at: row.confirmed_at,
        shipped_at: row.shipped_at,
        delivered_at: row.delivered_at,
        cancelled_at: row.cancelled_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLine {
                id: l.id,
                line_no: l.line_no,
                product_id: l.product_id,
                product_name: l.product_name,
                quantity: l.quantity,
                unit_price: l.unit_price,
                subtotal: l.subtotal,
            })
            .collect(),
    })
}

fn load_lines(conn: &mut PgConnection, row: &OrderRow) -> QueryResult<Vec<OrderLineRow>> {
    OrderLineRow::belonging_to(row)
        .select(OrderLineRow::as_select())
        .order(order_lines::line_no.asc())
        .load(conn)
}

/// Outbox row for an order mutation, written in the mutating transaction.
fn order_event(order: &Order, event_type: &str, from: Option<OrderStatus>) -> NewOutboxEventRow {
    let mut payload = json!({
        "order_id": order.id,
        "order_number": order.order_number,
        "user_id": order.user_id,
        "from": from.map(|s| s.as_str()),
        "to": order.status.as_str(),
        "subtotal": format_money(&order.subtotal),
        "discount_amount": format_money(&order.discount_amount),
        "total_amount": format_money(&order.total_amount),
    });
    if from.is_none() {
        payload["lines"] = order
            .lines
            .iter()
            .map(|l| {
                json!({
                    "product_id": l.product_id,
                    "quantity": l.quantity,
                    "unit_price": format_money(&l.unit_price)
                })
            })
            .collect();
    }
    NewOutboxEventRow {
        id: Uuid::new_v4(),
        aggregate_type: "Order".to_string(),
        aggregate_id: order.id.to_string(),
        event_type: event_type.to_string(),
        payload,
    }
}

/// Per-product quantities in product id order, so concurrent transactions
/// take row locks in the same sequence.
fn stock_moves(order: &Order) -> Vec<(Uuid, i32)> {
    let mut moves: Vec<(Uuid, i32)> = order
        .lines
        .iter()
        .map(|l| (l.product_id, l.quantity))
        .collect();
    moves.sort_by_key(|(product_id, _)| *product_id);
    moves
}

impl OrderRepository for DieselStore {
    fn commit_checkout(&self, order: &Order) -> Result<(), DomainError> {
        let mut conn = self.conn()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let moves = stock_moves(order);

            // 1. Take the ordered lines out of the cart. Row locks on the cart
            //    lines serialize a double-submitted checkout.
            cart_repo::consume_lines(conn, order.user_id, &moves)?;

            // 2. Reserve stock; each statement re-checks availability.
            for (product_id, quantity) in moves {
                inventory_ledger::reserve(conn, product_id, quantity, order.created_at)?;
            }

            // 3. Insert the order and its frozen lines
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    order_number: order.order_number.clone(),
                    user_id: order.user_id,
                    status: order.status.as_str().to_string(),
                    subtotal: order.subtotal.clone(),
                    discount_amount: order.discount_amount.clone(),
                    total_amount: order.total_amount.clone(),
                    discount_id: order.discount.as_ref().map(|d| d.discount_id),
                    discount_code: order.discount.as_ref().map(|d| d.code.clone()),
                    shipping_address: order.shipping_address.clone(),
                    phone: order.contact.phone.clone(),
                    customer_name: order.contact.customer_name.clone(),
                    customer_email: order.contact.customer_email.clone(),
                    notes: order.contact.notes.clone(),
                    created_at: order.created_at,
                    updated_at: order.updated_at,
                })
                .execute(conn)?;

            let new_lines: Vec<NewOrderLineRow> = order
                .lines
                .iter()
                .map(|l| NewOrderLineRow {
                    id: l.id,
                    order_id: order.id,
                    line_no: l.line_no,
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                    subtotal: l.subtotal.clone(),
                })
                .collect();
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .execute(conn)?;

            // 4. Consume one use of the discount
            if let Some(applied) = &order.discount {
                discount_repo::record_usage(
                    conn,
                    &DiscountUsageRecord {
                        discount_id: applied.discount_id,
                        user_id: order.user_id,
                        order_id: Some(order.id),
                        amount: applied.amount.clone(),
                        used_at: order.created_at,
                    },
                )?;
            }

            // 5. Record the event
            diesel::insert_into(order_outbox::table)
                .values(&order_event(order, "OrderPlaced", None))
                .execute(conn)?;

            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.conn()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = load_lines(&mut conn, &order)?;
        to_domain(order, lines).map(Some)
    }

    fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.conn()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .load(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .order(order_lines::line_no.asc())
                .load(conn)?;

            lines
                .grouped_by(&rows)
                .into_iter()
                .zip(rows)
                .map(|(lines, row)| to_domain(row, lines))
                .collect()
        })
    }

    fn transition(
        &self,
        order_id: Uuid,
        transition: OrderTransition,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        let mut conn = self.conn()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Row lock: concurrent transitions of the same order queue here and
            // see the committed status.
            let row = orders::table
                .filter(orders::id.eq(order_id))
                .select(OrderRow::as_select())
                .for_update()
                .get_result(conn)
                .optional()?
                .ok_or(DomainError::OrderNotFound)?;
            let lines = load_lines(conn, &row)?;
            let mut order = to_domain(row, lines)?;
            let from = order.status;
            order.apply(transition, now)?;

            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::status.eq(from.as_str())),
            )
            .set((
                orders::status.eq(order.status.as_str()),
                orders::updated_at.eq(order.updated_at),
                orders::confirmed_at.eq(order.confirmed_at),
                orders::shipped_at.eq(order.shipped_at),
                orders::delivered_at.eq(order.delivered_at),
                orders::cancelled_at.eq(order.cancelled_at),
            ))
            .execute(conn)?;
            if updated != 1 {
                return Err(DomainError::Conflict(format!(
                    "order {} changed concurrently",
                    order.order_number
                )));
            }

            if transition == OrderTransition::Cancel {
                for (product_id, quantity) in stock_moves(&order) {
                    inventory_ledger::release(conn, product_id, quantity, now)?;
                }
            }

            diesel::insert_into(order_outbox::table)
                .values(&order_event(&order, transition.event_type(), Some(from)))
                .execute(conn)?;

            Ok(order)
        })
    }
}
