use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::domain::cart::CartLineSnapshot;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, products};

use super::models::{NewCartItemRow, NewCartRow};
use super::store::DieselStore;

/// Returns the user's cart id, creating the cart on first use.
fn ensure_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Uuid, DomainError> {
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
        })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)?;
    diesel::update(carts::table.filter(carts::user_id.eq(user_id)))
        .set(carts::updated_at.eq(Utc::now()))
        .returning(carts::id)
        .get_result(conn)
        .map_err(DomainError::from)
}

/// Deletes every line of the user's cart. The cart row itself is kept.
pub(crate) fn clear_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<usize, DomainError> {
    let cart_ids = carts::table
        .filter(carts::user_id.eq(user_id))
        .select(carts::id);
    Ok(diesel::delete(cart_items::table.filter(cart_items::cart_id.eq_any(cart_ids))).execute(conn)?)
}

/// Deletes exactly the given `(product_id, quantity)` lines from the user's
/// cart. `Conflict` when a line is gone or its quantity changed since it was
/// read; lines added meanwhile are left alone.
pub(crate) fn consume_lines(
    conn: &mut PgConnection,
    user_id: Uuid,
    lines: &[(Uuid, i32)],
) -> Result<(), DomainError> {
    for (product_id, quantity) in lines {
        let cart_ids = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(carts::id);
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::cart_id.eq_any(cart_ids))
                .filter(cart_items::product_id.eq(product_id))
                .filter(cart_items::quantity.eq(quantity)),
        )
        .execute(conn)?;
        if deleted != 1 {
            return Err(DomainError::Conflict(format!(
                "cart line for product {} changed during checkout",
                product_id
            )));
        }
    }
    Ok(())
}

impl CartRepository for DieselStore {
    fn snapshot(&self, user_id: Uuid) -> Result<Vec<CartLineSnapshot>, DomainError> {
        let mut conn = self.conn()?;
        let rows = conn.build_transaction().read_only().run(|conn| {
            cart_items::table
                .inner_join(carts::table)
                .inner_join(products::table)
                .filter(carts::user_id.eq(user_id))
                .order(cart_items::created_at.asc())
                .select((
                    cart_items::product_id,
                    products::name,
                    cart_items::quantity,
                    products::price,
                    products::is_active,
                ))
                .load::<(Uuid, String, i32, BigDecimal, bool)>(conn)
        })?;

        Ok(rows
            .into_iter()
            .map(
                |(product_id, product_name, quantity, unit_price, product_active)| {
                    CartLineSnapshot {
                        product_id,
                        product_name,
                        quantity,
                        unit_price,
                        product_active,
                    }
                },
            )
            .collect())
    }

    fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let cart_id = ensure_cart(conn, user_id)?;
            diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id,
                    product_id,
                    quantity,
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
                .execute(conn)?;
            Ok(())
        })
    }

    fn set_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            self.remove_item(user_id, product_id)?;
            return Ok(());
        }
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let cart_id = ensure_cart(conn, user_id)?;
            diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id,
                    product_id,
                    quantity,
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(excluded(cart_items::quantity)))
                .execute(conn)?;
            Ok(())
        })
    }

    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.conn()?;
        let cart_ids = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(carts::id);
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::cart_id.eq_any(cart_ids))
                .filter(cart_items::product_id.eq(product_id)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.conn()?;
        clear_cart(&mut conn, user_id)?;
        Ok(())
    }
}
