use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::InventoryLedger;
use crate::domain::product::ProductStock;
use crate::schema::products;

use super::models::ProductRow;
use super::store::DieselStore;

impl From<ProductRow> for ProductStock {
    fn from(row: ProductRow) -> Self {
        ProductStock {
            id: row.id,
            name: row.name,
            price: row.price,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
            updated_at: row.updated_at,
        }
    }
}

fn ensure_positive(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidInput(format!(
            "Quantity must be at least 1, got {}",
            quantity
        )));
    }
    Ok(())
}

pub(crate) fn find_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<Option<ProductStock>, DomainError> {
    let row = products::table
        .filter(products::id.eq(product_id))
        .select(ProductRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(ProductStock::from))
}

/// Compare-and-decrement. The `stock_quantity >= quantity` predicate is
/// evaluated under the row lock, so concurrent reservations serialize and the
/// loser updates zero rows.
pub(crate) fn reserve(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    ensure_positive(quantity)?;
    let updated = diesel::update(
        products::table
            .filter(products::id.eq(product_id))
            .filter(products::is_active.eq(true))
            .filter(products::stock_quantity.ge(quantity)),
    )
    .set((
        products::stock_quantity.eq(products::stock_quantity - quantity),
        products::updated_at.eq(now),
    ))
    .execute(conn)?;
    if updated == 1 {
        return Ok(());
    }

    match find_product(conn, product_id)? {
        None => Err(DomainError::ProductNotFound(product_id)),
        Some(product) if !product.is_active => Err(DomainError::ProductInactive(product_id)),
        Some(_) => Err(DomainError::InsufficientStock { product_id }),
    }
}

pub(crate) fn release(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    ensure_positive(quantity)?;
    let updated = diesel::update(products::table.filter(products::id.eq(product_id)))
        .set((
            products::stock_quantity.eq(products::stock_quantity + quantity),
            products::updated_at.eq(now),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(DomainError::ProductNotFound(product_id));
    }
    Ok(())
}

impl InventoryLedger for DieselStore {
    fn find_product(&self, product_id: Uuid) -> Result<Option<ProductStock>, DomainError> {
        let mut conn = self.conn()?;
        find_product(&mut conn, product_id)
    }

    fn has_sufficient_stock(&self, product_id: Uuid, quantity: i32) -> Result<bool, DomainError> {
        Ok(self
            .find_product(product_id)?
            .is_some_and(|p| p.can_supply(quantity)))
    }

    fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| reserve(conn, product_id, quantity, Utc::now()))
    }

    fn release(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| release(conn, product_id, quantity, Utc::now()))
    }
}
