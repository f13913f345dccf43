use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::discount::{self, Discount, DiscountRejection, DiscountType};
use crate::domain::errors::DomainError;
use crate::domain::ports::{DiscountRepository, DiscountUsageRecord};
use crate::schema::{discount_usages, discounts};

use super::models::{DiscountRow, NewDiscountUsageRow};
use super::store::DieselStore;

impl TryFrom<DiscountRow> for Discount {
    type Error = DomainError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let discount_type = row
            .discount_type
            .parse::<DiscountType>()
            .map_err(DomainError::Internal)?;
        Ok(Discount {
            id: row.id,
            code: row.code,
            description: row.description,
            discount_type,
            value: row.value,
            min_order_amount: row.min_order_amount,
            max_discount_amount: row.max_discount_amount,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            per_user_limit: row.per_user_limit,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.is_active,
        })
    }
}

/// Conditional increment of `used_count` plus the usage row. The caller owns
/// the surrounding transaction. The per-customer limit is checked after the
/// increment, while the discount row is locked.
pub(crate) fn record_usage(
    conn: &mut PgConnection,
    usage: &DiscountUsageRecord,
) -> Result<(), DomainError> {
    let per_user_limit: Option<Option<i32>> = diesel::update(
        discounts::table.filter(discounts::id.eq(usage.discount_id)).filter(
            discounts::usage_limit
                .is_null()
                .or(discounts::used_count.lt(discounts::usage_limit.assume_not_null())),
        ),
    )
    .set((
        discounts::used_count.eq(discounts::used_count + 1),
        discounts::updated_at.eq(usage.used_at),
    ))
    .returning(discounts::per_user_limit)
    .get_result(conn)
    .optional()?;

    let Some(per_user_limit) = per_user_limit else {
        let exists: i64 = discounts::table
            .filter(discounts::id.eq(usage.discount_id))
            .count()
            .get_result(conn)?;
        return Err(if exists == 0 {
            DiscountRejection::NotFound.into()
        } else {
            DiscountRejection::UsageLimitReached.into()
        });
    };

    if per_user_limit.is_some() {
        let used: i64 = discount_usages::table
            .filter(discount_usages::discount_id.eq(usage.discount_id))
            .filter(discount_usages::user_id.eq(usage.user_id))
            .count()
            .get_result(conn)?;
        discount::check_per_user_limit(per_user_limit, used)?;
    }

    diesel::insert_into(discount_usages::table)
        .values(&NewDiscountUsageRow {
            id: Uuid::new_v4(),
            discount_id: usage.discount_id,
            user_id: usage.user_id,
            order_id: usage.order_id,
            discount_amount: usage.amount.clone(),
            used_at: usage.used_at,
        })
        .execute(conn)?;
    Ok(())
}

impl DiscountRepository for DieselStore {
    fn find_by_code(&self, code: &str) -> Result<Option<Discount>, DomainError> {
        let mut conn = self.conn()?;
        let row = discounts::table
            .filter(discounts::code.eq(code))
            .select(DiscountRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(Discount::try_from).transpose()
    }

    fn count_usages_by_user(&self, discount_id: Uuid, user_id: Uuid) -> Result<i64, DomainError> {
        let mut conn = self.conn()?;
        Ok(discount_usages::table
            .filter(discount_usages::discount_id.eq(discount_id))
            .filter(discount_usages::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)?)
    }

    fn record_usage(&self, usage: &DiscountUsageRecord) -> Result<(), DomainError> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| record_usage(conn, usage))
    }
}
