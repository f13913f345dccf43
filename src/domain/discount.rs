use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::money::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::FixedAmount => "FIXED_AMOUNT",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(DiscountType::Percentage),
            "FIXED_AMOUNT" => Ok(DiscountType::FixedAmount),
            other => Err(format!("unknown discount type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Discount {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: BigDecimal,
    pub min_order_amount: Option<BigDecimal>,
    pub max_discount_amount: Option<BigDecimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub per_user_limit: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// A code that passed every check, with the amount it grants.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountQuote {
    pub discount_id: Uuid,
    pub code: String,
    pub amount: BigDecimal,
    /// `None` when the discount has no usage limit.
    pub remaining_uses: Option<i32>,
    pub per_user_limit: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountRejection {
    #[error("discount code not found")]
    NotFound,
    #[error("discount code is inactive")]
    Inactive,
    #[error("discount code is not valid yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code usage limit reached")]
    UsageLimitReached,
    #[error("order amount is below the minimum of {minimum}")]
    BelowMinimumOrder { minimum: BigDecimal },
    #[error("discount code already used {limit} time(s) by this customer")]
    PerUserLimitReached { limit: i32 },
}

impl DiscountRejection {
    /// Stable machine-readable identifier for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            DiscountRejection::NotFound => "DISCOUNT_NOT_FOUND",
            DiscountRejection::Inactive => "DISCOUNT_INACTIVE",
            DiscountRejection::NotStarted => "DISCOUNT_NOT_STARTED",
            DiscountRejection::Expired => "DISCOUNT_EXPIRED",
            DiscountRejection::UsageLimitReached => "DISCOUNT_USAGE_LIMIT_REACHED",
            DiscountRejection::BelowMinimumOrder { .. } => "DISCOUNT_BELOW_MINIMUM_ORDER",
            DiscountRejection::PerUserLimitReached { .. } => "DISCOUNT_PER_USER_LIMIT_REACHED",
        }
    }
}

/// Codes are compared case-insensitively and stored upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Evaluate a looked-up discount against an order amount at instant `now`.
///
/// Checks run in a fixed order and the first failure is returned: existence,
/// active flag, start date, end date, usage limit, minimum order amount.
pub fn evaluate(
    discount: Option<&Discount>,
    order_amount: &BigDecimal,
    now: DateTime<Utc>,
) -> Result<DiscountQuote, DiscountRejection> {
    let discount = discount.ok_or(DiscountRejection::NotFound)?;

    if !discount.is_active {
        return Err(DiscountRejection::Inactive);
    }
    if discount.start_date.is_some_and(|start| start > now) {
        return Err(DiscountRejection::NotStarted);
    }
    if discount.end_date.is_some_and(|end| end < now) {
        return Err(DiscountRejection::Expired);
    }
    if let Some(limit) = discount.usage_limit {
        if limit <= discount.used_count {
            return Err(DiscountRejection::UsageLimitReached);
        }
    }
    let minimum = discount
        .min_order_amount
        .clone()
        .unwrap_or_else(BigDecimal::zero);
    if *order_amount < minimum {
        return Err(DiscountRejection::BelowMinimumOrder { minimum });
    }

    Ok(DiscountQuote {
        discount_id: discount.id,
        code: discount.code.clone(),
        amount: compute_amount(discount, order_amount),
        remaining_uses: discount
            .usage_limit
            .map(|limit| limit - discount.used_count),
        per_user_limit: discount.per_user_limit,
    })
}

/// Enforce the per-customer limit once the customer's prior usages are known.
pub fn check_per_user_limit(
    per_user_limit: Option<i32>,
    used_by_user: i64,
) -> Result<(), DiscountRejection> {
    match per_user_limit {
        Some(limit) if used_by_user >= i64::from(limit) => {
            Err(DiscountRejection::PerUserLimitReached { limit })
        }
        _ => Ok(()),
    }
}

fn compute_amount(discount: &Discount, order_amount: &BigDecimal) -> BigDecimal {
    let mut amount = match discount.discount_type {
        DiscountType::Percentage => {
            round_money(&(order_amount * &discount.value / BigDecimal::from(100)))
        }
        DiscountType::FixedAmount => discount.value.clone(),
    };
    if let Some(cap) = &discount.max_discount_amount {
        if amount > *cap {
            amount = cap.clone();
        }
    }
    if amount > *order_amount {
        amount = order_amount.clone();
    }
    round_money(&amount)
}
