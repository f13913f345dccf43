use bigdecimal::BigDecimal;
use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::domain::discount::{self, normalize_code, DiscountQuote};
use crate::domain::errors::DomainError;
use crate::domain::ports::DiscountRepository;

pub struct DiscountService<R> {
    repo: R,
}

impl<R: DiscountRepository> DiscountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Check `code` against `order_amount` at the current wall-clock time.
    pub fn validate(&self, code: &str, order_amount: &BigDecimal) -> Result<DiscountQuote, DomainError> {
        let code = normalize_code(code);
        let found = self.repo.find_by_code(&code)?;
        let quote = discount::evaluate(found.as_ref(), order_amount, Utc::now()).map_err(|rejection| {
            debug!("Discount code {} rejected: {}", code, rejection);
            rejection
        })?;
        Ok(quote)
    }

    /// `validate` plus the per-customer usage limit.
    pub fn quote_for_user(
        &self,
        code: &str,
        order_amount: &BigDecimal,
        user_id: Uuid,
    ) -> Result<DiscountQuote, DomainError> {
        let quote = self.validate(code, order_amount)?;
        // Early rejection only: `record_usage` repeats this check at commit
        // with the discount row locked.
        if quote.per_user_limit.is_some() {
            let used = self.repo.count_usages_by_user(quote.discount_id, user_id)?;
            discount::check_per_user_limit(quote.per_user_limit, used)?;
        }
        Ok(quote)
    }
}
