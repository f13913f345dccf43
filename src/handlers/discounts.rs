use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::money::{format_money, parse_money};
use crate::errors::AppError;

use super::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidateDiscountParams {
    /// Discount code, matched case-insensitively.
    pub code: String,
    /// Order amount the code would apply to, e.g. "100000".
    pub amount: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountQuoteResponse {
    pub discount_id: Uuid,
    pub code: String,
    pub order_amount: String,
    pub discount_amount: String,
    pub final_amount: String,
    /// Absent when the code has no usage limit.
    pub remaining_uses: Option<i32>,
}

/// GET /discounts/validate
///
/// Preview of what a code is worth against an amount. Nothing is consumed.
#[utoipa::path(
    get,
    path = "/discounts/validate",
    params(ValidateDiscountParams),
    responses(
        (status = 200, description = "Code is applicable", body = DiscountQuoteResponse),
        (status = 400, description = "Malformed amount"),
        (status = 404, description = "Unknown code"),
        (status = 422, description = "Code rejected for this amount or date"),
    ),
    tag = "discounts"
)]
pub async fn validate_discount(
    state: web::Data<AppState>,
    query: web::Query<ValidateDiscountParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let amount = parse_money(&params.amount)?;

    let (quote, amount) = web::block(move || {
        state
            .discounts
            .validate(&params.code, &amount)
            .map(|quote| (quote, amount))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(DiscountQuoteResponse {
        discount_id: quote.discount_id,
        final_amount: format_money(&(&amount - &quote.amount)),
        order_amount: format_money(&amount),
        discount_amount: format_money(&quote.amount),
        code: quote.code,
        remaining_uses: quote.remaining_uses,
    }))
}
