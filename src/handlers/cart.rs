use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::cart_service::CartView;
use crate::domain::money::format_money;
use crate::domain::user::Actor;
use crate::errors::AppError;

use super::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    /// New quantity; 0 removes the line.
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Current catalog price, e.g. "9.99"
    pub unit_price: String,
    pub line_total: String,
    pub product_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total: String,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        CartResponse {
            total: format_money(&view.total),
            lines: view
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    line_total: format_money(&l.line_total()),
                    unit_price: format_money(&l.unit_price),
                    product_id: l.product_id,
                    product_name: l.product_name,
                    quantity: l.quantity,
                    product_active: l.product_active,
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    params(("X-User-Id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 200, description = "Current cart with live prices", body = CartResponse),
        (status = 400, description = "Missing actor"),
    ),
    tag = "cart"
)]
pub async fn view_cart(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    let view = web::block(move || state.carts.view(actor.user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(view)))
}

/// POST /cart/items
///
/// Adds to the existing line's quantity when the product is already in the cart.
#[utoipa::path(
    post,
    path = "/cart/items",
    params(("X-User-Id" = Uuid, Header, description = "Acting user")),
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Item added", body = CartResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product inactive or out of stock"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let view = web::block(move || {
        state
            .carts
            .add_item(actor.user_id, body.product_id, body.quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(view)))
}

/// PUT /cart/items/{product_id}
#[utoipa::path(
    put,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-User-Id" = Uuid, Header, description = "Acting user"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = CartResponse),
        (status = 400, description = "Negative quantity"),
        (status = 409, description = "Product inactive or out of stock"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let quantity = body.into_inner().quantity;

    let view = web::block(move || {
        state
            .carts
            .update_quantity(actor.user_id, product_id, quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(view)))
}

/// DELETE /cart/items/{product_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-User-Id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Line removed", body = CartResponse),
        (status = 400, description = "Product not in cart"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let view = web::block(move || state.carts.remove_item(actor.user_id, product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(view)))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::cart::CartLineSnapshot;

    #[test]
    fn cart_response_formats_money_with_two_decimals() {
        let view = CartView {
            lines: vec![CartLineSnapshot {
                product_id: Uuid::new_v4(),
                product_name: "Rambutan".to_string(),
                quantity: 3,
                unit_price: BigDecimal::from_str("2.5").expect("decimal"),
                product_active: true,
            }],
            total: BigDecimal::from_str("7.5").expect("decimal"),
        };
        let resp = CartResponse::from(view);
        assert_eq!(resp.total, "7.50");
        assert_eq!(resp.lines[0].unit_price, "2.50");
        assert_eq!(resp.lines[0].line_total, "7.50");
    }
}
