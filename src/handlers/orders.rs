use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::checkout_service::CheckoutRequest;
use crate::domain::money::format_money;
use crate::domain::order::{ContactInfo, Order};
use crate::domain::user::Actor;
use crate::errors::AppError;

use super::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub shipping_address: String,
    pub phone: Option<String>,
    /// Defaults to the account's full name.
    pub customer_name: Option<String>,
    /// Defaults to the account's email.
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub discount_code: Option<String>,
}

impl From<PlaceOrderRequest> for CheckoutRequest {
    fn from(body: PlaceOrderRequest) -> Self {
        CheckoutRequest {
            shipping_address: body.shipping_address,
            contact: ContactInfo {
                phone: body.phone,
                customer_name: body.customer_name,
                customer_email: body.customer_email,
                notes: body.notes,
            },
            discount_code: body.discount_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Price frozen at checkout, e.g. "9.99"
    pub unit_price: String,
    pub subtotal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub subtotal: String,
    pub discount_amount: String,
    pub total_amount: String,
    pub discount_code: Option<String>,
    pub shipping_address: String,
    pub phone: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub confirmed_at: Option<String>,
    pub shipped_at: Option<String>,
    pub delivered_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub lines: Vec<OrderLineResponse>,
}

fn rfc3339(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|t| t.to_rfc3339())
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            order_number: o.order_number,
            user_id: o.user_id,
            status: o.status.to_string(),
            subtotal: format_money(&o.subtotal),
            discount_amount: format_money(&o.discount_amount),
            total_amount: format_money(&o.total_amount),
            discount_code: o.discount.map(|d| d.code),
            shipping_address: o.shipping_address,
            phone: o.contact.phone,
            customer_name: o.contact.customer_name,
            customer_email: o.contact.customer_email,
            notes: o.contact.notes,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            confirmed_at: rfc3339(o.confirmed_at),
            shipped_at: rfc3339(o.shipped_at),
            delivered_at: rfc3339(o.delivered_at),
            cancelled_at: rfc3339(o.cancelled_at),
            lines: o
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    id: l.id,
                    line_no: l.line_no,
                    product_id: l.product_id,
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: format_money(&l.unit_price),
                    subtotal: format_money(&l.subtotal),
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checks out the caller's cart. Stock reservation, the order and its lines,
/// discount usage, cart clearing and the `OrderPlaced` outbox event commit in
/// a single database transaction.
#[utoipa::path(
    post,
    path = "/orders",
    params(("X-User-Id" = Uuid, Header, description = "Acting user")),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Empty cart or invalid input"),
        (status = 404, description = "Product or discount not found"),
        (status = 409, description = "Insufficient stock or inactive product"),
        (status = 422, description = "Discount rejected or non-positive total"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = CheckoutRequest::from(body.into_inner());

    let order = web::block(move || state.checkout.place_order(actor.user_id, request))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(("X-User-Id" = Uuid, Header, description = "Acting user")),
    responses(
        (status = 200, description = "Orders of the caller", body = [OrderResponse]),
        (status = 400, description = "Missing actor"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || state.orders.list_orders(actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let items: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.get_order(order_id, actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
///
/// Owner or admin. Releases the reserved stock; discount usage is kept.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.checkout.cancel_order(order_id, actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/confirm
#[utoipa::path(
    post,
    path = "/orders/{id}/confirm",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Acting user"),
        ("X-User-Role" = String, Header, description = "Must be `admin`"),
    ),
    responses(
        (status = 200, description = "Order confirmed", body = OrderResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not pending"),
    ),
    tag = "orders"
)]
pub async fn confirm_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.confirm_order(order_id, actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/deliver
///
/// Ships and delivers a confirmed order in one step.
#[utoipa::path(
    post,
    path = "/orders/{id}/deliver",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Acting user"),
        ("X-User-Role" = String, Header, description = "Must be `admin`"),
    ),
    responses(
        (status = 200, description = "Order delivered", body = OrderResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not confirmed"),
    ),
    tag = "orders"
)]
pub async fn deliver_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.deliver_order(order_id, actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
