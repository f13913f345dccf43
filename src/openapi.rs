use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{cart, discounts, orders};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fruit Store API",
        version = "0.1.0",
        description = "Cart, discount and checkout endpoints. The acting user is read from the `X-User-Id` header; `X-User-Role: admin` grants the admin transitions."
    ),
    paths(
        cart::view_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        discounts::validate_discount,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        orders::confirm_order,
        orders::deliver_order,
    ),
    components(schemas(
        cart::AddCartItemRequest,
        cart::UpdateCartItemRequest,
        cart::CartLineResponse,
        cart::CartResponse,
        discounts::DiscountQuoteResponse,
        orders::PlaceOrderRequest,
        orders::OrderLineResponse,
        orders::OrderResponse,
    )),
    tags(
        (name = "cart", description = "Cart maintenance"),
        (name = "discounts", description = "Discount code previews"),
        (name = "orders", description = "Checkout and order lifecycle"),
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi())
}
