pub mod actor;
pub mod cart;
pub mod discounts;
pub mod orders;

use crate::application::cart_service::CartService;
use crate::application::checkout_service::CheckoutService;
use crate::application::discount_service::DiscountService;
use crate::application::order_service::OrderService;
use crate::infrastructure::DieselStore;

/// Services shared by every worker through `web::Data`.
pub struct AppState {
    pub carts: CartService<DieselStore>,
    pub checkout: CheckoutService<DieselStore>,
    pub discounts: DiscountService<DieselStore>,
    pub orders: OrderService<DieselStore>,
}

impl AppState {
    pub fn new(store: DieselStore) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            checkout: CheckoutService::new(store.clone()),
            discounts: DiscountService::new(store.clone()),
            orders: OrderService::new(store),
        }
    }
}
