pub mod cart;
pub mod discount;
pub mod errors;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;
pub mod user;
