pub mod cart_repo;
pub mod discount_repo;
pub mod inventory_ledger;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod store;

pub use store::DieselStore;
