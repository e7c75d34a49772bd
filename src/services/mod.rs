pub mod cart_service;
pub mod order_service;

pub use cart_service::CartService;
pub use order_service::OrderService;
