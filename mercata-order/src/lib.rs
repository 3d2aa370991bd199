pub mod models;
pub mod lifecycle;
pub mod repository;
pub mod coordinator;
pub mod service;

pub use models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
pub use lifecycle::{next_inventory_action, InventoryAction};
pub use repository::{AdminOrderFilter, OrderPage, OrderRepoError, OrderRepository};
pub use coordinator::PaymentCoordinator;
pub use service::{OrderError, OrderService, PlaceOrderRequest, ShippingPolicy, StatusChange};
