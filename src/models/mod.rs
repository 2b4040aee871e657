pub mod order;
pub mod order_item;
pub mod product;

pub use order::{NewOrder, Order, OrderView};
pub use order_item::{NewOrderItem, OrderItem};
pub use product::{NewProduct, Product, ProductPatch};
