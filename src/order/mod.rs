pub mod models;
pub mod repository;
pub mod store;

pub use models::{Order, OrderSpec, OrderStatus};
pub use repository::OrderRepository;
pub use store::{InMemoryOrderStore, OrderStore, TerminalWrite};
