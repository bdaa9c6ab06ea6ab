pub mod catalog;
pub mod models;
pub mod repository;
pub mod store;

pub use catalog::ProductCatalog;
pub use models::{Product, StockRow, StockSnapshot};
pub use repository::StockRepository;
pub use store::{InMemoryStockStore, StockStore};
