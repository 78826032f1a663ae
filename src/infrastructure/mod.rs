pub mod persistence;
pub mod repositories;

pub use persistence::SqlitePriceRepository;
pub use repositories::InMemoryPriceRepository;
