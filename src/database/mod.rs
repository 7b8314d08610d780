pub mod connection;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use connection::*;
pub use memory::{InMemoryRestaurantStore, InMemorySessionRepository, demo_restaurant};
pub use postgres::{PgRestaurantStore, PgSessionRepository};
pub use repository::*;
