pub mod executor;
pub mod manager;

pub use executor::SchemaExecutor;
pub use manager::{DatabaseError, DatabaseManager};
