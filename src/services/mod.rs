pub mod isolation_service;

pub use isolation_service::{IsolationError, IsolationService};
