pub mod admin;
pub mod data;
