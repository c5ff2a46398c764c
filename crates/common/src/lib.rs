pub mod balance_api;
pub mod config;
pub mod observability;
pub mod types;
