pub mod api;
pub mod builder;
pub mod metadata;
pub mod metrics;
pub mod pagination;
pub mod roster;
pub mod scheduler;
pub mod session;
