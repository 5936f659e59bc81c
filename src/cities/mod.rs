pub mod aggregate;
pub mod cache;
pub mod categories;
pub mod error;
pub mod fetch;
pub mod models;
pub mod search_info;
