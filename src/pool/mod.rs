pub mod config;
pub mod manager;

pub use manager::DbPool;
