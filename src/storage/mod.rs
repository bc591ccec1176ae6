//! Database and cache functionality

pub mod cache;
pub mod db;
pub mod stats;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
