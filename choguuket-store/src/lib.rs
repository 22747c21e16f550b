pub mod app_config;
pub mod database;
pub mod trip_repo;
pub mod memory;
pub mod cache;
pub mod redis_repo;

pub use cache::MemorySearchCache;
pub use database::Database;
pub use memory::MemoryTripStore;
pub use redis_repo::RedisSearchCache;
pub use trip_repo::PgTripStore;
