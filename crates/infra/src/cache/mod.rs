//! External cache tier adapters

pub mod redis_store;

pub use redis_store::RedisCacheStore;
