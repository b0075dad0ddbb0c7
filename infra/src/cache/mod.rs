//! Cache module for Redis-based caching
//!
//! This module provides the Redis-backed fast-path cache for the OtpGate
//! application, including connection pooling, retry logic, and the cache
//! implementation the OTP core consumes.

pub mod otp_cache;
pub mod redis_client;

pub use otp_cache::RedisOtpCache;
pub use redis_client::RedisClient;

// Re-export commonly used types
pub use og_shared::config::cache::CacheConfig;
