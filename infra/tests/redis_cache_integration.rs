//! Integration tests for the Redis-backed OTP cache
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p og_infra --test redis_cache_integration -- --ignored

use chrono::{Duration, Utc};

use og_core::domain::entities::otp_record::{Payload, Purpose, RecordView};
use og_core::services::otp::OtpCache;
use og_infra::cache::{CacheConfig, RedisClient, RedisOtpCache};

async fn connect() -> RedisOtpCache {
    let config = CacheConfig {
        url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        ..Default::default()
    };

    let client = RedisClient::new(config).await.expect("Failed to connect to Redis");
    RedisOtpCache::new(client)
}

fn view(code: &str) -> RecordView {
    RecordView {
        code: code.to_string(),
        expires_at: Utc::now() + Duration::minutes(10),
        attempt_count: 0,
        payload: Payload::None,
    }
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_record_view_round_trip() {
    let cache = connect().await;
    let identifier = "it-view@otpgate.test";

    cache
        .put_record(identifier, Purpose::Login, &view("4821"), 60)
        .await
        .unwrap();

    let cached = cache.get_record(identifier, Purpose::Login).await.unwrap().unwrap();
    assert_eq!(cached.code, "4821");
    assert_eq!(cached.attempt_count, 0);

    cache.invalidate_record(identifier, Purpose::Login).await.unwrap();
    assert!(cache.get_record(identifier, Purpose::Login).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_attempt_increment_preserves_view() {
    let cache = connect().await;
    let identifier = "it-attempts@otpgate.test";

    cache
        .put_record(identifier, Purpose::Register, &view("1234"), 60)
        .await
        .unwrap();

    assert_eq!(
        cache.increment_attempts(identifier, Purpose::Register).await.unwrap(),
        Some(1)
    );
    assert_eq!(
        cache.increment_attempts(identifier, Purpose::Register).await.unwrap(),
        Some(2)
    );

    let cached = cache.get_record(identifier, Purpose::Register).await.unwrap().unwrap();
    assert_eq!(cached.attempt_count, 2);
    assert_eq!(cached.code, "1234");

    cache.invalidate_record(identifier, Purpose::Register).await.unwrap();
    assert_eq!(
        cache.increment_attempts(identifier, Purpose::Register).await.unwrap(),
        None
    );
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_issuance_counter_lifecycle() {
    let cache = connect().await;
    let identifier = "it-rate@otpgate.test";

    // absent counter signals recompute
    assert_eq!(cache.increment_issuance_count(identifier).await.unwrap(), None);

    cache.put_issuance_count(identifier, 2, 60).await.unwrap();
    assert_eq!(cache.get_issuance_count(identifier).await.unwrap(), Some(2));
    assert_eq!(cache.increment_issuance_count(identifier).await.unwrap(), Some(3));
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_issuance_lock_is_mutually_exclusive() {
    let cache = connect().await;
    let identifier = "it-lock@otpgate.test";

    assert!(cache
        .acquire_issuance_lock(identifier, Purpose::Login, 30)
        .await
        .unwrap());
    // a second acquisition while held must fail
    assert!(!cache
        .acquire_issuance_lock(identifier, Purpose::Login, 30)
        .await
        .unwrap());
    // a different purpose is a different lock
    assert!(cache
        .acquire_issuance_lock(identifier, Purpose::Register, 30)
        .await
        .unwrap());

    cache.release_issuance_lock(identifier, Purpose::Login).await.unwrap();
    assert!(cache
        .acquire_issuance_lock(identifier, Purpose::Login, 30)
        .await
        .unwrap());

    cache.release_issuance_lock(identifier, Purpose::Login).await.unwrap();
    cache.release_issuance_lock(identifier, Purpose::Register).await.unwrap();
}
