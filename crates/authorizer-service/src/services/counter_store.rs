//! Named counter storage.
//!
//! A single integer record behind the `/v1/like` routes. The Redis store
//! keeps it under one key; a missing key reads as zero.
//!
//! # Connection Pattern
//!
//! `MultiplexedConnection` is cheap to clone and safe to use concurrently.
//! It is established on first use so the authorizer can start and serve
//! decisions while Redis is still coming up.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, instrument};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CounterStoreError {
    #[error("Counter store connection failed: {0}")]
    Connection(String),

    #[error("Counter store command failed: {0}")]
    Command(String),
}

/// Read and adjust the counter.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value; zero when the counter has never been written.
    async fn read(&self) -> Result<i64, CounterStoreError>;

    /// Add `delta` (may be negative) and return the new value.
    async fn increment(&self, delta: i64) -> Result<i64, CounterStoreError>;
}

/// Redis-backed counter (`GET` / `INCRBY` on one key).
pub struct RedisCounterStore {
    client: Client,
    connection: OnceCell<MultiplexedConnection>,
    key: String,
}

impl RedisCounterStore {
    /// Create a store. The URL is validated now; the connection is made on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns `CounterStoreError::Connection` if the URL is invalid.
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, CounterStoreError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Do not log the URL; it may carry credentials
            error!(target: "authorizer.counter", error = %e, "Failed to open Redis client");
            CounterStoreError::Connection(format!("Failed to open Redis client: {e}"))
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            key: key.into(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CounterStoreError> {
        self.connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| {
                        error!(target: "authorizer.counter", error = %e, "Failed to connect to Redis");
                        CounterStoreError::Connection(format!("Failed to connect to Redis: {e}"))
                    })
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    #[instrument(skip_all, fields(key = %self.key))]
    async fn read(&self) -> Result<i64, CounterStoreError> {
        let mut conn = self.connection().await?;

        let value: Option<i64> = conn.get(&self.key).await.map_err(|e| {
            error!(target: "authorizer.counter", error = %e, "Failed to read counter");
            CounterStoreError::Command(format!("GET failed: {e}"))
        })?;

        Ok(value.unwrap_or(0))
    }

    #[instrument(skip_all, fields(key = %self.key, delta = delta))]
    async fn increment(&self, delta: i64) -> Result<i64, CounterStoreError> {
        let mut conn = self.connection().await?;

        conn.incr(&self.key, delta).await.map_err(|e| {
            error!(target: "authorizer.counter", error = %e, "Failed to increment counter");
            CounterStoreError::Command(format!("INCRBY failed: {e}"))
        })
    }
}

pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    /// In-memory counter for tests.
    #[derive(Default)]
    pub struct MockCounterStore {
        value: AtomicI64,
        failing: AtomicBool,
        call_count: AtomicUsize,
    }

    impl MockCounterStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_value(value: i64) -> Self {
            Self {
                value: AtomicI64::new(value),
                ..Self::default()
            }
        }

        /// A store whose every call fails.
        pub fn failing() -> Self {
            Self {
                failing: AtomicBool::new(true),
                ..Self::default()
            }
        }

        pub fn value(&self) -> i64 {
            self.value.load(Ordering::SeqCst)
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<(), CounterStoreError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(CounterStoreError::Connection("mock store unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CounterStore for MockCounterStore {
        async fn read(&self) -> Result<i64, CounterStoreError> {
            self.check()?;
            Ok(self.value())
        }

        async fn increment(&self, delta: i64) -> Result<i64, CounterStoreError> {
            self.check()?;
            Ok(self.value.fetch_add(delta, Ordering::SeqCst) + delta)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockCounterStore;
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_up_and_down() {
        let store = MockCounterStore::new();

        assert_eq!(store.read().await.unwrap(), 0);
        assert_eq!(store.increment(1).await.unwrap(), 1);
        assert_eq!(store.increment(1).await.unwrap(), 2);
        assert_eq!(store.increment(-1).await.unwrap(), 1);
        assert_eq!(store.read().await.unwrap(), 1);
        assert_eq!(store.call_count(), 5);
    }

    #[tokio::test]
    async fn test_mock_may_go_negative() {
        let store = MockCounterStore::new();
        assert_eq!(store.increment(-1).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let store = MockCounterStore::failing();
        assert!(matches!(store.read().await, Err(CounterStoreError::Connection(_))));
        assert!(store.increment(1).await.is_err());
    }

    #[test]
    fn test_invalid_redis_url_rejected() {
        let result = RedisCounterStore::new("not-a-url", "like");
        assert!(matches!(result, Err(CounterStoreError::Connection(_))));
    }

    #[test]
    fn test_valid_redis_url_does_not_connect() {
        // Port 1 is never listening; construction must still succeed
        assert!(RedisCounterStore::new("redis://127.0.0.1:1", "like").is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_connection_error() {
        let store = RedisCounterStore::new("redis://127.0.0.1:1", "like").unwrap();
        assert!(matches!(store.read().await, Err(CounterStoreError::Connection(_))));
    }
}
