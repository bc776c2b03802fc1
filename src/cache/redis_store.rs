use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{CacheError, CacheResult, KeyValueStore};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`KeyValueStore`] backed by a redis server.
///
/// One multiplexed connection is opened lazily and shared by every call. It
/// is dropped after a connection-level failure or a timeout and reopened by
/// the next call. Each call, including a reconnect, is bounded by `timeout`,
/// a timed out call surfaces as [`CacheError::TimeoutError`].
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
    timeout: Duration,
}

impl RedisStore {
    pub fn open(url: &str, timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            conn: Arc::new(Mutex::new(None)),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run<T, F, Fut>(&self, op: F) -> CacheResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut + Send,
        Fut: Future<Output = RedisResult<T>> + Send,
    {
        let call = async {
            let conn = self.connection().await?;
            op(conn).await
        };

        match timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    self.reset().await;
                }
                Err(e.into())
            }
            Err(_) => {
                self.reset().await;
                Err(CacheError::TimeoutError(self.timeout))
            }
        }
    }

    async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        let mut cached = self.conn.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        self.conn.lock().await.take();
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.run(|mut conn| async move { conn.get(key).await }).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let secs = ttl_secs(ttl).unsigned_abs();
        self.run(|mut conn| async move { conn.set_ex(key, value, secs).await })
            .await
    }

    async fn sadd(&self, key: &str, member: &str) -> CacheResult<bool> {
        let added: i64 = self
            .run(|mut conn| async move { conn.sadd(key, member).await })
            .await?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> CacheResult<bool> {
        let removed: i64 = self
            .run(|mut conn| async move { conn.srem(key, member).await })
            .await?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        self.run(|mut conn| async move { conn.smembers(key).await })
            .await
    }

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.run(|mut conn| async move { conn.sismember(key, member).await })
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let secs = ttl_secs(ttl);
        self.run(|mut conn| async move { conn.expire(key, secs).await })
            .await
    }

    async fn ping(&self) -> CacheResult<()> {
        let _pong: String = self
            .run(|mut conn| async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(())
    }
}

/// Whole seconds for SET EX and EXPIRE, at least 1. Redis takes a signed
/// 64-bit count, a zero or negative expiry would delete the key.
fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX)
}
