//! Key-value backends for ephemeral progress data.
//!
//! Everything stored through [`KeyValueStore`] carries an expiry, the store is
//! never the source of truth.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

mod error;
pub use error::{CacheError, CacheResult};

mod memory;
pub use memory::MemoryStore;

mod redis_store;
pub use redis_store::{DEFAULT_TIMEOUT, RedisStore};

/// String keyed store with scalar and set values and per-key expiry.
///
/// Every call is atomic on its own key; there are no multi-key transactions.
#[async_trait]
pub trait KeyValueStore: Debug + Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Overwrites `key` with a scalar and sets its expiry in one step.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Returns `true` when the member was not present before.
    async fn sadd(&self, key: &str, member: &str) -> CacheResult<bool>;

    /// Returns `true` when the member was present.
    async fn srem(&self, key: &str, member: &str) -> CacheResult<bool>;

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>>;

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool>;

    /// Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    async fn ping(&self) -> CacheResult<()>;
}
