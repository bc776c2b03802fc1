use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{CacheError, CacheResult, KeyValueStore};

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// How often a write also drops every expired key, not only the one it touches.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Instant,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            next_sweep: Instant::now() + SWEEP_INTERVAL,
        }
    }
}

impl Entries {
    /// Map for a write. Expired keys nobody reads again are dropped here,
    /// at most once per [`SWEEP_INTERVAL`].
    fn for_write(&mut self) -> &mut HashMap<String, Entry> {
        let now = Instant::now();
        if now >= self.next_sweep {
            let before = self.map.len();
            self.map.retain(|_, e| e.is_live(now));
            tracing::trace!("memory store sweep dropped {} keys", before - self.map.len());
            self.next_sweep = now + SWEEP_INTERVAL;
        }
        &mut self.map
    }
}

/// `None` (no expiry) when `ttl` is too far out for the clock to represent.
fn expiry_after(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

/// In-process [`KeyValueStore`] following redis semantics for the subset of
/// commands the tracker uses.
///
/// Expiry is measured with `tokio::time::Instant`, so paused test clocks
/// drive it. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Entries>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`CacheError::Unavailable`], the
    /// way an unreachable server would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.map.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> CacheResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable);
        }
        Ok(())
    }
}

/// Drops `key` if it has expired and returns what is left.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::WrongType {
        key: key.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries.map, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Scalar(v),
                ..
            }) => Ok(Some(v.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        entries.for_write().insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: expiry_after(ttl),
            },
        );
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let entries = entries.for_write();
        match live(entries, key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.insert(member.to_string())),
            Some(_) => Err(wrong_type(key)),
            None => {
                // a fresh set carries no expiry until one is set
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(BTreeSet::from([member.to_string()])),
                        expires_at: None,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn srem(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let entries = entries.for_write();
        let (removed, now_empty) = match live(entries, key) {
            None => return Ok(false),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => (members.remove(member), members.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };

        // redis deletes a set once its last member is gone
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries.map, key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries.map, key) {
            None => Ok(false),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.contains(member)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live(entries.for_write(), key) {
            None => Ok(false),
            Some(entry) => {
                entry.expires_at = expiry_after(ttl);
                Ok(true)
            }
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test]
    async fn scalar_set_and_get() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set_ex("k", "7", DAY).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("7"));

        store.set_ex("k", "8", DAY).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("8"));
    }

    #[tokio::test]
    async fn set_membership() {
        let store = MemoryStore::new();
        assert!(store.sadd("s", "1").await.unwrap());
        assert!(!store.sadd("s", "1").await.unwrap());
        assert!(store.sadd("s", "2").await.unwrap());
        assert!(store.sismember("s", "2").await.unwrap());
        assert_eq!(store.smembers("s").await.unwrap(), vec!["1", "2"]);

        assert!(store.srem("s", "1").await.unwrap());
        assert!(!store.srem("s", "1").await.unwrap());
        assert!(store.srem("s", "2").await.unwrap());

        // emptied sets disappear
        assert!(store.is_empty().await);
        assert!(!store.expire("s", DAY).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let store = MemoryStore::new();
        store.set_ex("k", "1", DAY).await.unwrap();
        let err = store.sadd("k", "1").await.unwrap_err();
        assert!(matches!(err, CacheError::WrongType { .. }));

        store.sadd("s", "1").await.unwrap();
        assert!(matches!(
            store.get("s").await.unwrap_err(),
            CacheError::WrongType { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store.set_ex("k", "1", Duration::from_secs(10)).await.unwrap();
        store.sadd("s", "1").await.unwrap();
        store.expire("s", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").await.unwrap().is_some());
        assert!(store.sismember("s", "1").await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.smembers("s").await.unwrap().is_empty());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expire_resets_window() {
        let store = MemoryStore::new();
        store.sadd("s", "1").await.unwrap();
        store.expire("s", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.expire("s", Duration::from_secs(10)).await.unwrap());

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.sismember("s", "1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn writes_sweep_keys_nobody_reads() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store
                .set_ex(&format!("k{i}"), "1", Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert_eq!(store.entries.lock().await.map.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.set_ex("fresh", "1", DAY).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.entries.lock().await.map.len(), 1);
    }

    #[tokio::test]
    async fn huge_ttl_does_not_overflow() {
        let store = MemoryStore::new();
        store.set_ex("k", "1", Duration::MAX).await.unwrap();
        store.sadd("s", "1").await.unwrap();
        assert!(store.expire("s", Duration::MAX).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1"));
        assert!(store.sismember("s", "1").await.unwrap());
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.get("k").await, Err(CacheError::Unavailable)));
        assert!(store.sadd("s", "1").await.is_err());
        assert!(store.ping().await.is_err());

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}
