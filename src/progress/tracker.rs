use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::keys::{ProgressKeys, encode_module};
use super::{CourseId, ModuleId, UserId};
use crate::cache::{CacheError, CacheResult, KeyValueStore};

/// How long a scope survives without writes.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything the read API shows for one (user, course) scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub last_module: Option<ModuleId>,
    pub completed_modules: BTreeSet<ModuleId>,
    pub percentage: u8,
    pub total_modules: i64,
}

/// `floor(100 * completed / total)`, 0 for a non-positive total, never above 100.
pub fn completion_percentage(completed: usize, total_modules: i64) -> u8 {
    if total_modules <= 0 {
        return 0;
    }
    let completed = i64::try_from(completed).unwrap_or(i64::MAX);
    let pct = completed.saturating_mul(100) / total_modules;
    pct.clamp(0, 100) as u8
}

/// Per (user, course) progress kept in a [`KeyValueStore`].
///
/// Public operations never fail: store errors are logged and turned into
/// "no data" for reads and `false` for writes. The `try_*` variants expose the
/// underlying [`CacheResult`] for callers that need to tell the two apart.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    store: Arc<dyn KeyValueStore>,
    keys: ProgressKeys,
    retention: Duration,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            keys: ProgressKeys::default(),
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_keys(mut self, keys: ProgressKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    #[inline]
    pub fn keys(&self) -> &ProgressKeys {
        &self.keys
    }

    #[inline]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub async fn try_set_last_module(
        &self,
        user: UserId,
        course: CourseId,
        module: ModuleId,
    ) -> CacheResult<()> {
        let key = self.keys.last_module(user, course);
        debug!("setting {key} = {module}");
        self.store
            .set_ex(&key, &encode_module(module), self.retention)
            .await
    }

    pub async fn try_get_last_module(
        &self,
        user: UserId,
        course: CourseId,
    ) -> CacheResult<Option<ModuleId>> {
        let key = self.keys.last_module(user, course);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        raw.parse::<ModuleId>()
            .map(Some)
            .map_err(|_| CacheError::Malformed { key, value: raw })
    }

    pub async fn try_mark_module_completed(
        &self,
        user: UserId,
        course: CourseId,
        module: ModuleId,
        completed: bool,
    ) -> CacheResult<()> {
        let key = self.keys.completed(user, course);
        let member = encode_module(module);
        let changed = if completed {
            self.store.sadd(&key, &member).await?
        } else {
            self.store.srem(&key, &member).await?
        };
        debug!("{key}: module {module} completed={completed}, changed={changed}");

        self.store.expire(&key, self.retention).await?;
        Ok(())
    }

    pub async fn try_is_module_completed(
        &self,
        user: UserId,
        course: CourseId,
        module: ModuleId,
    ) -> CacheResult<bool> {
        let key = self.keys.completed(user, course);
        self.store.sismember(&key, &encode_module(module)).await
    }

    /// Members that do not parse as module ids are skipped.
    pub async fn try_get_completed_modules(
        &self,
        user: UserId,
        course: CourseId,
    ) -> CacheResult<BTreeSet<ModuleId>> {
        let key = self.keys.completed(user, course);
        let members = self.store.smembers(&key).await?;

        Ok(members
            .into_iter()
            .filter_map(|m| match m.parse::<ModuleId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("skipping malformed member {m:?} of {key}");
                    None
                }
            })
            .collect())
    }

    pub async fn set_last_module(&self, user: UserId, course: CourseId, module: ModuleId) -> bool {
        let result = self.try_set_last_module(user, course, module).await;
        settle("set_last_module", user, course, result.map(|_| true), false)
    }

    pub async fn get_last_module(&self, user: UserId, course: CourseId) -> Option<ModuleId> {
        let result = self.try_get_last_module(user, course).await;
        settle("get_last_module", user, course, result, None)
    }

    pub async fn mark_module_completed(
        &self,
        user: UserId,
        course: CourseId,
        module: ModuleId,
        completed: bool,
    ) -> bool {
        let result = self
            .try_mark_module_completed(user, course, module, completed)
            .await;
        settle(
            "mark_module_completed",
            user,
            course,
            result.map(|_| true),
            false,
        )
    }

    pub async fn is_module_completed(
        &self,
        user: UserId,
        course: CourseId,
        module: ModuleId,
    ) -> bool {
        let result = self.try_is_module_completed(user, course, module).await;
        settle("is_module_completed", user, course, result, false)
    }

    pub async fn get_completed_modules(&self, user: UserId, course: CourseId) -> BTreeSet<ModuleId> {
        let result = self.try_get_completed_modules(user, course).await;
        settle("get_completed_modules", user, course, result, BTreeSet::new())
    }

    pub async fn get_course_progress_percentage(
        &self,
        user: UserId,
        course: CourseId,
        total_modules: i64,
    ) -> u8 {
        if total_modules <= 0 {
            return 0;
        }
        let completed = self.get_completed_modules(user, course).await;
        let pct = completion_percentage(completed.len(), total_modules);
        debug!(
            "progress user={user} course={course}: {}/{total_modules} = {pct}%",
            completed.len()
        );
        pct
    }

    /// Last module, completed set and percentage, reading the set only once.
    pub async fn snapshot(
        &self,
        user: UserId,
        course: CourseId,
        total_modules: i64,
    ) -> ProgressSnapshot {
        let last_module = self.get_last_module(user, course).await;
        let completed_modules = self.get_completed_modules(user, course).await;
        let percentage = completion_percentage(completed_modules.len(), total_modules);

        ProgressSnapshot {
            last_module,
            completed_modules,
            percentage,
            total_modules,
        }
    }

    pub async fn ping(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("progress store ping failed: {e}");
                false
            }
        }
    }
}

/// The one place store failures are turned into defaults.
fn settle<T>(op: &'static str, user: UserId, course: CourseId, result: CacheResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(op, %user, %course, "progress store call failed: {e}");
            fallback
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::MemoryStore;

    fn ids(user: i64, course: i64) -> (UserId, CourseId) {
        (UserId::new(user), CourseId::new(course))
    }

    fn tracker() -> (MemoryStore, ProgressTracker) {
        let store = MemoryStore::new();
        let tracker = ProgressTracker::new(Arc::new(store.clone()));
        (store, tracker)
    }

    #[test]
    fn percentage_floors() {
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 66);
        assert_eq!(completion_percentage(3, 3), 100);
        assert_eq!(completion_percentage(0, 5), 0);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(completion_percentage(4, 0), 0);
        assert_eq!(completion_percentage(4, -2), 0);
    }

    #[test]
    fn percentage_is_capped() {
        assert_eq!(completion_percentage(5, 3), 100);
    }

    #[tokio::test]
    async fn last_module_round_trip() {
        let (_, tracker) = tracker();
        let (u, c) = ids(1, 2);

        assert_eq!(tracker.get_last_module(u, c).await, None);
        assert!(tracker.set_last_module(u, c, ModuleId::new(7)).await);
        assert_eq!(tracker.get_last_module(u, c).await, Some(ModuleId::new(7)));
    }

    #[tokio::test]
    async fn scenario_user_1_course_3() {
        let (_, tracker) = tracker();
        let (u, c) = ids(1, 3);
        let m = ModuleId::new(6);

        assert!(tracker.set_last_module(u, c, m).await);
        assert_eq!(tracker.get_last_module(u, c).await, Some(m));

        assert!(tracker.mark_module_completed(u, c, m, true).await);
        assert_eq!(tracker.get_completed_modules(u, c).await, BTreeSet::from([m]));
        assert!(tracker.is_module_completed(u, c, m).await);
    }

    #[tokio::test]
    async fn completion_toggles() {
        let (_, tracker) = tracker();
        let (u, c) = ids(4, 9);
        let m = ModuleId::new(11);

        tracker.mark_module_completed(u, c, m, true).await;
        assert!(tracker.is_module_completed(u, c, m).await);

        tracker.mark_module_completed(u, c, m, false).await;
        assert!(!tracker.is_module_completed(u, c, m).await);
        assert!(tracker.get_completed_modules(u, c).await.is_empty());

        // removing an absent module is fine
        assert!(tracker.mark_module_completed(u, c, m, false).await);
    }

    #[tokio::test]
    async fn marking_twice_is_idempotent() {
        let (_, tracker) = tracker();
        let (u, c) = ids(2, 2);

        tracker.mark_module_completed(u, c, ModuleId::new(1), true).await;
        let once = tracker.get_completed_modules(u, c).await;
        tracker.mark_module_completed(u, c, ModuleId::new(1), true).await;
        assert_eq!(tracker.get_completed_modules(u, c).await, once);
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let (_, tracker) = tracker();
        tracker
            .mark_module_completed(UserId::new(1), CourseId::new(1), ModuleId::new(5), true)
            .await;

        assert!(
            !tracker
                .is_module_completed(UserId::new(2), CourseId::new(1), ModuleId::new(5))
                .await
        );
        assert!(
            !tracker
                .is_module_completed(UserId::new(1), CourseId::new(2), ModuleId::new(5))
                .await
        );
    }

    #[tokio::test]
    async fn course_percentage() {
        let (_, tracker) = tracker();
        let (u, c) = ids(1, 1);
        tracker.mark_module_completed(u, c, ModuleId::new(10), true).await;

        assert_eq!(tracker.get_course_progress_percentage(u, c, 3).await, 33);
        assert_eq!(tracker.get_course_progress_percentage(u, c, 0).await, 0);

        tracker.mark_module_completed(u, c, ModuleId::new(11), true).await;
        tracker.mark_module_completed(u, c, ModuleId::new(12), true).await;
        assert_eq!(tracker.get_course_progress_percentage(u, c, 3).await, 100);
    }

    #[tokio::test]
    async fn snapshot_collects_scope() {
        let (_, tracker) = tracker();
        let (u, c) = ids(8, 1);
        tracker.set_last_module(u, c, ModuleId::new(2)).await;
        tracker.mark_module_completed(u, c, ModuleId::new(1), true).await;

        let snap = tracker.snapshot(u, c, 4).await;
        assert_eq!(snap.last_module, Some(ModuleId::new(2)));
        assert_eq!(snap.completed_modules, BTreeSet::from([ModuleId::new(1)]));
        assert_eq!(snap.percentage, 25);
        assert_eq!(snap.total_modules, 4);
    }

    #[tokio::test]
    async fn unavailable_store_degrades() {
        let (store, tracker) = tracker();
        let (u, c) = ids(1, 3);
        tracker.set_last_module(u, c, ModuleId::new(6)).await;
        tracker.mark_module_completed(u, c, ModuleId::new(6), true).await;

        store.set_offline(true);

        assert!(!tracker.set_last_module(u, c, ModuleId::new(7)).await);
        assert!(!tracker.mark_module_completed(u, c, ModuleId::new(7), true).await);
        assert_eq!(tracker.get_last_module(u, c).await, None);
        assert!(!tracker.is_module_completed(u, c, ModuleId::new(6)).await);
        assert!(tracker.get_completed_modules(u, c).await.is_empty());
        assert_eq!(tracker.get_course_progress_percentage(u, c, 3).await, 0);
        assert!(!tracker.ping().await);

        let err = tracker.try_get_last_module(u, c).await.unwrap_err();
        assert!(err.is_unavailable());

        store.set_offline(false);
        assert_eq!(tracker.get_last_module(u, c).await, Some(ModuleId::new(6)));
    }

    #[tokio::test]
    async fn malformed_values_read_as_absent() {
        let (store, tracker) = tracker();
        let (u, c) = ids(1, 1);
        let keys = tracker.keys().clone();

        store
            .set_ex(&keys.last_module(u, c), "not-a-number", DEFAULT_RETENTION)
            .await
            .unwrap();
        assert_eq!(tracker.get_last_module(u, c).await, None);
        assert!(matches!(
            tracker.try_get_last_module(u, c).await,
            Err(CacheError::Malformed { .. })
        ));

        store.sadd(&keys.completed(u, c), "3").await.unwrap();
        store.sadd(&keys.completed(u, c), "three").await.unwrap();
        assert_eq!(
            tracker.get_completed_modules(u, c).await,
            BTreeSet::from([ModuleId::new(3)])
        );
    }

    #[tokio::test]
    async fn writes_use_the_documented_keys() {
        let (store, tracker) = tracker();
        let (u, c) = ids(1, 3);
        tracker.set_last_module(u, c, ModuleId::new(6)).await;
        tracker.mark_module_completed(u, c, ModuleId::new(6), true).await;

        assert_eq!(
            store.get("educa:user:1:course:3:last_module").await.unwrap().as_deref(),
            Some("6")
        );
        assert!(
            store
                .sismember("educa:user:1:course:3:completed", "6")
                .await
                .unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scope_expires_after_retention() {
        let (_, tracker) = tracker();
        let tracker = tracker.with_retention(Duration::from_secs(60));
        let (u, c) = ids(1, 1);

        tracker.set_last_module(u, c, ModuleId::new(1)).await;
        tracker.mark_module_completed(u, c, ModuleId::new(1), true).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(tracker.get_last_module(u, c).await, None);
        assert!(tracker.get_completed_modules(u, c).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn writes_refresh_retention() {
        let (_, tracker) = tracker();
        let tracker = tracker.with_retention(Duration::from_secs(60));
        let (u, c) = ids(1, 1);

        tracker.mark_module_completed(u, c, ModuleId::new(1), true).await;
        tokio::time::advance(Duration::from_secs(45)).await;

        // unmarking another module still refreshes the whole set
        tracker.mark_module_completed(u, c, ModuleId::new(2), false).await;
        tokio::time::advance(Duration::from_secs(45)).await;

        assert!(tracker.is_module_completed(u, c, ModuleId::new(1)).await);
    }
}
