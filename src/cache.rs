//! Per-session statement caching
//!
//! Each pooled session owns one [`StatementCache`]: a map from query text to
//! an opaque prepared-statement handle, valid only for that session's
//! physical connection. The pool never looks inside it; it only guarantees
//! that the cache survives idle/active round trips of its session and dies
//! with it.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

/// Map from query text to a prepared-statement handle `S`.
///
/// Backed by a concurrent map so the extended-checkout handle can read and
/// write it without going through the pool lock.
pub struct StatementCache<S> {
    entries: DashMap<String, S>,
}

impl<S: Send + Sync + 'static> StatementCache<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cache a prepared statement under its query text, replacing and
    /// returning any previous entry for the same text.
    pub fn insert(&self, sql: impl Into<String>, statement: S) -> Option<S> {
        self.entries.insert(sql.into(), statement)
    }

    /// Remove and return the cached statement for `sql`, if any. Callers
    /// that need the handle by value take it out and put it back after use.
    pub fn take(&self, sql: &str) -> Option<S> {
        self.entries.remove(sql).map(|(_, statement)| statement)
    }

    /// Run `f` against the cached statement for `sql` without removing it.
    pub fn with<R>(&self, sql: &str, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.entries.get(sql).map(|entry| f(entry.value()))
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.entries.contains_key(sql)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached statement. The session itself is unaffected.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Stable reference to one session's statement cache, obtained through
/// [`SessionPool::checkout_with_cache`](crate::SessionPool::checkout_with_cache).
///
/// The handle stays tied to the physical connection it was issued for. Once
/// the pool destroys that session (dead-session purge or idle eviction) the
/// cache is gone and every operation here reports absence; cached statement
/// handles must not be used past that point.
pub struct StatementCacheHandle<S> {
    cache: Weak<StatementCache<S>>,
}

impl<S: Send + Sync + 'static> StatementCacheHandle<S> {
    pub(crate) fn new(cache: &Arc<StatementCache<S>>) -> Self {
        Self {
            cache: Arc::downgrade(cache),
        }
    }

    /// Whether the owning session still exists.
    pub fn is_valid(&self) -> bool {
        self.cache.strong_count() > 0
    }

    /// Insert a statement; returns `false` if the session is gone.
    pub fn insert(&self, sql: impl Into<String>, statement: S) -> bool {
        match self.cache.upgrade() {
            Some(cache) => {
                cache.insert(sql, statement);
                true
            }
            None => false,
        }
    }

    pub fn take(&self, sql: &str) -> Option<S> {
        self.cache.upgrade()?.take(sql)
    }

    pub fn with<R>(&self, sql: &str, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.cache.upgrade()?.with(sql, f)
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.cache
            .upgrade()
            .is_some_and(|cache| cache.contains(sql))
    }

    pub fn len(&self) -> usize {
        self.cache.upgrade().map_or(0, |cache| cache.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Clone for StatementCacheHandle<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Weak::clone(&self.cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_take_round_trip() {
        let cache: StatementCache<u64> = StatementCache::new();
        assert!(cache.is_empty());

        cache.insert("SELECT 1", 7);
        assert!(cache.contains("SELECT 1"));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.take("SELECT 1"), Some(7));
        assert!(!cache.contains("SELECT 1"));
        assert_eq!(cache.take("SELECT 1"), None);
    }

    #[test]
    fn insert_replaces_same_query_text() {
        let cache: StatementCache<u64> = StatementCache::new();
        assert_eq!(cache.insert("SELECT 1", 1), None);
        assert_eq!(cache.insert("SELECT 1", 2), Some(1));
        assert_eq!(cache.with("SELECT 1", |s| *s), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn handle_outliving_cache_reports_absence() {
        let cache = Arc::new(StatementCache::<u64>::new());
        let handle = StatementCacheHandle::new(&cache);

        assert!(handle.insert("SELECT 1", 42));
        assert!(handle.is_valid());
        assert_eq!(handle.with("SELECT 1", |s| *s), Some(42));

        drop(cache);

        assert!(!handle.is_valid());
        assert!(!handle.contains("SELECT 1"));
        assert!(!handle.insert("SELECT 2", 0));
        assert_eq!(handle.take("SELECT 1"), None);
        assert_eq!(handle.len(), 0);
    }
}
