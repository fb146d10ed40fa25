//! Purpose: In-memory read-through cache for single-entry datastore values.
//! Exports: `EntryCache`, `CacheKey`, `CacheEntry`.
//! Role: Owned by the dispatcher; never handed out except as cloned snapshots.
//! Invariants: An entry is served only while `now < fresh_until`.
//! Invariants: `put` is last-writer-wins; there is no version or CAS check.
//! Invariants: Unbounded unless a capacity is configured; then stale entries go first,
//! followed by the oldest write.
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Ceiling used when `now + ttl` does not fit in an `Instant`.
const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// `(entryKey, scope, dataStoreName)` joined by underscores.
///
/// Triples whose concatenations coincide (for example `a_b`, `c`, `d` and `a`, `b_c`,
/// `d`) share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(entry_key: &str, scope: &str, data_store_name: &str) -> Self {
        Self(format!("{entry_key}_{scope}_{data_store_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub written_at: Instant,
    pub fresh_until: Instant,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.fresh_until
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }
}

#[derive(Debug, Default)]
pub struct EntryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    capacity: Option<usize>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    /// Value for `key` if it is still fresh at `now`.
    pub fn get_fresh_at(&self, key: &CacheKey, now: Instant) -> Option<Value> {
        self.lock()
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.value.clone())
    }

    pub fn get_fresh(&self, key: &CacheKey) -> Option<Value> {
        self.get_fresh_at(key, Instant::now())
    }

    pub fn put(&self, key: CacheKey, value: Value, ttl: Duration) {
        self.put_at(key, value, ttl, Instant::now());
    }

    pub fn put_at(&self, key: CacheKey, value: Value, ttl: Duration, now: Instant) {
        let fresh_until = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(MAX_TTL))
            .unwrap_or(now);
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(&key) {
            entry.value = value;
            entry.written_at = now;
            entry.fresh_until = fresh_until;
            return;
        }
        if let Some(capacity) = self.capacity {
            make_room(&mut entries, capacity, now);
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                written_at: now,
                fresh_until,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn make_room(entries: &mut HashMap<CacheKey, CacheEntry>, capacity: usize, now: Instant) {
    if entries.len() < capacity {
        return;
    }
    entries.retain(|_, entry| entry.is_fresh_at(now));
    while entries.len() >= capacity {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.written_at)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                entries.remove(&key);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheKey, EntryCache};
    use serde_json::json;
    use std::time::{Duration, Instant};

    #[test]
    fn key_joins_components_in_order() {
        let key = CacheKey::new("coins", "global", "PlayerData");
        assert_eq!(key.as_str(), "coins_global_PlayerData");
        assert_ne!(key, CacheKey::new("global", "coins", "PlayerData"));
    }

    #[test]
    fn fresh_entry_is_served_until_window_ends() {
        let cache = EntryCache::new();
        let key = CacheKey::new("coins", "global", "PlayerData");
        let now = Instant::now();
        cache.put_at(key.clone(), json!(42), Duration::from_secs(10), now);

        assert_eq!(cache.get_fresh_at(&key, now), Some(json!(42)));
        assert_eq!(
            cache.get_fresh_at(&key, now + Duration::from_secs(9)),
            Some(json!(42))
        );
        assert_eq!(cache.get_fresh_at(&key, now + Duration::from_secs(10)), None);
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn zero_ttl_is_never_fresh() {
        let cache = EntryCache::new();
        let key = CacheKey::new("k", "s", "d");
        let now = Instant::now();
        cache.put_at(key.clone(), json!("v"), Duration::ZERO, now);
        assert_eq!(cache.get_fresh_at(&key, now), None);
    }

    #[test]
    fn put_overwrites_in_place() {
        let cache = EntryCache::new();
        let key = CacheKey::new("k", "s", "d");
        let now = Instant::now();
        cache.put_at(key.clone(), json!(1), Duration::ZERO, now);
        cache.put_at(key.clone(), json!(2), Duration::from_secs(5), now);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_fresh_at(&key, now), Some(json!(2)));
    }

    #[test]
    fn capacity_evicts_stale_then_oldest() {
        let cache = EntryCache::with_capacity_limit(2);
        let now = Instant::now();
        let stale = CacheKey::new("stale", "s", "d");
        let old = CacheKey::new("old", "s", "d");
        let newer = CacheKey::new("newer", "s", "d");
        let newest = CacheKey::new("newest", "s", "d");

        cache.put_at(stale.clone(), json!(0), Duration::ZERO, now);
        cache.put_at(old.clone(), json!(1), Duration::from_secs(60), now);
        cache.put_at(
            newer.clone(),
            json!(2),
            Duration::from_secs(60),
            now + Duration::from_secs(1),
        );
        assert!(cache.get(&stale).is_none());
        assert_eq!(cache.len(), 2);

        cache.put_at(
            newest.clone(),
            json!(3),
            Duration::from_secs(60),
            now + Duration::from_secs(2),
        );
        assert!(cache.get(&old).is_none());
        assert!(cache.get(&newer).is_some());
        assert!(cache.get(&newest).is_some());
    }
}
