//! Bounded cache of events already forwarded.
//!
//! One LRU shared by every user; keys carry the user id so the same event
//! seen through two users' sockets is delivered to both. Nothing is
//! persisted, and an evicted entry can let a very old duplicate through.

use std::fmt;
use std::num::NonZeroUsize;

use feedbridge_core::UserId;
use lru::LruCache;
use parking_lot::Mutex;

/// Kind of a deduplicated event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `comment:new`.
    Comment,
    /// `post:new`.
    Post,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Comment => "comment",
            Self::Post => "post",
        })
    }
}

/// `(user, kind, event id)` cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Recipient.
    pub user_id: UserId,
    /// Event kind.
    pub kind: EventKind,
    /// Backend id of the comment or post.
    pub event_id: String,
}

impl DedupKey {
    /// Key for a comment delivered to a user.
    pub fn comment(user_id: UserId, comment_id: &str) -> Self {
        Self {
            user_id,
            kind: EventKind::Comment,
            event_id: comment_id.to_string(),
        }
    }
}

/// Thread-safe LRU presence cache.
pub struct DedupCache {
    entries: Mutex<LruCache<DedupKey, ()>>,
}

impl DedupCache {
    /// Cache holding at most `capacity` keys (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Check-and-set: `false` the first time a key is seen (and records it),
    /// `true` on every later call while the key is cached.
    ///
    /// A hit refreshes the key's recency.
    pub fn should_suppress(&self, key: DedupKey) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(&key).is_some() {
            return true;
        }
        let _ = entries.put(key, ());
        false
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of keys.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl fmt::Debug for DedupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    use super::*;

    fn key(user: i64, id: &str) -> DedupKey {
        DedupKey::comment(UserId::new(user), id)
    }

    #[test]
    fn first_admits_second_suppresses() {
        let cache = DedupCache::new(10);
        assert!(!cache.should_suppress(key(1, "c1")));
        assert!(cache.should_suppress(key(1, "c1")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_scoped_per_user_and_kind() {
        let cache = DedupCache::new(10);
        assert!(!cache.should_suppress(key(1, "c1")));
        assert!(!cache.should_suppress(key(2, "c1")));
        assert!(!cache.should_suppress(DedupKey {
            user_id: UserId::new(1),
            kind: EventKind::Post,
            event_id: "c1".into(),
        }));
    }

    #[test]
    fn least_recently_touched_is_evicted() {
        let cache = DedupCache::new(2);
        assert!(!cache.should_suppress(key(1, "a")));
        assert!(!cache.should_suppress(key(1, "b")));
        // touch "a" so "b" becomes the eviction candidate
        assert!(cache.should_suppress(key(1, "a")));
        assert!(!cache.should_suppress(key(1, "c")));

        assert_eq!(cache.len(), 2);
        assert!(cache.should_suppress(key(1, "a")));
        assert!(!cache.should_suppress(key(1, "b")));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = DedupCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(!cache.should_suppress(key(1, "a")));
        assert!(cache.should_suppress(key(1, "a")));
    }

    #[test]
    fn concurrent_callers_admit_exactly_once() {
        const THREADS: usize = 16;
        let cache = Arc::new(DedupCache::new(100));
        let barrier = Arc::new(Barrier::new(THREADS));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    let _ = barrier.wait();
                    if !cache.should_suppress(key(7, "same")) {
                        let _ = admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
