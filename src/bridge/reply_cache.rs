//! Cross-platform message identity cache.
//!
//! Every successful forward records the (Discord id, Stoat id) pair so a
//! later reply on either side can be translated into the other platform's
//! message. Bounded FIFO: the oldest record is dropped when the cache is
//! full, regardless of how often it is looked up.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// One forwarded message, linking its identity on both platforms.
#[derive(Debug, Clone)]
pub struct MessageLink {
    pub discord_id: u64,
    pub stoat_id: String,
    /// Whether the Discord half was posted by the bridge's webhook
    /// (Stoat -> Discord direction). Needed when mirroring deletions.
    pub via_webhook: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    order: VecDeque<Arc<MessageLink>>,
    by_discord: HashMap<u64, Arc<MessageLink>>,
    by_stoat: HashMap<String, Arc<MessageLink>>,
}

/// Bounded FIFO store of [`MessageLink`] with O(1) lookup by either id.
#[derive(Debug)]
pub struct ReplyCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl ReplyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Record a freshly forwarded message pair, evicting the oldest
    /// record when at capacity.
    pub fn record(&self, discord_id: u64, stoat_id: String, via_webhook: bool) {
        let link = Arc::new(MessageLink {
            discord_id,
            stoat_id,
            via_webhook,
            created_at: Utc::now(),
        });

        let mut inner = self.inner.lock().expect("reply cache lock poisoned");

        while inner.order.len() >= self.capacity {
            if let Some(old) = inner.order.pop_front() {
                // Only drop index entries still pointing at the evicted
                // record; a re-used id must keep its newer link.
                if inner
                    .by_discord
                    .get(&old.discord_id)
                    .is_some_and(|l| Arc::ptr_eq(l, &old))
                {
                    inner.by_discord.remove(&old.discord_id);
                }
                if inner
                    .by_stoat
                    .get(&old.stoat_id)
                    .is_some_and(|l| Arc::ptr_eq(l, &old))
                {
                    inner.by_stoat.remove(&old.stoat_id);
                }
            }
        }

        inner.by_discord.insert(link.discord_id, Arc::clone(&link));
        inner
            .by_stoat
            .insert(link.stoat_id.clone(), Arc::clone(&link));
        inner.order.push_back(link);
    }

    /// Look up a resident record by its Discord message id.
    pub fn by_discord(&self, discord_id: u64) -> Option<MessageLink> {
        let inner = self.inner.lock().expect("reply cache lock poisoned");
        inner.by_discord.get(&discord_id).map(|l| (**l).clone())
    }

    /// Look up a resident record by its Stoat message id.
    pub fn by_stoat(&self, stoat_id: &str) -> Option<MessageLink> {
        let inner = self.inner.lock().expect("reply cache lock poisoned");
        inner.by_stoat.get(stoat_id).map(|l| (**l).clone())
    }

    /// Number of resident records.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("reply cache lock poisoned").order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stoat_id(n: u64) -> String {
        format!("S{:05}", n)
    }

    #[test]
    fn test_lookup_by_either_id() {
        let cache = ReplyCache::new(10);
        cache.record(1, "AAA".to_string(), true);

        let by_d = cache.by_discord(1).unwrap();
        assert_eq!(by_d.stoat_id, "AAA");
        assert!(by_d.via_webhook);

        let by_s = cache.by_stoat("AAA").unwrap();
        assert_eq!(by_s.discord_id, 1);

        assert!(cache.by_discord(2).is_none());
        assert!(cache.by_stoat("BBB").is_none());
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let cache = ReplyCache::new(5);
        for n in 0..20 {
            cache.record(n, stoat_id(n), false);
            assert!(cache.len() <= 5);
        }
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_fifo_eviction_drops_oldest() {
        let capacity = 500;
        let cache = ReplyCache::new(capacity);

        for n in 1..=capacity as u64 {
            cache.record(n, stoat_id(n), false);
        }
        assert!(cache.by_discord(1).is_some());

        // The 501st insert evicts exactly the 1st record.
        cache.record(501, stoat_id(501), false);
        assert!(cache.by_discord(1).is_none());
        assert!(cache.by_stoat(&stoat_id(1)).is_none());
        assert!(cache.by_discord(2).is_some());
        assert!(cache.by_discord(501).is_some());
        assert_eq!(cache.len(), capacity);
    }

    #[test]
    fn test_lookups_do_not_refresh_eviction_order() {
        let cache = ReplyCache::new(3);
        cache.record(1, stoat_id(1), false);
        cache.record(2, stoat_id(2), false);
        cache.record(3, stoat_id(3), false);

        // Repeatedly replying to the oldest record must not save it.
        for _ in 0..10 {
            assert!(cache.by_discord(1).is_some());
        }

        cache.record(4, stoat_id(4), false);
        assert!(cache.by_discord(1).is_none());
        assert!(cache.by_discord(2).is_some());
    }

    #[test]
    fn test_records_are_immutable_snapshots() {
        let cache = ReplyCache::new(3);
        cache.record(1, stoat_id(1), false);

        let before = cache.by_discord(1).unwrap();
        cache.record(2, stoat_id(2), true);
        let after = cache.by_discord(1).unwrap();

        assert_eq!(before.discord_id, after.discord_id);
        assert_eq!(before.stoat_id, after.stoat_id);
        assert_eq!(before.via_webhook, after.via_webhook);
    }
}
