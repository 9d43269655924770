//! Loopback filtering.
//!
//! The bridge's own outbound traffic comes straight back in as inbound
//! events - a webhook post on Discord, a masqueraded bot message on
//! Stoat, and the deletion events the bridge itself triggers. All of it
//! is expected steady-state traffic and must be swallowed before any
//! processing, or the two sides would feed each other forever.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Tracks the bridge's own outbound identities and in-flight deletions.
#[derive(Debug, Default)]
pub struct LoopGuard {
    /// The Discord bot user id, set once the gateway reports Ready.
    discord_bot_id: AtomicU64,
    /// The Stoat bot user id, set after fetching our own profile.
    stoat_bot_id: RwLock<Option<String>>,
    /// Ids of webhooks the bridge posts through.
    webhook_ids: RwLock<HashSet<u64>>,
    /// Discord message ids the bridge is currently deleting itself.
    discord_deleting: Mutex<HashSet<u64>>,
    /// Stoat message ids the bridge is currently deleting itself.
    stoat_deleting: Mutex<HashSet<String>>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_discord_bot(&self, id: u64) {
        self.discord_bot_id.store(id, Ordering::Relaxed);
    }

    pub fn discord_bot(&self) -> Option<u64> {
        match self.discord_bot_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn set_stoat_bot(&self, id: String) {
        *self.stoat_bot_id.write().expect("guard lock poisoned") = Some(id);
    }

    pub fn register_webhook(&self, id: u64) {
        self.webhook_ids.write().expect("guard lock poisoned").insert(id);
    }

    /// Whether an inbound Discord message is the bridge's own output.
    pub fn is_own_discord(&self, author_id: u64, webhook_id: Option<u64>) -> bool {
        if self.discord_bot().is_some_and(|id| id == author_id) {
            return true;
        }
        match webhook_id {
            Some(wh) => self
                .webhook_ids
                .read()
                .expect("guard lock poisoned")
                .contains(&wh),
            None => false,
        }
    }

    /// Whether an inbound Stoat message is the bridge's own output.
    pub fn is_own_stoat(&self, author_id: &str) -> bool {
        self.stoat_bot_id
            .read()
            .expect("guard lock poisoned")
            .as_deref()
            .is_some_and(|id| id == author_id)
    }

    /// Remember a Discord message the bridge is about to delete, so the
    /// echoed deletion event is swallowed once.
    pub fn mark_discord_deletion(&self, id: u64) {
        self.discord_deleting
            .lock()
            .expect("guard lock poisoned")
            .insert(id);
    }

    /// Clear a mark set by [`mark_discord_deletion`] after the remote
    /// call failed, so a genuine later deletion is still mirrored.
    pub fn unmark_discord_deletion(&self, id: u64) {
        self.discord_deleting
            .lock()
            .expect("guard lock poisoned")
            .remove(&id);
    }

    /// Check-and-clear: true exactly once per marked deletion.
    pub fn take_discord_deletion(&self, id: u64) -> bool {
        self.discord_deleting
            .lock()
            .expect("guard lock poisoned")
            .remove(&id)
    }

    pub fn mark_stoat_deletion(&self, id: String) {
        self.stoat_deleting
            .lock()
            .expect("guard lock poisoned")
            .insert(id);
    }

    pub fn unmark_stoat_deletion(&self, id: &str) {
        self.stoat_deleting
            .lock()
            .expect("guard lock poisoned")
            .remove(id);
    }

    pub fn take_stoat_deletion(&self, id: &str) -> bool {
        self.stoat_deleting
            .lock()
            .expect("guard lock poisoned")
            .remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_discord_messages_are_flagged() {
        let guard = LoopGuard::new();
        guard.set_discord_bot(100);
        guard.register_webhook(555);

        assert!(guard.is_own_discord(100, None));
        assert!(guard.is_own_discord(42, Some(555)));
        assert!(!guard.is_own_discord(42, None));
        assert!(!guard.is_own_discord(42, Some(556)));
    }

    #[test]
    fn test_unknown_identities_pass_before_ready() {
        let guard = LoopGuard::new();
        assert!(!guard.is_own_discord(100, None));
        assert!(!guard.is_own_stoat("01ABC"));
    }

    #[test]
    fn test_own_stoat_messages_are_flagged() {
        let guard = LoopGuard::new();
        guard.set_stoat_bot("01BOT".to_string());

        assert!(guard.is_own_stoat("01BOT"));
        assert!(!guard.is_own_stoat("01USER"));
    }

    #[test]
    fn test_deletion_marks_fire_once() {
        let guard = LoopGuard::new();
        guard.mark_discord_deletion(7);

        assert!(guard.take_discord_deletion(7));
        assert!(!guard.take_discord_deletion(7));

        guard.mark_stoat_deletion("S1".to_string());
        assert!(guard.take_stoat_deletion("S1"));
        assert!(!guard.take_stoat_deletion("S1"));
    }

    #[test]
    fn test_unmark_clears_failed_deletion() {
        let guard = LoopGuard::new();
        guard.mark_discord_deletion(7);
        guard.unmark_discord_deletion(7);
        assert!(!guard.take_discord_deletion(7));
    }
}
