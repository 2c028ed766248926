//! Delayed MOTD delivery queue.
//!
//! Delivery is two-phase: a short grace delay between the join event and
//! the actual send collapses the rapid join/leave/join bursts of a
//! reconnect storm into a single send, and a long cooldown after the send
//! keeps the entry alive so repeated joins within the cooldown window do
//! not trigger another delivery. Once the cooldown expires the entry is
//! dropped and a later, distinct join becomes eligible again.

use std::collections::HashMap;

struct PendingMotd {
    joined_at: u64,
    /// 0 while the MOTD has not been sent yet.
    sent_at: u64,
}

/// Per-session queue of users awaiting (or cooling down from) an MOTD,
/// keyed by user name so removal is O(1).
pub struct MotdQueue {
    pending: HashMap<String, PendingMotd>,
    grace_secs: u64,
    cooldown_secs: u64,
}

impl MotdQueue {
    pub fn new(grace_secs: u64, cooldown_secs: u64) -> Self {
        Self {
            pending: HashMap::new(),
            grace_secs,
            cooldown_secs,
        }
    }

    /// Record a qualifying join. Returns true if a new entry was queued,
    /// false if the user already has a live entry (pending or cooling
    /// down), in which case the join is absorbed.
    pub fn note_join(&mut self, user: &str, now: u64) -> bool {
        if self.pending.contains_key(user) {
            return false;
        }
        self.pending.insert(
            user.to_string(),
            PendingMotd {
                joined_at: now,
                sent_at: 0,
            },
        );
        true
    }

    /// Advance the queue. Returns the users whose MOTD is due now; their
    /// entries move into the cooldown phase. Entries whose cooldown has
    /// expired are removed.
    pub fn tick(&mut self, now: u64) -> Vec<String> {
        let mut due = Vec::new();
        let grace = self.grace_secs;
        let cooldown = self.cooldown_secs;
        self.pending.retain(|user, entry| {
            if entry.sent_at == 0 {
                if now.saturating_sub(entry.joined_at) > grace {
                    entry.sent_at = now;
                    due.push(user.clone());
                }
                true
            } else {
                now.saturating_sub(entry.sent_at) <= cooldown
            }
        });
        due
    }

    /// Drop one user's entry, pending or cooling down. Used when a user
    /// opts out so an already-queued delivery is cancelled.
    pub fn remove(&mut self, user: &str) {
        self.pending.remove(user);
    }

    /// Drop all entries. Called on session teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, user: &str) -> bool {
        self.pending.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_once_after_grace() {
        let mut queue = MotdQueue::new(2, 300);
        assert!(queue.note_join("arthas", 100));
        assert!(queue.tick(101).is_empty());
        assert!(queue.tick(102).is_empty()); // exactly at grace, not yet due
        assert_eq!(queue.tick(103), vec!["arthas".to_string()]);
        assert!(queue.tick(104).is_empty());
    }

    #[test]
    fn rejoin_during_pending_does_not_duplicate() {
        let mut queue = MotdQueue::new(2, 300);
        assert!(queue.note_join("arthas", 100));
        assert!(!queue.note_join("arthas", 101));
        assert_eq!(queue.tick(103).len(), 1);
        // Rejoin during cooldown is also absorbed.
        assert!(!queue.note_join("arthas", 110));
        assert!(queue.tick(111).is_empty());
    }

    #[test]
    fn eligible_again_after_cooldown() {
        let mut queue = MotdQueue::new(2, 300);
        queue.note_join("arthas", 100);
        assert_eq!(queue.tick(103).len(), 1); // sent_at = 103
        assert!(queue.tick(403).is_empty()); // cooldown boundary, entry kept
        assert!(queue.is_pending("arthas"));
        assert!(queue.tick(404).is_empty()); // expired, entry removed
        assert!(!queue.is_pending("arthas"));
        assert!(queue.note_join("arthas", 500));
        assert_eq!(queue.tick(503), vec!["arthas".to_string()]);
    }

    #[test]
    fn remove_cancels_a_pending_delivery() {
        let mut queue = MotdQueue::new(2, 300);
        queue.note_join("arthas", 100);
        queue.remove("arthas");
        assert!(queue.tick(110).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = MotdQueue::new(2, 300);
        queue.note_join("a", 100);
        queue.note_join("b", 100);
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.tick(200).is_empty());
    }
}
