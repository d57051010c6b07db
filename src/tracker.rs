//! Registry of bot-posted message ids
//!
//! Posted images are deleted after a few seconds, but the reaction-added
//! event can arrive after the deletion. A reaction to an untracked, deleted
//! message cannot be verified as bot-authored, so each posted message id is
//! kept here from the moment of posting until a grace period after deletion.

use dashmap::DashMap;

pub struct MessageTracker {
    messages: DashMap<u64, String>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
        }
    }

    pub fn track(&self, message_id: u64, guild_key: &str) {
        self.messages.insert(message_id, guild_key.to_string());
    }

    pub fn is_tracked(&self, message_id: u64) -> bool {
        self.messages.contains_key(&message_id)
    }

    pub fn untrack(&self, message_id: u64) {
        self.messages.remove(&message_id);
    }
}

impl Default for MessageTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_until_untracked() {
        let tracker = MessageTracker::new();
        assert!(!tracker.is_tracked(42));
        tracker.track(42, "100");
        assert!(tracker.is_tracked(42));
        tracker.untrack(42);
        assert!(!tracker.is_tracked(42));
    }

    #[test]
    fn untrack_is_idempotent() {
        let tracker = MessageTracker::new();
        tracker.track(1, "dm");
        tracker.untrack(1);
        tracker.untrack(1);
        assert!(!tracker.is_tracked(1));
    }
}
