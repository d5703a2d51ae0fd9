//! In-memory record of per-user token revocations.
//!
//! Logging out revokes every token the user was issued up to that moment.
//! Entries are kept until the longest-lived token issued before the
//! revocation would have expired anyway.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct Revocation {
    /// Tokens issued at or before this instant (unix millis) are rejected
    revoked_at_ms: i64,
    expires_at: SystemTime,
}

/// Thread-safe revocation list keyed by user id
#[derive(Debug)]
pub struct RevocationList {
    entries: Mutex<HashMap<String, Revocation>>,
    max_size: usize,
}

impl Default for RevocationList {
    fn default() -> Self {
        Self::new()
    }
}

impl RevocationList {
    pub fn new() -> Self {
        Self::with_max_size(10_000)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size: max_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Revocation>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Revoke all of a user's tokens issued at or before `revoked_at_ms`.
    ///
    /// Expired entries are pruned on every call. Live entries are never
    /// evicted, so the list may grow past `max_size`.
    pub fn revoke(&self, user_id: &str, revoked_at_ms: i64, expires_at: SystemTime) {
        let mut entries = self.lock();
        Self::remove_expired(&mut entries);

        if entries.len() >= self.max_size && !entries.contains_key(user_id) {
            warn!(
                "Revocation list holds {} live entries (max {}), growing",
                entries.len(),
                self.max_size
            );
        }

        let revoked_at_ms = entries
            .get(user_id)
            .map(|existing| existing.revoked_at_ms.max(revoked_at_ms))
            .unwrap_or(revoked_at_ms);
        let expires_at = entries
            .get(user_id)
            .map(|existing| existing.expires_at.max(expires_at))
            .unwrap_or(expires_at);
        entries.insert(user_id.to_string(), Revocation { revoked_at_ms, expires_at });
        info!("Tokens revoked for user {}", user_id);
    }

    /// Whether a token issued at `issued_at_ms` for `user_id` has been revoked
    pub fn is_revoked(&self, user_id: &str, issued_at_ms: i64) -> bool {
        self.lock()
            .get(user_id)
            .map(|r| issued_at_ms <= r.revoked_at_ms)
            .unwrap_or(false)
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    fn remove_expired(entries: &mut HashMap<String, Revocation>) -> usize {
        let now = SystemTime::now();
        let before = entries.len();
        entries.retain(|_, r| r.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Removed {} expired revocations", removed);
        }
        removed
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn later() -> SystemTime {
        SystemTime::now() + Duration::from_secs(300)
    }

    #[test]
    fn test_tokens_issued_before_revocation_are_rejected() {
        let list = RevocationList::new();
        list.revoke("user-1", 1_000, later());

        assert!(list.is_revoked("user-1", 999));
        assert!(list.is_revoked("user-1", 1_000));
        assert!(!list.is_revoked("user-1", 1_001));
        assert!(!list.is_revoked("user-2", 0));
    }

    #[test]
    fn test_revoked_user_stays_revoked_at_capacity() {
        let list = RevocationList::with_max_size(2);
        list.revoke("victim", 1_000, later());
        list.revoke("a", 2_000, later());
        list.revoke("b", 3_000, later());

        assert_eq!(list.size(), 3);
        assert!(list.is_revoked("victim", 500));
        assert!(list.is_revoked("a", 2_000));
        assert!(list.is_revoked("b", 3_000));
    }

    #[test]
    fn test_revoke_prunes_expired_entries() {
        let list = RevocationList::with_max_size(2);
        list.revoke("expired", 1, SystemTime::now() - Duration::from_secs(1));
        list.revoke("current", 2, later());

        assert_eq!(list.size(), 1);
        assert!(list.is_revoked("current", 2));
    }
}
