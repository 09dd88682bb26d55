//! The session store: a concurrency-safe map of per-key session slots.
//!
//! Layout: `RwLock<HashMap<key, Arc<Mutex<Session>>>>`. The outer map
//! lock is held only for slot lookup and insertion; all turn mutation
//! happens under the per-key mutex, so appends on one key serialize while
//! independent keys never contend.
//!
//! The TTL sweep takes the map write lock per candidate and uses a
//! non-blocking `try_lock` on the slot: a session whose mutex is held by
//! an in-flight append is skipped, and an append that finds its slot
//! detached re-resolves the key, so eviction always loses to a
//! concurrent append.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use heliolab_core::error::SessionError;
use heliolab_core::session::{Session, SessionKey, Turn};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type Slot = Arc<Mutex<Session>>;

/// Aggregate statistics over the live session map.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub sessions: usize,
    pub oldest_created: Option<DateTime<Utc>>,
    pub newest_created: Option<DateTime<Utc>>,
}

/// The concurrency-safe session store.
pub struct SessionStore {
    slots: RwLock<HashMap<String, Slot>>,
    turn_cap: usize,
    ttl_secs: i64,
}

impl SessionStore {
    /// Create a store with the given turn cap and idle TTL.
    pub fn new(turn_cap: usize, ttl_secs: u64) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            turn_cap,
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Default window of 10 turns and a 1 hour TTL.
    pub fn with_defaults() -> Self {
        Self::new(10, 3600)
    }

    /// Generate a fresh server-side session key.
    pub fn generate_key(&self) -> SessionKey {
        SessionKey::new()
    }

    /// Get a snapshot of the session under `key`, creating it if absent.
    pub async fn get_or_create(&self, key: &str, user_id: Option<&str>) -> Session {
        let slot = self.slot(key, user_id).await;
        let session = slot.lock().await;
        session.clone()
    }

    /// Read-only lookup. `NotFound` for absent keys and for sessions
    /// already past their TTL (sweep-pending ones included).
    pub async fn get(&self, key: &str) -> Result<Session, SessionError> {
        let slot = {
            let slots = self.slots.read().await;
            slots.get(key).cloned()
        };
        let Some(slot) = slot else {
            return Err(SessionError::NotFound(key.to_string()));
        };
        let session = slot.lock().await;
        if session.expired(Utc::now(), self.ttl_secs) {
            return Err(SessionError::NotFound(key.to_string()));
        }
        Ok(session.clone())
    }

    /// Append one turn, creating the session if absent. Returns the
    /// post-append snapshot. Concurrent appends on the same key
    /// serialize into a definite order; none are lost.
    pub async fn append_turn(&self, key: &str, turn: Turn) -> Session {
        self.mutate(key, None, |session, cap| {
            session.push_turn(turn, cap);
        })
        .await
    }

    /// Commit both turns of one exchange under a single per-key critical
    /// section, so two concurrent exchanges can never interleave their
    /// user/assistant pairs.
    pub async fn append_exchange(
        &self,
        key: &str,
        user_id: Option<&str>,
        user_turn: Turn,
        assistant_turn: Turn,
    ) -> Session {
        self.mutate(key, user_id, |session, cap| {
            session.push_turn(user_turn, cap);
            session.push_turn(assistant_turn, cap);
        })
        .await
    }

    /// Write a metadata value on the session, creating it if absent.
    pub async fn set_metadata(&self, key: &str, name: &str, value: serde_json::Value) -> Session {
        let name = name.to_string();
        self.mutate(key, None, move |session, _cap| {
            session.metadata.insert(name, value);
            session.last_activity = Utc::now();
        })
        .await
    }

    /// Read a metadata value, if the session and entry exist.
    pub async fn get_metadata(&self, key: &str, name: &str) -> Option<serde_json::Value> {
        let session = self.get(key).await.ok()?;
        session.metadata.get(name).cloned()
    }

    /// Remove the session under `key`. Returns whether it existed.
    pub async fn clear(&self, key: &str) -> bool {
        self.slots.write().await.remove(key).is_some()
    }

    /// Remove every session idle longer than the TTL as of `now`.
    /// Returns the number removed. Sessions receiving activity while the
    /// sweep runs survive.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        // Collect candidates under the read lock; skip any slot whose
        // mutex is currently held (it is mid-append and therefore live).
        let candidates: Vec<(String, Slot)> = {
            let slots = self.slots.read().await;
            slots
                .iter()
                .filter_map(|(key, slot)| match slot.try_lock() {
                    Ok(session) if session.expired(now, self.ttl_secs) => {
                        Some((key.clone(), slot.clone()))
                    }
                    _ => None,
                })
                .collect()
        };

        let mut removed = 0;
        for (key, slot) in candidates {
            let mut slots = self.slots.write().await;
            let Some(current) = slots.get(&key) else {
                continue;
            };
            if !Arc::ptr_eq(current, &slot) {
                continue; // replaced since collection; leave it alone
            }
            // Re-check under the write lock. try_lock never awaits, so
            // the map stays locked only momentarily; a failed try_lock
            // means an append is in flight and the session survives.
            match slot.try_lock() {
                Ok(session) if session.expired(now, self.ttl_secs) => {
                    drop(session);
                    slots.remove(&key);
                    removed += 1;
                }
                _ => {}
            }
        }

        if removed > 0 {
            debug!(removed, "Swept expired sessions");
        }
        removed
    }

    /// Aggregate statistics for diagnostics.
    pub async fn stats(&self) -> StoreStats {
        // Snapshot the slot list first; never await a per-key mutex
        // while holding the map lock.
        let slots: Vec<Slot> = {
            let slots = self.slots.read().await;
            slots.values().cloned().collect()
        };
        let mut oldest: Option<DateTime<Utc>> = None;
        let mut newest: Option<DateTime<Utc>> = None;
        for slot in &slots {
            let created = slot.lock().await.created_at;
            oldest = Some(oldest.map_or(created, |o| o.min(created)));
            newest = Some(newest.map_or(created, |n| n.max(created)));
        }
        StoreStats {
            sessions: slots.len(),
            oldest_created: oldest,
            newest_created: newest,
        }
    }

    /// Resolve the slot for `key`, inserting a fresh session if absent.
    async fn slot(&self, key: &str, user_id: Option<&str>) -> Slot {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(key) {
                return slot.clone();
            }
        }
        let mut slots = self.slots.write().await;
        slots
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Session::new(
                    SessionKey::from(key),
                    user_id.map(str::to_string),
                )))
            })
            .clone()
    }

    /// Apply `f` to the live session under `key` within its per-key
    /// critical section. If a sweep or clear detached the slot between
    /// lookup and lock, re-resolve and try again: the mutation must land
    /// in the map's live session.
    async fn mutate<F>(&self, key: &str, user_id: Option<&str>, f: F) -> Session
    where
        F: FnOnce(&mut Session, usize),
    {
        let mut f = Some(f);
        loop {
            let slot = self.slot(key, user_id).await;
            let mut session = slot.lock().await;
            let still_live = {
                let slots = self.slots.read().await;
                slots.get(key).is_some_and(|current| Arc::ptr_eq(current, &slot))
            };
            if !still_live {
                continue;
            }
            // Holding the mutex here blocks the sweep's try_lock, so the
            // slot cannot be detached until the guard drops.
            let Some(apply) = f.take() else {
                unreachable!("mutation closure is applied exactly once");
            };
            apply(&mut session, self.turn_cap);
            return session.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use heliolab_core::session::Role;

    #[tokio::test]
    async fn get_or_create_then_get() {
        let store = SessionStore::with_defaults();
        let created = store.get_or_create("lab-1", Some("alice")).await;
        assert_eq!(created.key.0, "lab-1");
        assert_eq!(created.user_id.as_deref(), Some("alice"));

        let fetched = store.get("lab-1").await.unwrap();
        assert_eq!(fetched.key.0, "lab-1");
        assert!(fetched.turns.is_empty());
    }

    #[tokio::test]
    async fn get_absent_key_is_not_found() {
        let store = SessionStore::with_defaults();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn append_creates_session_if_absent() {
        let store = SessionStore::with_defaults();
        let session = store.append_turn("fresh", Turn::user("hello")).await;
        assert_eq!(session.turns.len(), 1);
    }

    #[tokio::test]
    async fn cap_drops_oldest() {
        let store = SessionStore::new(10, 3600);
        for i in 0..13 {
            store.append_turn("s", Turn::user(format!("turn {i}"))).await;
        }
        let session = store.get("s").await.unwrap();
        assert_eq!(session.turns.len(), 10);
        assert_eq!(session.turns[0].content, "turn 3");
        assert_eq!(session.turns[9].content, "turn 12");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_lose_nothing_below_cap() {
        let store = Arc::new(SessionStore::new(100, 3600));
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_turn("shared", Turn::user(format!("turn {i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = store.get("shared").await.unwrap();
        assert_eq!(session.turns.len(), 32);
        // Every append landed exactly once, in some total order.
        let mut contents: Vec<_> = session.turns.iter().map(|t| t.content.clone()).collect();
        contents.sort();
        contents.dedup();
        assert_eq!(contents.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_respect_cap() {
        let store = Arc::new(SessionStore::new(10, 3600));
        let mut handles = Vec::new();
        for i in 0..40 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_turn("capped", Turn::user(format!("turn {i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let session = store.get("capped").await.unwrap();
        assert_eq!(session.turns.len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn exchanges_never_interleave() {
        let store = Arc::new(SessionStore::new(100, 3600));
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_exchange(
                        "pairs",
                        None,
                        Turn::user(format!("q{i}")),
                        Turn::assistant(format!("a{i}")),
                    )
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = store.get("pairs").await.unwrap();
        assert_eq!(session.turns.len(), 32);
        for pair in session.turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            // q7 is answered by a7, never by another exchange's reply
            let question = pair[0].content.trim_start_matches('q');
            let answer = pair[1].content.trim_start_matches('a');
            assert_eq!(question, answer);
        }
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let store = SessionStore::new(10, 3600);
        store.append_turn("idle", Turn::user("old")).await;
        store.append_turn("busy", Turn::user("old")).await;

        let idle_at = store.get("idle").await.unwrap().last_activity;

        // Sweep with a clock before the TTL boundary: nothing goes.
        assert_eq!(store.sweep_expired(idle_at + ChronoDuration::seconds(3599)).await, 0);

        // "busy" gets touched; its activity is now later than "idle"'s.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store.append_turn("busy", Turn::user("recent")).await;
        let busy_at = store.get("busy").await.unwrap().last_activity;

        // A clock just past idle's TTL but not busy's removes exactly one.
        let cutoff = idle_at + ChronoDuration::seconds(3601);
        assert!(cutoff < busy_at + ChronoDuration::seconds(3601));
        assert_eq!(store.sweep_expired(cutoff).await, 1);
        assert!(store.get("idle").await.is_err());
        assert!(store.get("busy").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn append_during_sweep_is_never_lost() {
        let store = Arc::new(SessionStore::new(100, 3600));
        store.append_turn("contested", Turn::user("seed")).await;

        let sweeper = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    // A far-future clock makes everything look expired.
                    store
                        .sweep_expired(Utc::now() + ChronoDuration::days(365))
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };
        let appender = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    store.append_turn("contested", Turn::user(format!("turn {i}"))).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        sweeper.await.unwrap();
        appender.await.unwrap();

        // However the race played out, an append after the sweeps lands
        // in the live map and is visible to readers.
        let session = store.append_turn("contested", Turn::user("after the storm")).await;
        assert!(session.turns.iter().any(|t| t.content == "after the storm"));
        let fetched = store.get("contested").await.unwrap();
        assert!(fetched.turns.iter().any(|t| t.content == "after the storm"));
    }

    #[tokio::test]
    async fn clear_removes_session() {
        let store = SessionStore::with_defaults();
        store.append_turn("gone", Turn::user("x")).await;
        assert!(store.clear("gone").await);
        assert!(!store.clear("gone").await);
        assert!(store.get("gone").await.is_err());
    }

    #[tokio::test]
    async fn metadata_roundtrip() {
        let store = SessionStore::with_defaults();
        store
            .set_metadata("meta", "last_analysis", serde_json::json!({"test_type": "iv_curve"}))
            .await;
        let value = store.get_metadata("meta", "last_analysis").await.unwrap();
        assert_eq!(value["test_type"], "iv_curve");
        assert!(store.get_metadata("meta", "missing").await.is_none());
    }

    #[tokio::test]
    async fn stats_track_session_count() {
        let store = SessionStore::with_defaults();
        assert_eq!(store.stats().await.sessions, 0);
        store.append_turn("a", Turn::user("x")).await;
        store.append_turn("b", Turn::user("y")).await;
        let stats = store.stats().await;
        assert_eq!(stats.sessions, 2);
        assert!(stats.oldest_created.is_some());
        assert!(stats.oldest_created <= stats.newest_created);
    }
}
