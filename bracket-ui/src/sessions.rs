//! Live session registry
//!
//! Each browser tab owns one [`BracketSession`], created by
//! `POST /api/sessions` and dropped on `DELETE` or after sitting idle.
//! Sessions are never shared: the per-session mutex makes every event for
//! one session run to completion before the next is handled.

use bracket_common::BracketSession;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// A session plus its activity timestamp
#[derive(Debug)]
pub struct SessionSlot {
    pub session: BracketSession,
    last_active: Instant,
}

impl SessionSlot {
    fn new(session: BracketSession) -> Self {
        Self {
            session,
            last_active: Instant::now(),
        }
    }

    /// Mark the session as used now
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// Handle to all live sessions; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Arc<Mutex<SessionSlot>>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its id
    pub async fn insert(&self, session: BracketSession) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(SessionSlot::new(session))));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<SessionSlot>>> {
        self.inner.read().await.get(id).cloned()
    }

    /// Lock a session for exclusive use and mark it active
    ///
    /// Returns `None` for unknown ids, including a session that was removed
    /// while this call waited for its lock.
    pub async fn acquire(&self, id: &Uuid) -> Option<OwnedMutexGuard<SessionSlot>> {
        let slot = self.get(id).await?;
        let mut guard = slot.lock_owned().await;
        if !self.inner.read().await.contains_key(id) {
            return None;
        }
        guard.touch();
        Some(guard)
    }

    /// Drop a session; returns false if it did not exist
    pub async fn remove(&self, id: &Uuid) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remove sessions idle for at least `max_idle`
    ///
    /// Sessions currently handling an event are skipped. Returns the number
    /// removed.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(slot) => slot.idle_for() < max_idle,
            Err(_) => true,
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bracket_common::bracket::EntrantList;

    fn session() -> BracketSession {
        BracketSession::new(EntrantList::default()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session()).await;

        assert!(registry.get(&id).await.is_some());
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.insert(session()).await;
        let b = registry.insert(session()).await;
        assert_ne!(a, b);

        let slot = registry.get(&a).await.unwrap();
        slot.lock().await.session.submit_username("rae").unwrap();

        let other = registry.get(&b).await.unwrap();
        assert!(!other.lock().await.session.username_submitted());
    }

    #[tokio::test]
    async fn test_reap_idle_removes_stale_sessions() {
        let registry = SessionRegistry::new();
        registry.insert(session()).await;
        registry.insert(session()).await;

        assert_eq!(registry.reap_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.reap_idle(Duration::ZERO).await, 2);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_acquire_marks_session_active() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session()).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        let guard = registry.acquire(&id).await.unwrap();
        assert!(guard.idle_for() < Duration::from_millis(30));
        drop(guard);

        assert!(registry.acquire(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_acquire_after_removal_while_waiting() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session()).await;

        let slot = registry.get(&id).await.unwrap();
        let held = slot.lock().await;

        let waiting = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.acquire(&id).await.is_some() })
        };
        tokio::task::yield_now().await;

        assert!(registry.remove(&id).await);
        drop(held);

        assert!(!waiting.await.unwrap());
    }

    #[tokio::test]
    async fn test_reap_skips_busy_sessions() {
        let registry = SessionRegistry::new();
        let id = registry.insert(session()).await;

        let slot = registry.get(&id).await.unwrap();
        let _guard = slot.lock().await;

        assert_eq!(registry.reap_idle(Duration::ZERO).await, 0);
        assert_eq!(registry.len().await, 1);
    }
}
