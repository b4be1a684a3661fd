//! Named resource locks with deterministic ordering.
//!
//! Tool access is serialized per resource name. To keep agents that share
//! tools deadlock-free, every acquisition sorts the requested names lexically
//! and takes the locks in that order; release happens in exact reverse order
//! on every exit path, including unwinding and future cancellation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

const EVENT_JOURNAL_CAP: usize = 256;

/// Acquisition/release journal entry. Backs the ordering assertions in tests
/// and lock-contention debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    Acquired(String),
    Released(String),
}

/// Lazily populated table of named `Mutex`es. Shared (`Arc`) between every
/// agent that can reach the same tools, so two executions holding the same
/// name are mutually exclusive across agents.
#[derive(Default)]
pub struct ResourceLockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// (owner, resource) pairs in acquisition order
    held: std::sync::Mutex<Vec<(String, String)>>,
    events: std::sync::Mutex<VecDeque<LockEvent>>,
}

impl ResourceLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every named lock in lexical order (duplicates collapsed) on
    /// behalf of `owner`. The returned [`LockSet`] releases in reverse order
    /// when released or dropped.
    pub async fn acquire_ordered(self: &Arc<Self>, owner: &str, names: &[String]) -> LockSet {
        let mut ordered: Vec<String> = names.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for name in ordered {
            let lock = {
                let mut locks = self.locks.lock().await;
                locks
                    .entry(name.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            };
            // Suspension point: another execution may hold this name.
            let guard = lock.lock_owned().await;
            self.note_acquired(owner, &name);
            guards.push(HeldLock {
                owner: owner.to_string(),
                name,
                table: Arc::clone(self),
                _guard: guard,
            });
        }

        LockSet { guards }
    }

    /// All names currently held, in acquisition order.
    pub fn held_locks(&self) -> Vec<String> {
        self.held
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Names currently held by one owner, in acquisition order.
    pub fn held_locks_by(&self, owner: &str) -> Vec<String> {
        self.held
            .lock()
            .unwrap()
            .iter()
            .filter(|(held_owner, _)| held_owner == owner)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Recent acquisition/release events, oldest first.
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    fn note_acquired(&self, owner: &str, name: &str) {
        trace!(owner = %owner, resource = %name, "Acquired resource lock");
        self.held
            .lock()
            .unwrap()
            .push((owner.to_string(), name.to_string()));
        self.push_event(LockEvent::Acquired(name.to_string()));
    }

    fn note_released(&self, owner: &str, name: &str) {
        trace!(owner = %owner, resource = %name, "Released resource lock");
        let mut held = self.held.lock().unwrap();
        if let Some(pos) = held
            .iter()
            .rposition(|(held_owner, held_name)| held_owner == owner && held_name == name)
        {
            held.remove(pos);
        }
        drop(held);
        self.push_event(LockEvent::Released(name.to_string()));
    }

    fn push_event(&self, event: LockEvent) {
        let mut events = self.events.lock().unwrap();
        if events.len() == EVENT_JOURNAL_CAP {
            events.pop_front();
        }
        events.push_back(event);
    }
}

struct HeldLock {
    owner: String,
    name: String,
    table: Arc<ResourceLockTable>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        self.table.note_released(&self.owner, &self.name);
    }
}

/// The locks one execution holds. Releasing pops in reverse acquisition
/// order; dropping (error paths, cancellation) does the same.
pub struct LockSet {
    guards: Vec<HeldLock>,
}

impl LockSet {
    /// Explicit release in reverse acquisition order.
    pub fn release(mut self) {
        self.release_in_reverse();
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    fn release_in_reverse(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        self.release_in_reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    #[tokio::test]
    async fn acquisition_is_lexically_ordered() {
        let table = Arc::new(ResourceLockTable::new());
        let set = table
            .acquire_ordered("agent-1", &["b".into(), "a".into(), "c".into()])
            .await;

        assert_eq!(table.held_locks(), vec!["a", "b", "c"]);
        assert_eq!(set.len(), 3);
        set.release();

        assert_eq!(
            table.events(),
            vec![
                LockEvent::Acquired("a".into()),
                LockEvent::Acquired("b".into()),
                LockEvent::Acquired("c".into()),
                LockEvent::Released("c".into()),
                LockEvent::Released("b".into()),
                LockEvent::Released("a".into()),
            ]
        );
        assert!(table.held_locks().is_empty());
    }

    #[tokio::test]
    async fn duplicates_are_collapsed() {
        let table = Arc::new(ResourceLockTable::new());
        let set = table
            .acquire_ordered("agent-1", &["x".into(), "x".into(), "y".into()])
            .await;
        assert_eq!(set.len(), 2);
        assert_eq!(table.held_locks(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn drop_releases_in_reverse_order() {
        let table = Arc::new(ResourceLockTable::new());
        {
            let _set = table.acquire_ordered("agent-1", &["a".into(), "b".into()]).await;
            // Simulated failure path: the set is dropped, not released.
        }
        let events = table.events();
        assert_eq!(
            &events[2..],
            &[
                LockEvent::Released("b".into()),
                LockEvent::Released("a".into()),
            ]
        );
    }

    #[tokio::test]
    async fn same_name_is_mutually_exclusive() {
        let table = Arc::new(ResourceLockTable::new());
        let first = table.acquire_ordered("agent-1", &["shared".into()]).await;

        let contender = {
            let table = table.clone();
            tokio::spawn(async move {
                let set = table.acquire_ordered("agent-2", &["shared".into()]).await;
                set.release();
            })
        };

        // The contender cannot finish while the first hold is live.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        first.release();
        contender.await.unwrap();
        assert!(table.held_locks().is_empty());
    }

    #[tokio::test]
    async fn empty_acquisition_is_noop() {
        let table = Arc::new(ResourceLockTable::new());
        let set = table.acquire_ordered("agent-1", &[]).await;
        assert!(set.is_empty());
        assert!(table.events().is_empty());
    }
}
