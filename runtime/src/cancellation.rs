//! Bookkeeping for cancellable units of work.
//!
//! Every `Effect::Cancellable` opens a *generation* for its id. Tasks spawned
//! for that unit attach their abort handles to the generation, and actions
//! they produce are only delivered while the generation is still live.
//! Cancelling (or superseding) an id retires its generation and aborts its
//! tasks.
//!
//! The Store consults the registry while holding the state write lock, so a
//! `Cancel` processed for one action is visible to every later delivery.

use futures::future::AbortHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tabbar_core::effect::EffectId;

/// One generation of a cancellable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CancelScope {
    id: EffectId,
    generation: u64,
}

impl CancelScope {
    pub(crate) const fn id(&self) -> &EffectId {
        &self.id
    }
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    outstanding: usize,
    tasks: Vec<AbortHandle>,
}

impl Entry {
    fn abort(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CancellationRegistry {
    next_generation: AtomicU64,
    entries: Mutex<HashMap<EffectId, Entry>>,
}

impl CancellationRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<EffectId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new generation for `id`, superseding any live one.
    pub(crate) fn register(&self, id: EffectId) -> CancelScope {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.lock().insert(
            id.clone(),
            Entry {
                generation,
                outstanding: 0,
                tasks: Vec::new(),
            },
        );

        if let Some(previous) = previous {
            tracing::debug!(effect_id = %id, "Superseding in-flight effect");
            metrics::counter!("store.effects.cancelled", "reason" => "superseded").increment(1);
            previous.abort();
        }

        CancelScope { id, generation }
    }

    /// Retire the live generation of `id`. Returns `false` if nothing was in flight.
    pub(crate) fn cancel(&self, id: &EffectId) -> bool {
        let removed = self.lock().remove(id);
        removed.map_or(false, |entry| {
            entry.abort();
            true
        })
    }

    pub(crate) fn is_live(&self, scope: &CancelScope) -> bool {
        self.lock()
            .get(&scope.id)
            .is_some_and(|entry| entry.generation == scope.generation)
    }

    /// Count a task against the scope. Returns `false` if the scope is retired.
    pub(crate) fn begin(&self, scope: &CancelScope) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(&scope.id) {
            Some(entry) if entry.generation == scope.generation => {
                entry.outstanding += 1;
                true
            },
            _ => false,
        }
    }

    /// Attach the abort handle of a task counted with [`begin`](Self::begin).
    ///
    /// A retired scope aborts the handle immediately.
    pub(crate) fn attach(&self, scope: &CancelScope, handle: AbortHandle) {
        let mut entries = self.lock();
        match entries.get_mut(&scope.id) {
            Some(entry) if entry.generation == scope.generation => entry.tasks.push(handle),
            _ => handle.abort(),
        }
    }

    /// A task of the scope finished; the last one closes the generation.
    pub(crate) fn finish(&self, scope: &CancelScope) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(&scope.id) {
            if entry.generation == scope.generation {
                entry.outstanding = entry.outstanding.saturating_sub(1);
                if entry.outstanding == 0 {
                    entries.remove(&scope.id);
                }
            }
        }
    }

    /// Close the generation if it never spawned any task.
    pub(crate) fn settle(&self, scope: &CancelScope) {
        let mut entries = self.lock();
        if entries
            .get(&scope.id)
            .is_some_and(|entry| entry.generation == scope.generation && entry.outstanding == 0)
        {
            entries.remove(&scope.id);
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

/// Calls [`CancellationRegistry::finish`] when a scoped task ends, aborted or not.
pub(crate) struct ScopeGuard {
    registry: std::sync::Arc<CancellationRegistry>,
    scope: CancelScope,
}

impl ScopeGuard {
    pub(crate) const fn new(registry: std::sync::Arc<CancellationRegistry>, scope: CancelScope) -> Self {
        Self { registry, scope }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> EffectId {
        EffectId::from_static("feed.load")
    }

    #[test]
    fn test_register_and_finish_closes_generation() {
        let registry = CancellationRegistry::default();
        let scope = registry.register(id());

        assert!(registry.begin(&scope));
        assert!(registry.is_live(&scope));
        assert_eq!(registry.in_flight(), 1);

        registry.finish(&scope);
        assert!(!registry.is_live(&scope));
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_cancel_retires_and_aborts() {
        let registry = CancellationRegistry::default();
        let scope = registry.register(id());
        assert!(registry.begin(&scope));

        let (handle, reg) = AbortHandle::new_pair();
        registry.attach(&scope, handle);

        assert!(registry.cancel(&id()));
        assert!(reg.handle().is_aborted());
        assert!(!registry.is_live(&scope));
        assert!(!registry.begin(&scope));
    }

    #[test]
    fn test_cancel_unknown_id_is_noop() {
        let registry = CancellationRegistry::default();
        assert!(!registry.cancel(&id()));
    }

    #[test]
    fn test_newer_generation_supersedes_older() {
        let registry = CancellationRegistry::default();
        let old = registry.register(id());
        assert!(registry.begin(&old));
        let (old_handle, old_reg) = AbortHandle::new_pair();
        registry.attach(&old, old_handle);

        let new = registry.register(id());

        assert!(old_reg.handle().is_aborted());
        assert!(!registry.is_live(&old));
        assert!(registry.is_live(&new));

        // The old task finishing must not close the new generation
        registry.finish(&old);
        assert!(registry.is_live(&new));
    }

    #[test]
    fn test_attach_to_retired_scope_aborts() {
        let registry = CancellationRegistry::default();
        let scope = registry.register(id());
        registry.settle(&scope);

        let (handle, reg) = AbortHandle::new_pair();
        registry.attach(&scope, handle);
        assert!(reg.handle().is_aborted());
    }
}
