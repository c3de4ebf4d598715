//! Run state observers.

use crate::error::{EnsembleError, EnsembleResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use swagent_types::SwitchRunState;

/// Notified on every committed run state transition.
pub trait StateObserver: Send + Sync {
    fn run_state_changed(&self, state: SwitchRunState);
}

/// Name-keyed set of observers.
///
/// Only weak references are kept; an observer that has been dropped is
/// skipped and pruned.
#[derive(Default)]
pub struct StateObserverRegistry {
    observers: BTreeMap<String, Weak<dyn StateObserver>>,
}

impl StateObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` under `name`. Fails if a live observer already
    /// holds the name.
    pub fn register(&mut self, observer: &Arc<dyn StateObserver>, name: &str) -> EnsembleResult<()> {
        self.prune();
        if self.observers.contains_key(name) {
            return Err(EnsembleError::ObserverNameInUse {
                name: name.to_string(),
            });
        }
        self.observers
            .insert(name.to_string(), Arc::downgrade(observer));
        Ok(())
    }

    /// Removes every registration of `observer`. Returns false if it was
    /// not registered.
    pub fn unregister(&mut self, observer: &Arc<dyn StateObserver>) -> bool {
        let target = Arc::as_ptr(observer);
        let before = self.observers.len();
        self.observers
            .retain(|_, weak| !std::ptr::addr_eq(weak.as_ptr(), target));
        self.observers.len() != before
    }

    /// Live observers, in name order.
    pub fn live(&self) -> Vec<(String, Arc<dyn StateObserver>)> {
        self.observers
            .iter()
            .filter_map(|(name, weak)| weak.upgrade().map(|o| (name.clone(), o)))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.live().into_iter().map(|(name, _)| name).collect()
    }

    /// Drops registrations whose observer is gone.
    pub fn prune(&mut self) {
        self.observers.retain(|_, weak| weak.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<SwitchRunState>>);

    impl StateObserver for Recorder {
        fn run_state_changed(&self, state: SwitchRunState) {
            self.0.lock().push(state);
        }
    }

    fn recorder() -> Arc<dyn StateObserver> {
        Arc::new(Recorder::default())
    }

    #[test]
    fn test_register_unregister_restores_set() {
        let mut registry = StateObserverRegistry::new();
        let keep = recorder();
        registry.register(&keep, "keep").unwrap();
        let before = registry.names();

        let temp = recorder();
        registry.register(&temp, "temp").unwrap();
        assert_eq!(registry.names(), vec!["keep".to_string(), "temp".to_string()]);

        assert!(registry.unregister(&temp));
        assert_eq!(registry.names(), before);
    }

    #[test]
    fn test_unknown_unregister_is_noop() {
        let mut registry = StateObserverRegistry::new();
        let keep = recorder();
        registry.register(&keep, "keep").unwrap();

        assert!(!registry.unregister(&recorder()));
        assert_eq!(registry.names(), vec!["keep".to_string()]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = StateObserverRegistry::new();
        let first = recorder();
        let second = recorder();
        registry.register(&first, "obs").unwrap();
        let err = registry.register(&second, "obs").unwrap_err();
        assert!(matches!(err, EnsembleError::ObserverNameInUse { name } if name == "obs"));
    }

    #[test]
    fn test_dropped_observer_frees_name() {
        let mut registry = StateObserverRegistry::new();
        let first = recorder();
        registry.register(&first, "obs").unwrap();
        drop(first);
        assert!(registry.live().is_empty());

        let second = recorder();
        registry.register(&second, "obs").unwrap();
        assert_eq!(registry.len(), 1);
    }
}
