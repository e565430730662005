//! Client-side navigation
//!
//! [`History`] holds the current [`Location`] together with back/forward
//! stacks. Programmatic navigation goes through [`History::push_state`];
//! back/forward traversal goes through [`History::back`] and
//! [`History::forward`]. Observers registered with [`History::observe`] are
//! notified after every route change and stay registered for the lifetime of
//! the history.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::host::Location;

/// How the route change happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Programmatic `pushState`
    Push,
    /// Back/forward traversal (`popstate`)
    Pop,
}

/// Receives a callback on every route change
pub trait NavigationObserver: Send + Sync {
    fn on_route_change(&self, kind: NavigationKind);
}

#[derive(Debug, Default)]
struct Stacks {
    back: Vec<Location>,
    forward: Vec<Location>,
}

/// Session history of a page
pub struct History {
    current: RwLock<Location>,
    stacks: Mutex<Stacks>,
    observers: Mutex<Vec<Arc<dyn NavigationObserver>>>,
}

impl History {
    pub fn new(initial: Location) -> Self {
        Self {
            current: RwLock::new(initial),
            stacks: Mutex::new(Stacks::default()),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// The location currently displayed
    pub fn current(&self) -> Location {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries up to and including the current one
    pub fn depth(&self) -> usize {
        let stacks = self.stacks.lock().unwrap_or_else(PoisonError::into_inner);
        stacks.back.len() + 1
    }

    /// Register an observer for every future route change
    pub fn observe(&self, observer: Arc<dyn NavigationObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.push(observer);
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Navigate to `target`, resolved against the current location
    ///
    /// Clears the forward stack, then notifies observers.
    pub fn push_state(&self, target: &str) -> Result<(), url::ParseError> {
        let next = self.current().resolve(target)?;
        {
            let mut stacks = self.stacks.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = self.replace_current(next.clone());
            stacks.back.push(previous);
            stacks.forward.clear();
        }
        debug!(url = %next, "pushState");
        self.notify(NavigationKind::Push);
        Ok(())
    }

    /// Go back one entry. Returns false when there is nothing to go back to.
    pub fn back(&self) -> bool {
        let moved = {
            let mut stacks = self.stacks.lock().unwrap_or_else(PoisonError::into_inner);
            match stacks.back.pop() {
                Some(previous) => {
                    let current = self.replace_current(previous);
                    stacks.forward.push(current);
                    true
                }
                None => false,
            }
        };
        if moved {
            self.notify(NavigationKind::Pop);
        }
        moved
    }

    /// Go forward one entry. Returns false when there is nothing ahead.
    pub fn forward(&self) -> bool {
        let moved = {
            let mut stacks = self.stacks.lock().unwrap_or_else(PoisonError::into_inner);
            match stacks.forward.pop() {
                Some(next) => {
                    let current = self.replace_current(next);
                    stacks.back.push(current);
                    true
                }
                None => false,
            }
        };
        if moved {
            self.notify(NavigationKind::Pop);
        }
        moved
    }

    fn replace_current(&self, next: Location) -> Location {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }

    // Observers run without any history lock held; they usually read the
    // current location back.
    fn notify(&self, kind: NavigationKind) {
        let observers: Vec<_> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_route_change(kind);
        }
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("current", &self.current())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(NavigationKind, String)>>,
        history: Mutex<Option<Arc<History>>>,
    }

    impl NavigationObserver for Recorder {
        fn on_route_change(&self, kind: NavigationKind) {
            let path = self
                .history
                .lock()
                .unwrap()
                .as_ref()
                .map(|h| h.current().pathname)
                .unwrap_or_default();
            self.seen.lock().unwrap().push((kind, path));
        }
    }

    fn history_at(url: &str) -> Arc<History> {
        Arc::new(History::new(Location::parse(url).unwrap()))
    }

    #[test]
    fn push_state_updates_location_before_notifying() {
        let history = history_at("https://example.com/");
        let recorder = Arc::new(Recorder::default());
        *recorder.history.lock().unwrap() = Some(Arc::clone(&history));
        history.observe(recorder.clone());

        history.push_state("/pricing?plan=pro").unwrap();

        assert_eq!(history.current().pathname, "/pricing");
        assert_eq!(history.current().search, "?plan=pro");
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![(NavigationKind::Push, "/pricing".to_string())]
        );
    }

    #[test]
    fn back_and_forward_fire_pop_events() {
        let history = history_at("https://example.com/a");
        let recorder = Arc::new(Recorder::default());
        *recorder.history.lock().unwrap() = Some(Arc::clone(&history));

        history.push_state("/b").unwrap();
        history.observe(recorder.clone());

        assert!(history.back());
        assert_eq!(history.current().pathname, "/a");
        assert!(history.forward());
        assert_eq!(history.current().pathname, "/b");
        assert!(!history.forward());

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (NavigationKind::Pop, "/a".to_string()),
                (NavigationKind::Pop, "/b".to_string()),
            ]
        );
    }

    #[test]
    fn back_on_first_entry_is_a_no_op() {
        let history = history_at("https://example.com/");
        let recorder = Arc::new(Recorder::default());
        history.observe(recorder.clone());

        assert!(!history.back());
        assert!(recorder.seen.lock().unwrap().is_empty());
        assert_eq!(history.depth(), 1);
    }

    #[test]
    fn push_state_clears_forward_stack() {
        let history = history_at("https://example.com/a");
        history.push_state("/b").unwrap();
        history.back();
        history.push_state("/c").unwrap();
        assert!(!history.forward());
        assert_eq!(history.depth(), 2);
    }
}
