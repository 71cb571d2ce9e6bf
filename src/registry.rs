//! Append-only callback tables keyed by event and behaviour name.

use std::collections::HashMap;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::error::Result;
use crate::event::{Event, Value};
use crate::page::Page;

/// Callback run for an element declaring a handler name. Receives the event and
/// the element carrying the handler attribute.
pub type HandlerFn = Rc<dyn Fn(&mut Page, &Event, NodeId) -> Result<()>>;

/// Callback run once per element declaring an observer name. Receives the
/// event, the observing element and the arguments the event was triggered with.
pub type ObserverFn = Rc<dyn Fn(&mut Page, &Event, NodeId, &[Value]) -> Result<()>>;

#[derive(Default, Clone)]
pub(crate) struct HandlerRegistry {
    map: HashMap<String, HashMap<String, Vec<HandlerFn>>>,
}

impl HandlerRegistry {
    /// Appends `callback` for `(event, handler)`. Returns `true` when this is the
    /// first registration for `event`, i.e. when a listener must be bound.
    pub(crate) fn register(&mut self, event: &str, handler: &str, callback: HandlerFn) -> bool {
        let first = !self.map.contains_key(event);
        self.map
            .entry(event.to_string())
            .or_default()
            .entry(handler.to_string())
            .or_default()
            .push(callback);
        first
    }

    /// Snapshot of the callbacks for `(event, handler)` in registration order.
    pub(crate) fn callbacks_for(&self, event: &str, handler: &str) -> Vec<HandlerFn> {
        self.map
            .get(event)
            .and_then(|handlers| handlers.get(handler))
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn callback_count(&self, event: &str, handler: &str) -> usize {
        self.map
            .get(event)
            .and_then(|handlers| handlers.get(handler))
            .map_or(0, Vec::len)
    }
}

#[derive(Clone)]
pub(crate) struct ObserverEntry {
    pub(crate) observer: String,
    pub(crate) callback: ObserverFn,
}

#[derive(Default, Clone)]
pub(crate) struct ObserverRegistry {
    map: HashMap<String, Vec<ObserverEntry>>,
}

impl ObserverRegistry {
    /// Appends an entry for `event`. Returns `true` when this is the first entry
    /// for `event`.
    pub(crate) fn register(&mut self, event: &str, observer: &str, callback: ObserverFn) -> bool {
        let entries = self.map.entry(event.to_string()).or_default();
        let first = entries.is_empty();
        entries.push(ObserverEntry {
            observer: observer.to_string(),
            callback,
        });
        first
    }

    /// Snapshot of the entries for `event` in registration order.
    pub(crate) fn entries_for(&self, event: &str) -> Vec<ObserverEntry> {
        self.map.get(event).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self, event: &str) -> usize {
        self.map.get(event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> HandlerFn {
        Rc::new(|_, _, _| Ok(()))
    }

    fn noop_observer() -> ObserverFn {
        Rc::new(|_, _, _, _| Ok(()))
    }

    #[test]
    fn first_registration_per_event_is_reported_once() {
        let mut handlers = HandlerRegistry::default();
        assert!(handlers.register("click", "save", noop_handler()));
        assert!(!handlers.register("click", "close", noop_handler()));
        assert!(!handlers.register("click", "save", noop_handler()));
        assert!(handlers.register("submit", "save", noop_handler()));
        assert_eq!(handlers.callback_count("click", "save"), 2);
        assert_eq!(handlers.callback_count("click", "close"), 1);
    }

    #[test]
    fn callbacks_keep_registration_order() {
        let mut handlers = HandlerRegistry::default();
        let first = noop_handler();
        let second = noop_handler();
        handlers.register("click", "save", Rc::clone(&first));
        handlers.register("click", "save", Rc::clone(&second));
        let callbacks = handlers.callbacks_for("click", "save");
        assert_eq!(callbacks.len(), 2);
        assert!(Rc::ptr_eq(&callbacks[0], &first));
        assert!(Rc::ptr_eq(&callbacks[1], &second));
    }

    #[test]
    fn unknown_pairs_yield_empty_snapshots() {
        let mut handlers = HandlerRegistry::default();
        handlers.register("click", "save", noop_handler());
        assert!(handlers.callbacks_for("click", "missing").is_empty());
        assert!(handlers.callbacks_for("keyup", "save").is_empty());

        let observers = ObserverRegistry::default();
        assert!(observers.entries_for("refresh").is_empty());
    }

    #[test]
    fn observer_entries_allow_repeated_names() {
        let mut observers = ObserverRegistry::default();
        assert!(observers.register("refresh", "panel", noop_observer()));
        assert!(!observers.register("refresh", "panel", noop_observer()));
        assert!(!observers.register("refresh", "menu", noop_observer()));
        let names = observers
            .entries_for("refresh")
            .into_iter()
            .map(|entry| entry.observer)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["panel", "panel", "menu"]);
        assert_eq!(observers.entry_count("refresh"), 3);
    }

    #[test]
    fn snapshots_do_not_see_later_registrations() {
        let mut handlers = HandlerRegistry::default();
        handlers.register("click", "save", noop_handler());
        let snapshot = handlers.callbacks_for("click", "save");
        handlers.register("click", "save", noop_handler());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(handlers.callback_count("click", "save"), 2);
    }
}
