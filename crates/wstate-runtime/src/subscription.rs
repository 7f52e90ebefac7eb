#![forbid(unsafe_code)]

//! Synchronous change listeners.
//!
//! Views subscribe to derived state (for example, "which forms have unsaved
//! edits") to drive affordances like enabling a Submit button. Listeners run
//! on the UI thread, in subscription order, at the moment the owner decides a
//! change is complete.
//!
//! # How it works
//!
//! 1. `subscribe` stores a callback and returns a [`ListenerId`].
//! 2. The owner calls `notify` once per completed change.
//! 3. `unsubscribe` removes a callback; unknown ids are ignored.

/// A unique identifier for a listener.
///
/// Ids are never reused within one [`Listeners`] set.
pub type ListenerId = u64;

/// An ordered set of callbacks receiving `&T`.
pub struct Listeners<T> {
    next_id: ListenerId,
    active: Vec<(ListenerId, Box<dyn FnMut(&T)>)>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            active: Vec::new(),
        }
    }
}

impl<T> Listeners<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.active.push((id, Box::new(callback)));
        tracing::trace!(listener = id, active = self.active.len(), "listener subscribed");
        id
    }

    /// Remove a callback. Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.active.len();
        self.active.retain(|(lid, _)| *lid != id);
        let removed = self.active.len() != before;
        if removed {
            tracing::trace!(listener = id, "listener unsubscribed");
        }
        removed
    }

    /// Deliver `value` to every listener.
    pub fn notify(&mut self, value: &T) {
        for (_, callback) in &mut self.active {
            callback(value);
        }
    }

    /// Return the number of active listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("active", &self.active.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn notify_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::<u32>::new();

        let l1 = Rc::clone(&log);
        listeners.subscribe(move |v| l1.borrow_mut().push(("first", *v)));
        let l2 = Rc::clone(&log);
        listeners.subscribe(move |v| l2.borrow_mut().push(("second", *v)));

        listeners.notify(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::<()>::new();
        let c = Rc::clone(&count);
        let id = listeners.subscribe(move |_| *c.borrow_mut() += 1);

        listeners.notify(&());
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.notify(&());

        assert_eq!(*count.borrow(), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut listeners = Listeners::<()>::new();
        let a = listeners.subscribe(|_| {});
        listeners.unsubscribe(a);
        let b = listeners.subscribe(|_| {});
        assert_ne!(a, b);
        assert_eq!(listeners.len(), 1);
    }
}
