//! Committed widget values.
//!
//! The [`ValueStore`] is the flat table views read from: one [`ValueEntry`]
//! per widget id, holding the committed value and where it came from. It also
//! remembers each widget's backend default so forms can reset members on
//! submit.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ValueStore                            │
//! │   entries:  WidgetId -> { value, provenance }                 │
//! │   defaults: WidgetId -> backend default                       │
//! └──────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 written by WidgetStateManager
//!                 and FormRegistry::submit only
//! ```
//!
//! # Design Invariants
//!
//! 1. **One entry per id**: `set` overwrites; there is never more than one
//!    value for a widget.
//! 2. **Last write wins**: no versioning. Ordering is the manager's job.
//! 3. **No kind checks**: the store accepts any value; the manager rejects
//!    kind mismatches before calling in.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `get` on unknown id | `None` |
//! | `set` on unknown id | Entry inserted |
//! | `reset_to_default` without recorded default | Returns `false`, entry untouched |

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use wstate_core::{Provenance, WidgetId, WidgetValue};

// ─────────────────────────────────────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────────────────────────────────────

/// A committed widget value.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueEntry {
    pub id: WidgetId,
    pub value: WidgetValue,
    pub provenance: Provenance,
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Store
// ─────────────────────────────────────────────────────────────────────────────

/// Table of committed widget values.
#[derive(Default)]
pub struct ValueStore {
    entries: HashMap<WidgetId, ValueEntry>,
    defaults: HashMap<WidgetId, WidgetValue>,
}

impl ValueStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed value for `id`, or `None` if the widget is not known yet.
    #[must_use]
    pub fn get<Q>(&self, id: &Q) -> Option<&WidgetValue>
    where
        WidgetId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(id).map(|e| &e.value)
    }

    /// Full entry (value plus provenance) for `id`.
    #[must_use]
    pub fn entry<Q>(&self, id: &Q) -> Option<&ValueEntry>
    where
        WidgetId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(id)
    }

    #[must_use]
    pub fn has<Q>(&self, id: &Q) -> bool
    where
        WidgetId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(id)
    }

    /// Write a value, replacing any previous entry for the id.
    ///
    /// Returns the previous entry if one existed.
    pub fn set(
        &mut self,
        id: WidgetId,
        value: WidgetValue,
        provenance: Provenance,
    ) -> Option<ValueEntry> {
        tracing::trace!(widget = %id, %provenance, kind = %value.kind(), "value set");
        let entry = ValueEntry {
            id: id.clone(),
            value,
            provenance,
        };
        self.entries.insert(id, entry)
    }

    /// Record the backend default used by [`reset_to_default`](Self::reset_to_default).
    pub fn set_default(&mut self, id: WidgetId, default: WidgetValue) {
        self.defaults.insert(id, default);
    }

    /// Backend default recorded for `id`.
    #[must_use]
    pub fn default_of<Q>(&self, id: &Q) -> Option<&WidgetValue>
    where
        WidgetId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.defaults.get(id)
    }

    /// Overwrite the entry for `id` with its recorded default, provenance
    /// backend. Returns `false` when no default is recorded.
    pub fn reset_to_default(&mut self, id: &WidgetId) -> bool {
        let Some(default) = self.defaults.get(id).cloned() else {
            return false;
        };
        self.set(id.clone(), default, Provenance::FromBackend);
        true
    }

    /// Remove the entry and the recorded default for `id`.
    pub fn remove<Q>(&mut self, id: &Q) -> Option<ValueEntry>
    where
        WidgetId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.defaults.remove(id);
        self.entries.remove(id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All widget ids with an entry, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<WidgetId> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &ValueEntry> {
        self.entries.values()
    }
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore")
            .field("entries", &self.entries.len())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

/// Statistics about the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of entries.
    pub entry_count: usize,
    /// Entries last written by a user edit.
    pub user_count: usize,
    /// Entries last written from a backend spec.
    pub backend_count: usize,
    /// Widgets with a recorded default.
    pub default_count: usize,
}

impl ValueStore {
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let user_count = self
            .entries
            .values()
            .filter(|e| e.provenance.is_user())
            .count();
        StoreStats {
            entry_count: self.entries.len(),
            user_count,
            backend_count: self.entries.len() - user_count,
            default_count: self.defaults.len(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> WidgetId {
        WidgetId::from(s)
    }

    #[test]
    fn store_basic_operations() {
        let mut store = ValueStore::new();

        // Initially empty
        assert!(store.is_empty());
        assert!(store.get("t1").is_none());
        assert!(!store.has("t1"));

        // Unknown id is inserted
        let prev = store.set(id("t1"), "12:45".into(), Provenance::FromBackend);
        assert!(prev.is_none());
        assert!(store.has("t1"));
        assert_eq!(store.get("t1"), Some(&WidgetValue::from("12:45")));

        // Overwrite returns the old entry
        let prev = store
            .set(id("t1"), "12:08".into(), Provenance::FromUser)
            .unwrap();
        assert_eq!(prev.value, WidgetValue::from("12:45"));
        assert_eq!(prev.provenance, Provenance::FromBackend);

        let entry = store.entry("t1").unwrap();
        assert_eq!(entry.value, WidgetValue::from("12:08"));
        assert_eq!(entry.provenance, Provenance::FromUser);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_accepts_any_kind() {
        let mut store = ValueStore::new();
        store.set(id("x"), "a".into(), Provenance::FromBackend);
        store.set(id("x"), 1.0.into(), Provenance::FromBackend);
        assert_eq!(store.get("x"), Some(&WidgetValue::Number(1.0)));
    }

    #[test]
    fn reset_to_default() {
        let mut store = ValueStore::new();
        store.set_default(id("t1"), "12:45".into());
        store.set(id("t1"), "12:08".into(), Provenance::FromUser);

        assert!(store.reset_to_default(&id("t1")));
        let entry = store.entry("t1").unwrap();
        assert_eq!(entry.value, WidgetValue::from("12:45"));
        assert_eq!(entry.provenance, Provenance::FromBackend);
    }

    #[test]
    fn reset_without_default_is_noop() {
        let mut store = ValueStore::new();
        store.set(id("t1"), "12:08".into(), Provenance::FromUser);
        assert!(!store.reset_to_default(&id("t1")));
        assert_eq!(store.get("t1"), Some(&WidgetValue::from("12:08")));
    }

    #[test]
    fn remove_drops_default_too() {
        let mut store = ValueStore::new();
        store.set_default(id("a"), true.into());
        store.set(id("a"), true.into(), Provenance::FromBackend);

        let removed = store.remove("a").unwrap();
        assert_eq!(removed.value, WidgetValue::Bool(true));
        assert!(store.default_of("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn store_stats() {
        let mut store = ValueStore::new();
        store.set_default(id("a"), 1.0.into());
        store.set(id("a"), 1.0.into(), Provenance::FromBackend);
        store.set(id("b"), 2.0.into(), Provenance::FromUser);
        store.set(id("c"), 3.0.into(), Provenance::FromUser);

        let stats = store.stats();
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.user_count, 2);
        assert_eq!(stats.backend_count, 1);
        assert_eq!(stats.default_count, 1);
    }

    #[test]
    fn ids_lists_every_entry() {
        let mut store = ValueStore::new();
        store.set(id("b"), 2.0.into(), Provenance::FromBackend);
        store.set(id("a"), 1.0.into(), Provenance::FromBackend);

        let mut ids = store.ids();
        ids.sort();
        assert_eq!(ids, vec![id("a"), id("b")]);
        assert_eq!(store.iter().count(), 2);
    }
}
