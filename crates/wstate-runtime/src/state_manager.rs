//! The widget state manager.
//!
//! [`WidgetStateManager`] is the one object views and the backend-message
//! layer talk to. It owns the committed values ([`ValueStore`]), form
//! membership and staged edits ([`FormRegistry`]) and the rerun protocol
//! ([`RerunScheduler`]).
//!
//! # Data flow
//!
//! ```text
//!   backend spec ──set_value(FromBackend)──▶ ValueStore
//!
//!   user edit ──set_value(FromUser)──┬─ standalone ─▶ ValueStore + request_immediate
//!                                    └─ in a form ──▶ FormRegistry::stage_edit
//!                                                      + forms-changed listeners
//!
//!   submit_form ──▶ FormRegistry::submit ──▶ ValueStore + one rerun
//!
//!   close_form ──▶ FormRegistry::close ──▶ ValueStore (clear-on-close), no rerun
//! ```
//!
//! # Event scopes
//!
//! All mutations happen on one logical UI thread. A causal UI event is
//! delimited with [`begin_event`](WidgetStateManager::begin_event) and
//! [`end_event`](WidgetStateManager::end_event) (or
//! [`process_event`](WidgetStateManager::process_event)). Inside a scope:
//!
//! - value writes and staging are visible to reads immediately;
//! - standalone rerun requests coalesce into one, emitted when the scope closes;
//! - forms-changed listeners run at most once, when the scope closes.
//!
//! Calls made outside any scope behave as single-call events.
//!
//! # Widget lifecycle
//!
//! Standalone: `Uninitialized → BackendValue → UserValue (rerun pending) →
//! BackendValue | UserValue`.
//!
//! Form member: `Uninitialized → Committed(backend) → Staged →
//! Committed(user)`, or on submit without an own edit
//! `Committed(backend default)` with clear-on-submit, else unchanged.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

use wstate_core::{
    ElementSpec, FormId, Provenance, StateError, StateResult, WidgetId, WidgetValue,
};

use crate::config::ManagerConfig;
use crate::form_registry::{CloseReport, FormRegistry, FormsData, SubmitOutcome};
use crate::rerun_scheduler::{RerunScheduler, RerunSink, RerunToken, SchedulerStats};
use crate::subscription::{ListenerId, Listeners};
use crate::value_store::{StoreStats, ValueStore};

/// What processing a spec did to the widget's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time this id was seen; value set to the spec default.
    Created,
    /// Known id, structurally compatible spec; value kept.
    Unchanged,
    /// Structural change; value reset to the new default, staged edit dropped.
    Replaced,
}

/// Summary of [`WidgetStateManager::refresh_specs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub created: usize,
    pub replaced: usize,
    /// Widgets removed because the refresh no longer mentions them (sorted).
    pub pruned: Vec<WidgetId>,
}

/// Statistics about the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub elements: usize,
    pub store: StoreStats,
    pub forms: usize,
    pub pending_edits: usize,
    pub scheduler: SchedulerStats,
    pub forms_listeners: usize,
}

/// Owner of all client-side widget state for one session.
pub struct WidgetStateManager {
    config: ManagerConfig,
    elements: HashMap<WidgetId, ElementSpec>,
    store: ValueStore,
    forms: FormRegistry,
    scheduler: RerunScheduler,
    forms_listeners: Listeners<FormsData>,
    forms_dirty: bool,
}

impl Default for WidgetStateManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl WidgetStateManager {
    /// Create a manager. Rerun requests are dropped until a sink is set.
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let scheduler = RerunScheduler::new(config.scheduler.clone());
        Self {
            config,
            elements: HashMap::new(),
            store: ValueStore::new(),
            forms: FormRegistry::new(),
            scheduler,
            forms_listeners: Listeners::new(),
            forms_dirty: false,
        }
    }

    #[must_use]
    pub fn with_rerun_sink(mut self, sink: impl RerunSink + 'static) -> Self {
        self.scheduler.set_sink(sink);
        self
    }

    pub fn set_rerun_sink(&mut self, sink: impl RerunSink + 'static) {
        self.scheduler.set_sink(sink);
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ── Backend specs ────────────────────────────────────────────────────

    /// Process a backend spec for one widget.
    ///
    /// A new id gets its default with provenance backend. A structural change
    /// re-creates the widget. Otherwise the current value is kept and only
    /// the recorded default, form membership and presentation fields follow
    /// the spec.
    pub fn register_element(&mut self, spec: &ElementSpec) -> Registration {
        let registration = match self.elements.get(&spec.id) {
            None => Registration::Created,
            Some(previous) if previous.same_as(spec) => return Registration::Unchanged,
            Some(previous) if spec.is_structural_change_from(previous) => Registration::Replaced,
            Some(_) => Registration::Unchanged,
        };

        if registration == Registration::Replaced {
            tracing::debug!(widget = %spec.id, "widget re-created after structural change");
            if self
                .forms
                .remove_member(&spec.id)
                .is_some_and(|(_, had_pending)| had_pending)
            {
                self.mark_forms_changed();
            }
        }
        if registration != Registration::Unchanged {
            self.store
                .set(spec.id.clone(), spec.default.clone(), Provenance::FromBackend);
        }
        self.store.set_default(spec.id.clone(), spec.default.clone());

        let dropped = match &spec.form_id {
            Some(form) => self.forms.register_member(form, &spec.id),
            None => self
                .forms
                .remove_member(&spec.id)
                .is_some_and(|(_, had_pending)| had_pending),
        };
        if dropped {
            self.mark_forms_changed();
        }

        self.elements.insert(spec.id.clone(), spec.clone());
        registration
    }

    /// Process a full spec set from one script run.
    ///
    /// With `prune_on_refresh`, widgets absent from `specs` are removed.
    /// Runs as one event: listeners fire at most once.
    pub fn refresh_specs(&mut self, specs: &[ElementSpec]) -> RefreshReport {
        self.begin_event();
        let mut report = RefreshReport::default();
        let mut seen = HashSet::with_capacity(specs.len());
        for spec in specs {
            match self.register_element(spec) {
                Registration::Created => report.created += 1,
                Registration::Replaced => report.replaced += 1,
                Registration::Unchanged => {}
            }
            seen.insert(spec.id.clone());
        }

        if self.config.prune_on_refresh {
            let stale: Vec<WidgetId> = self
                .elements
                .keys()
                .filter(|id| !seen.contains(*id))
                .cloned()
                .collect();
            for id in stale {
                self.remove_element(id.as_str());
                report.pruned.push(id);
            }
            report.pruned.sort();
        }

        tracing::debug!(
            specs = specs.len(),
            created = report.created,
            replaced = report.replaced,
            pruned = report.pruned.len(),
            "spec refresh"
        );
        self.end_event();
        report
    }

    /// Forget a widget: its spec, value, default and form membership.
    pub fn remove_element(&mut self, id: &str) -> Option<ElementSpec> {
        let spec = self.elements.remove(id)?;
        self.store.remove(id);
        if self
            .forms
            .remove_member(&spec.id)
            .is_some_and(|(_, had_pending)| had_pending)
        {
            self.mark_forms_changed();
        }
        Some(spec)
    }

    /// Spec last processed for `id`.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<&ElementSpec> {
        self.elements.get(id)
    }

    // ── Values ───────────────────────────────────────────────────────────

    /// Set a widget's value.
    ///
    /// - `FromBackend`: committed directly; forms and reruns untouched.
    /// - `FromUser` on a standalone widget: committed, rerun requested.
    /// - `FromUser` on a form member: staged until the form is submitted.
    ///
    /// A backend write registers `element` first, so it also works as the
    /// widget's mount call. A user edit registers it only when the id is new;
    /// otherwise `element` must still match the spec the manager holds.
    ///
    /// # Errors
    ///
    /// - [`StateError::KindMismatch`] if `value`, or a user edit's `element`,
    ///   has a different kind than the widget.
    /// - [`StateError::StaleSpec`] if a user edit comes through a spec whose
    ///   parameters or form the backend has since changed.
    ///
    /// Nothing is written in either case.
    pub fn set_value(
        &mut self,
        element: &ElementSpec,
        value: WidgetValue,
        provenance: Provenance,
    ) -> StateResult<()> {
        let id = &element.id;
        let form = match provenance {
            Provenance::FromBackend => {
                self.register_element(element);
                element.form_id.clone()
            }
            Provenance::FromUser => self.current_form_for_edit(element)?,
        };

        let expected = self
            .store
            .get(id)
            .map(WidgetValue::kind)
            .unwrap_or_else(|| element.kind());
        let found = value.kind();
        if found != expected {
            tracing::error!(
                widget = %id,
                %expected,
                %found,
                %provenance,
                "value kind does not match widget"
            );
            return Err(StateError::KindMismatch {
                widget: id.clone(),
                expected,
                found,
            });
        }

        match (provenance, form) {
            (Provenance::FromBackend, _) => {
                self.store.set(id.clone(), value, Provenance::FromBackend);
            }
            (Provenance::FromUser, None) => {
                self.store.set(id.clone(), value, Provenance::FromUser);
                self.scheduler.request_immediate(id.clone());
            }
            (Provenance::FromUser, Some(form)) => {
                if self.forms.stage_edit(&form, id, value) {
                    self.mark_forms_changed();
                }
            }
        }
        Ok(())
    }

    /// Form a user edit through `element` is routed to. New ids are
    /// registered; known ids must not have been re-specified since the view
    /// took its copy of the spec.
    fn current_form_for_edit(&mut self, element: &ElementSpec) -> StateResult<Option<FormId>> {
        let Some(current) = self.elements.get(&element.id) else {
            self.register_element(element);
            return Ok(element.form_id.clone());
        };

        let id = &element.id;
        if element.kind() != current.kind() {
            let (expected, found) = (current.kind(), element.kind());
            tracing::error!(
                widget = %id,
                %expected,
                %found,
                "edit through a spec of another kind"
            );
            return Err(StateError::KindMismatch {
                widget: id.clone(),
                expected,
                found,
            });
        }
        if element.is_structural_change_from(current) || element.form_id != current.form_id {
            tracing::error!(widget = %id, "edit through a stale spec rejected");
            return Err(StateError::StaleSpec { widget: id.clone() });
        }
        Ok(current.form_id.clone())
    }

    /// Committed value: what the backend has seen or will see on the next
    /// rerun. `None` for widgets not specified yet.
    #[must_use]
    pub fn get_value(&self, id: &str) -> Option<&WidgetValue> {
        self.store.get(id)
    }

    /// Value a view should render: the staged edit if the widget's form has
    /// one, else the committed value.
    #[must_use]
    pub fn get_display_value(&self, id: &str) -> Option<&WidgetValue> {
        self.forms
            .staged_value(id)
            .or_else(|| self.store.get(id))
    }

    /// Provenance of the committed value.
    #[must_use]
    pub fn provenance(&self, id: &str) -> Option<Provenance> {
        self.store.entry(id).map(|e| e.provenance)
    }

    // ── Forms ────────────────────────────────────────────────────────────

    pub fn set_form_clear_on_submit(&mut self, form: &FormId, clear: bool) {
        self.forms.set_clear_on_submit(form, clear);
    }

    /// Commit a form's staged edits and request exactly one rerun.
    ///
    /// Unknown forms are ignored (logged), since forms can vanish between
    /// reruns.
    pub fn submit_form(&mut self, form: &FormId) -> SubmitOutcome {
        let outcome = self
            .forms
            .submit(form, &mut self.store, &mut self.scheduler);
        if let SubmitOutcome::Submitted(report) = &outcome
            && (!report.applied.is_empty() || report.closed)
        {
            self.mark_forms_changed();
        }
        outcome
    }

    pub fn set_form_clear_on_close(&mut self, form: &FormId, clear: bool) {
        self.forms.set_clear_on_close(form, clear);
    }

    pub fn set_form_close_on_submit(&mut self, form: &FormId, close: bool) {
        self.forms.set_close_on_submit(form, close);
    }

    /// Show a form as an open dialog.
    pub fn open_form(&mut self, form: &FormId) {
        if self.forms.open(form) {
            self.mark_forms_changed();
        }
    }

    /// Close a dialog form without submitting.
    ///
    /// Staged edits are dropped and, with clear-on-close, every member is
    /// reset to its backend default. No rerun is requested. `None` for an
    /// unknown form.
    pub fn close_form(&mut self, form: &FormId) -> Option<CloseReport> {
        let report = self.forms.close(form, &mut self.store)?;
        self.mark_forms_changed();
        Some(report)
    }

    /// Drop a form's staged edits without committing or rerunning.
    pub fn discard_pending(&mut self, form: &FormId) -> usize {
        let discarded = self.forms.discard_pending(form);
        if discarded > 0 {
            self.mark_forms_changed();
        }
        discarded
    }

    pub fn add_submit_button(&mut self, form: &FormId) {
        self.forms.add_submit_button(form);
        self.mark_forms_changed();
    }

    pub fn remove_submit_button(&mut self, form: &FormId) {
        self.forms.remove_submit_button(form);
        self.mark_forms_changed();
    }

    #[must_use]
    pub fn forms_data(&self) -> FormsData {
        self.forms.forms_data()
    }

    /// Subscribe to forms-changed notifications.
    ///
    /// Delivered synchronously, at most once per event, after any change to
    /// a form's staged edits or submit buttons.
    pub fn on_forms_data_changed(
        &mut self,
        callback: impl FnMut(&FormsData) + 'static,
    ) -> ListenerId {
        self.forms_listeners.subscribe(callback)
    }

    pub fn remove_forms_listener(&mut self, id: ListenerId) -> bool {
        self.forms_listeners.unsubscribe(id)
    }

    fn mark_forms_changed(&mut self) {
        self.forms_dirty = true;
        if !self.scheduler.in_event() {
            self.deliver_forms_changed();
        }
    }

    fn deliver_forms_changed(&mut self) {
        if !std::mem::take(&mut self.forms_dirty) {
            return;
        }
        let data = self.forms.forms_data();
        tracing::trace!(
            pending_forms = data.forms_with_pending_changes.len(),
            listeners = self.forms_listeners.len(),
            "forms changed"
        );
        self.forms_listeners.notify(&data);
    }

    // ── Events and reruns ────────────────────────────────────────────────

    /// Open a UI event scope.
    pub fn begin_event(&mut self) {
        self.scheduler.begin_event();
    }

    /// Close a UI event scope. Closing the outermost scope emits the
    /// coalesced rerun (if any) and delivers forms-changed listeners.
    pub fn end_event(&mut self) -> Option<RerunToken> {
        let token = self.scheduler.end_event();
        if !self.scheduler.in_event() {
            self.deliver_forms_changed();
        }
        token
    }

    /// Run `f` as one UI event.
    pub fn process_event<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_event();
        let result = f(self);
        self.end_event();
        result
    }

    /// Advance the scheduler clock; flushes a batch past its deadline.
    pub fn tick(&mut self) -> Option<RerunToken> {
        self.scheduler.tick()
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<RerunToken> {
        self.scheduler.tick_at(now)
    }

    /// Number of rerun requests emitted so far.
    #[inline]
    #[must_use]
    pub fn rerun_count(&self) -> u64 {
        self.scheduler.rerun_count()
    }

    #[inline]
    #[must_use]
    pub fn has_pending_rerun(&self) -> bool {
        self.scheduler.has_pending()
    }

    // ── Introspection ────────────────────────────────────────────────────

    #[must_use]
    pub fn value_store(&self) -> &ValueStore {
        &self.store
    }

    #[must_use]
    pub fn form_registry(&self) -> &FormRegistry {
        &self.forms
    }

    #[must_use]
    pub fn scheduler(&self) -> &RerunScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            elements: self.elements.len(),
            store: self.store.stats(),
            forms: self.forms.len(),
            pending_edits: self.forms.pending_count(),
            scheduler: self.scheduler.stats(),
            forms_listeners: self.forms_listeners.len(),
        }
    }
}

impl fmt::Debug for WidgetStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetStateManager")
            .field("elements", &self.elements.len())
            .field("store", &self.store)
            .field("forms", &self.forms.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
