//! Form membership and staged edits.
//!
//! A form buffers its members' edits until it is submitted. Until then the
//! committed values in the [`ValueStore`] stay what the backend last saw,
//! while views render the staged values.
//!
//! # Design Invariants
//!
//! 1. **Staged ⊆ members**: a staged edit always belongs to a registered
//!    member; staging for an unregistered widget registers it first.
//! 2. **Atomic submit**: staged edits are applied, cleared, reset and the
//!    rerun requested in one call; no observer sees a half-applied form.
//! 3. **Forms persist**: a `FormState` is never removed within a session.
//!    Members come and go as the backend re-specifies widgets.
//! 4. **One form per widget**: registering a widget with a new form moves it
//!    and drops its staged edit in the old form.
//! 5. **Close never reruns**: closing a dialog form discards staged edits and,
//!    with clear-on-close, resets members to their defaults. The backend
//!    learns of it on the next rerun raised by something else.
//!
//! # Dialog forms
//!
//! A form shown as a dialog is opened by the view and closed either by the
//! user dismissing it ([`FormRegistry::close`]) or, with close-on-submit, by
//! a submit. A close caused by a submit does not apply clear-on-close: the
//! submitted values must reach the backend.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Submit of unknown or memberless form | `SubmitOutcome::UnknownForm`, logged at warn, no rerun |
//! | Clear-on-submit member without recorded default | Member left unchanged |
//! | Close of unknown or memberless form | `None`, logged at warn |

use std::collections::{BTreeMap, BTreeSet, HashMap};

use wstate_core::{FormId, Provenance, WidgetId, WidgetValue};

use crate::rerun_scheduler::{RerunScheduler, RerunToken};
use crate::value_store::ValueStore;

// ─────────────────────────────────────────────────────────────────────────────
// Form state
// ─────────────────────────────────────────────────────────────────────────────

/// State of one form.
#[derive(Clone, Debug)]
pub struct FormState {
    form_id: FormId,
    clear_on_submit: bool,
    clear_on_close: bool,
    close_on_submit: bool,
    open: bool,
    pending_edits: BTreeMap<WidgetId, WidgetValue>,
    member_ids: BTreeSet<WidgetId>,
    submit_buttons: u32,
}

impl FormState {
    fn new(form_id: FormId) -> Self {
        Self {
            form_id,
            clear_on_submit: false,
            clear_on_close: false,
            close_on_submit: false,
            open: false,
            pending_edits: BTreeMap::new(),
            member_ids: BTreeSet::new(),
            submit_buttons: 0,
        }
    }

    #[must_use]
    pub fn form_id(&self) -> &FormId {
        &self.form_id
    }

    #[must_use]
    pub fn clear_on_submit(&self) -> bool {
        self.clear_on_submit
    }

    #[must_use]
    pub fn clear_on_close(&self) -> bool {
        self.clear_on_close
    }

    #[must_use]
    pub fn close_on_submit(&self) -> bool {
        self.close_on_submit
    }

    /// Whether the form is currently shown as an open dialog.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn pending_edits(&self) -> &BTreeMap<WidgetId, WidgetValue> {
        &self.pending_edits
    }

    #[must_use]
    pub fn member_ids(&self) -> &BTreeSet<WidgetId> {
        &self.member_ids
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_edits.is_empty()
    }

    #[must_use]
    pub fn submit_buttons(&self) -> u32 {
        self.submit_buttons
    }
}

/// Snapshot handed to forms-changed listeners.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormsData {
    /// Forms with at least one staged edit.
    pub forms_with_pending_changes: BTreeSet<FormId>,
    /// Registered submit buttons per form (forms without buttons omitted).
    pub submit_buttons: BTreeMap<FormId, u32>,
    /// Dialog forms currently open.
    pub open_forms: BTreeSet<FormId>,
}

impl FormsData {
    #[must_use]
    pub fn has_pending_changes(&self, form: &FormId) -> bool {
        self.forms_with_pending_changes.contains(form)
    }

    #[must_use]
    pub fn has_submit_button(&self, form: &FormId) -> bool {
        self.submit_buttons.get(form).is_some_and(|n| *n > 0)
    }

    #[must_use]
    pub fn is_open(&self, form: &FormId) -> bool {
        self.open_forms.contains(form)
    }
}

/// What a submit did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitReport {
    pub form: FormId,
    /// Members whose staged edit was committed.
    pub applied: Vec<WidgetId>,
    /// Members reset to their backend default by clear-on-submit.
    pub reset: Vec<WidgetId>,
    /// Token of the rerun request the submit raised.
    pub token: RerunToken,
    /// The submit closed an open dialog form (close-on-submit).
    pub closed: bool,
}

/// What closing a dialog form did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReport {
    pub form: FormId,
    /// Staged edits dropped without commit.
    pub discarded: usize,
    /// Members reset to their backend default by clear-on-close.
    pub reset: Vec<WidgetId>,
}

/// Result of [`FormRegistry::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(SubmitReport),
    /// The form has no registered members. Nothing happened.
    UnknownForm(FormId),
}

impl SubmitOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&SubmitReport> {
        match self {
            Self::Submitted(report) => Some(report),
            Self::UnknownForm(_) => None,
        }
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// All forms of a session.
#[derive(Debug, Default)]
pub struct FormRegistry {
    forms: HashMap<FormId, FormState>,
    membership: HashMap<WidgetId, FormId>,
}

impl FormRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn form_mut(&mut self, form: &FormId) -> &mut FormState {
        self.forms
            .entry(form.clone())
            .or_insert_with(|| FormState::new(form.clone()))
    }

    /// Add `widget` to `form`, creating the form if needed. Idempotent.
    ///
    /// Returns `true` if a staged edit was dropped because the widget moved
    /// out of another form.
    pub fn register_member(&mut self, form: &FormId, widget: &WidgetId) -> bool {
        let mut dropped = false;
        if let Some(previous) = self.membership.get(widget)
            && previous != form
        {
            let previous = previous.clone();
            dropped = self.remove_member(widget).is_some_and(|(_, had)| had);
            tracing::debug!(%widget, from = %previous, to = %form, "widget moved between forms");
        }
        self.form_mut(form).member_ids.insert(widget.clone());
        self.membership.insert(widget.clone(), form.clone());
        dropped
    }

    /// Remove `widget` from its form, discarding any staged edit.
    ///
    /// Returns the form and whether a staged edit was discarded.
    pub fn remove_member(&mut self, widget: &WidgetId) -> Option<(FormId, bool)> {
        let form = self.membership.remove(widget)?;
        let state = self.forms.get_mut(&form)?;
        state.member_ids.remove(widget);
        let had_pending = state.pending_edits.remove(widget).is_some();
        if had_pending {
            tracing::warn!(%widget, %form, "staged edit discarded with form member");
        }
        Some((form, had_pending))
    }

    /// Form the widget belongs to.
    #[must_use]
    pub fn form_of(&self, widget: &str) -> Option<&FormId> {
        self.membership.get(widget)
    }

    /// Set the clear-on-submit flag, creating the form if needed. Idempotent.
    pub fn set_clear_on_submit(&mut self, form: &FormId, clear: bool) {
        self.form_mut(form).clear_on_submit = clear;
    }

    /// Set the clear-on-close flag, creating the form if needed.
    pub fn set_clear_on_close(&mut self, form: &FormId, clear: bool) {
        self.form_mut(form).clear_on_close = clear;
    }

    /// Set the close-on-submit flag, creating the form if needed.
    pub fn set_close_on_submit(&mut self, form: &FormId, close: bool) {
        self.form_mut(form).close_on_submit = close;
    }

    /// Show `form` as an open dialog, creating the form if needed.
    ///
    /// Returns `false` if it was already open.
    pub fn open(&mut self, form: &FormId) -> bool {
        !std::mem::replace(&mut self.form_mut(form).open, true)
    }

    /// Close `form` without submitting.
    ///
    /// 1. Staged edits are dropped.
    /// 2. With clear-on-close, every member is reset to its backend default.
    /// 3. No rerun is requested.
    ///
    /// Closing an already closed form still applies 1 and 2.
    pub fn close(&mut self, form: &FormId, store: &mut ValueStore) -> Option<CloseReport> {
        let Some(state) = self
            .forms
            .get_mut(form)
            .filter(|s| !s.member_ids.is_empty())
        else {
            tracing::warn!(%form, "close for unknown form ignored");
            return None;
        };

        state.open = false;
        let discarded = std::mem::take(&mut state.pending_edits).len();
        let mut reset = Vec::new();
        if state.clear_on_close {
            for member in &state.member_ids {
                if store.reset_to_default(member) {
                    reset.push(member.clone());
                }
            }
        }
        tracing::debug!(%form, discarded, reset = reset.len(), "form closed");

        Some(CloseReport {
            form: form.clone(),
            discarded,
            reset,
        })
    }

    /// Record an uncommitted edit. The value store is not touched.
    ///
    /// Returns `true` if the staged edits changed (a new widget was staged or
    /// an existing staged value differs).
    pub fn stage_edit(&mut self, form: &FormId, widget: &WidgetId, value: WidgetValue) -> bool {
        self.register_member(form, widget);
        let state = self.form_mut(form);
        let changed = state.pending_edits.get(widget) != Some(&value);
        if changed {
            tracing::trace!(%widget, %form, "edit staged");
            state.pending_edits.insert(widget.clone(), value);
        }
        changed
    }

    /// Staged value for `widget`, if its form has one.
    #[must_use]
    pub fn staged_value(&self, widget: &str) -> Option<&WidgetValue> {
        let form = self.membership.get(widget)?;
        self.forms.get(form)?.pending_edits.get(widget)
    }

    /// Drop every staged edit of `form` without committing. Returns how many
    /// edits were discarded.
    pub fn discard_pending(&mut self, form: &FormId) -> usize {
        let Some(state) = self.forms.get_mut(form) else {
            return 0;
        };
        let count = state.pending_edits.len();
        state.pending_edits.clear();
        count
    }

    /// Commit `form`.
    ///
    /// 1. Every staged edit is written to `store` with provenance user.
    /// 2. Staged edits are cleared.
    /// 3. With clear-on-submit, every other member is reset to its backend
    ///    default.
    /// 4. Exactly one rerun is requested from `scheduler`.
    pub fn submit(
        &mut self,
        form: &FormId,
        store: &mut ValueStore,
        scheduler: &mut RerunScheduler,
    ) -> SubmitOutcome {
        let Some(state) = self
            .forms
            .get_mut(form)
            .filter(|s| !s.member_ids.is_empty())
        else {
            tracing::warn!(%form, "submit for unknown form ignored");
            return SubmitOutcome::UnknownForm(form.clone());
        };

        let edits = std::mem::take(&mut state.pending_edits);
        let mut applied = Vec::with_capacity(edits.len());
        for (widget, value) in edits {
            store.set(widget.clone(), value, Provenance::FromUser);
            applied.push(widget);
        }

        let mut reset = Vec::new();
        if state.clear_on_submit {
            for member in &state.member_ids {
                if applied.binary_search(member).is_err() && store.reset_to_default(member) {
                    reset.push(member.clone());
                }
            }
        }

        let closed = state.close_on_submit && std::mem::take(&mut state.open);

        let token = scheduler.request_from_form_submit(form.clone());
        tracing::debug!(
            %form,
            applied = applied.len(),
            reset = reset.len(),
            closed,
            %token,
            "form submitted"
        );

        SubmitOutcome::Submitted(SubmitReport {
            form: form.clone(),
            applied,
            reset,
            token,
            closed,
        })
    }

    /// Register a submit button for `form`, creating the form if needed.
    pub fn add_submit_button(&mut self, form: &FormId) {
        self.form_mut(form).submit_buttons += 1;
    }

    /// Unregister a submit button. Extra removals are ignored.
    pub fn remove_submit_button(&mut self, form: &FormId) {
        if let Some(state) = self.forms.get_mut(form) {
            state.submit_buttons = state.submit_buttons.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn get(&self, form: &str) -> Option<&FormState> {
        self.forms.get(form)
    }

    /// Snapshot for forms-changed listeners.
    #[must_use]
    pub fn forms_data(&self) -> FormsData {
        let mut data = FormsData::default();
        for (id, state) in &self.forms {
            if state.has_pending() {
                data.forms_with_pending_changes.insert(id.clone());
            }
            if state.submit_buttons > 0 {
                data.submit_buttons.insert(id.clone(), state.submit_buttons);
            }
            if state.open {
                data.open_forms.insert(id.clone());
            }
        }
        data
    }

    /// Number of forms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Total staged edits across all forms.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.forms.values().map(|s| s.pending_edits.len()).sum()
    }
}
