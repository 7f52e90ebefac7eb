#![forbid(unsafe_code)]

//! Form submit button.
//!
//! Mounting registers the button with its form so views can tell a form
//! with a way to submit from one without. Clicking submits the form: staged
//! edits are committed and exactly one rerun is requested.

use wstate_core::FormId;
use wstate_runtime::{FormsData, SubmitOutcome, WidgetStateManager};

/// A submit button for one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmitButton {
    form: FormId,
    label: String,
    disabled: bool,
}

impl FormSubmitButton {
    #[must_use]
    pub fn new(form: impl Into<FormId>) -> Self {
        Self {
            form: form.into(),
            label: "Submit".to_string(),
            disabled: false,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn form(&self) -> &FormId {
        &self.form
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mount(&self, mgr: &mut WidgetStateManager) {
        mgr.add_submit_button(&self.form);
    }

    pub fn unmount(&self, mgr: &mut WidgetStateManager) {
        mgr.remove_submit_button(&self.form);
    }

    /// Whether the button should draw as pending, given the latest forms
    /// snapshot.
    #[must_use]
    pub fn has_pending_changes(&self, data: &FormsData) -> bool {
        data.has_pending_changes(&self.form)
    }

    /// Disabled buttons stay inert; a mounted, enabled button is clickable.
    #[must_use]
    pub fn is_enabled(&self, data: &FormsData) -> bool {
        !self.disabled && data.has_submit_button(&self.form)
    }

    /// Report a click. `None` if the button is disabled.
    pub fn click(&self, mgr: &mut WidgetStateManager) -> Option<SubmitOutcome> {
        if self.disabled {
            #[cfg(feature = "tracing")]
            tracing::debug!(form = %self.form, "click ignored on disabled submit button");
            return None;
        }
        Some(mgr.submit_form(&self.form))
    }
}
