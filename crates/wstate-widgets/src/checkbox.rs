#![forbid(unsafe_code)]

//! Boolean checkbox.

use wstate_core::{ElementSpec, FormId, Provenance, WidgetId};
use wstate_runtime::WidgetStateManager;

use crate::{StatefulView, WidgetError, ensure_enabled};

/// A checkbox bound to one widget id.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkbox {
    spec: ElementSpec,
}

impl Checkbox {
    #[must_use]
    pub fn new(id: impl Into<WidgetId>, default: bool) -> Self {
        Self {
            spec: ElementSpec::new(id, default),
        }
    }

    #[must_use]
    pub fn with_form(mut self, form: impl Into<FormId>) -> Self {
        self.spec = self.spec.with_form(form);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.spec = self.spec.with_label(label);
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.spec = self.spec.with_disabled(disabled);
        self
    }

    /// Displayed state. Unmounted checkboxes read as their default.
    #[must_use]
    pub fn is_checked(&self, mgr: &WidgetStateManager) -> bool {
        self.display_value(mgr)
            .or(Some(&self.spec.default))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Report a user click: flips the displayed state.
    pub fn toggle(&self, mgr: &mut WidgetStateManager) -> Result<bool, WidgetError> {
        let next = !self.is_checked(mgr);
        self.set_checked(mgr, next)?;
        Ok(next)
    }

    /// Report a user edit to an explicit state.
    pub fn set_checked(
        &self,
        mgr: &mut WidgetStateManager,
        checked: bool,
    ) -> Result<(), WidgetError> {
        ensure_enabled(&self.spec)?;
        mgr.set_value(&self.spec, checked.into(), Provenance::FromUser)?;
        Ok(())
    }
}

impl StatefulView for Checkbox {
    fn spec(&self) -> &ElementSpec {
        &self.spec
    }
}
