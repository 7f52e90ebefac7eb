#![forbid(unsafe_code)]

//! Widget specifications pushed by the backend.
//!
//! An [`ElementSpec`] is everything the client learns about a widget from one
//! script run: its id, optional form, default value, and the kind-specific
//! parameters that shape the control (a time picker's step, a slider's
//! bounds). Presentation fields (label, visibility, disabled) travel along
//! for the views but carry no state semantics.
//!
//! # Structural identity
//!
//! Two specs for the same id are *structurally compatible* when their default
//! values share a kind and their parameters are equal. Anything else is a
//! structural change and the widget is treated as newly created.
//! A changed default alone is not structural.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{FormId, WidgetId};
use crate::value::{ValueKind, WidgetValue};

/// How a widget's label is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelVisibility {
    #[default]
    Visible,
    /// Label occupies its space but is not drawn.
    Hidden,
    /// Label is removed from layout entirely.
    Collapsed,
}

/// A backend widget specification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: WidgetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<FormId>,
    pub default: WidgetValue,
    /// Kind-specific parameters, e.g. `"step"` for a time picker.
    #[serde(default)]
    pub params: BTreeMap<String, WidgetValue>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub label_visibility: LabelVisibility,
    #[serde(default)]
    pub disabled: bool,
}

impl ElementSpec {
    /// Create a standalone spec with the given id and default value.
    #[must_use]
    pub fn new(id: impl Into<WidgetId>, default: impl Into<WidgetValue>) -> Self {
        Self {
            id: id.into(),
            form_id: None,
            default: default.into(),
            params: BTreeMap::new(),
            label: String::new(),
            label_visibility: LabelVisibility::Visible,
            disabled: false,
        }
    }

    #[must_use]
    pub fn with_form(mut self, form_id: impl Into<FormId>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<WidgetValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_label_visibility(mut self, visibility: LabelVisibility) -> Self {
        self.label_visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// The value kind this widget is fixed to.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.default.kind()
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&WidgetValue> {
        self.params.get(name)
    }

    /// Whether the widget belongs to a form.
    #[inline]
    #[must_use]
    pub fn in_form(&self) -> bool {
        self.form_id.is_some()
    }

    /// True when `self` re-specifies `previous` in a way that requires the
    /// widget to be re-created with its new default.
    #[must_use]
    pub fn is_structural_change_from(&self, previous: &ElementSpec) -> bool {
        self.kind() != previous.kind() || !params_match(&self.params, &previous.params)
    }

    /// Field-by-field equality using [`WidgetValue::same_as`] for values.
    #[must_use]
    pub fn same_as(&self, other: &ElementSpec) -> bool {
        self.id == other.id
            && self.form_id == other.form_id
            && self.default.same_as(&other.default)
            && params_match(&self.params, &other.params)
            && self.label == other.label
            && self.label_visibility == other.label_visibility
            && self.disabled == other.disabled
    }
}

fn params_match(a: &BTreeMap<String, WidgetValue>, b: &BTreeMap<String, WidgetValue>) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|((ka, va), (kb, vb))| ka == kb && va.same_as(vb))
}
