#![forbid(unsafe_code)]

//! View models for wstate widgets.
//!
//! Widgets here do not render. Each wraps the [`ElementSpec`] it was built
//! from, reads its value through the [`WidgetStateManager`] and reports edits
//! back to it, exactly as a rendering layer would.

pub mod checkbox;
pub mod submit_button;
pub mod time_input;

pub use checkbox::Checkbox;
pub use submit_button::FormSubmitButton;
pub use time_input::{TimeInput, TimeOfDay};

use std::fmt;

use wstate_core::{ElementSpec, LabelVisibility, StateError, WidgetId, WidgetValue};
use wstate_runtime::{Registration, WidgetStateManager};

/// A `StatefulView` is a control whose value lives in the state manager.
///
/// Views are cheap to rebuild on every script run; the manager keeps the
/// value across rebuilds as long as the spec stays structurally compatible.
pub trait StatefulView {
    /// Spec this view was built from.
    fn spec(&self) -> &ElementSpec;

    /// Register the spec. Call once per script run, before reading.
    fn mount(&self, mgr: &mut WidgetStateManager) -> Registration {
        mgr.register_element(self.spec())
    }

    /// Value to show: the staged edit if any, else the committed value.
    fn display_value<'m>(&self, mgr: &'m WidgetStateManager) -> Option<&'m WidgetValue> {
        mgr.get_display_value(self.spec().id.as_str())
    }

    /// Label to draw, if the label is visible.
    fn visible_label(&self) -> Option<&str> {
        let spec = self.spec();
        (spec.label_visibility == LabelVisibility::Visible).then_some(spec.label.as_str())
    }

    fn is_disabled(&self) -> bool {
        self.spec().disabled
    }
}

/// Errors raised by widget edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// The widget is disabled and ignores user edits.
    Disabled(WidgetId),
    /// Text that is not a valid `HH:MM` time of day.
    InvalidTime(String),
    /// The spec does not describe this kind of widget.
    WrongSpec { widget: WidgetId, reason: &'static str },
    /// The manager rejected the value.
    State(StateError),
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled(id) => write!(f, "widget {id} is disabled"),
            Self::InvalidTime(raw) => write!(f, "invalid time of day: {raw:?}"),
            Self::WrongSpec { widget, reason } => {
                write!(f, "spec for widget {widget} rejected: {reason}")
            }
            Self::State(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WidgetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::State(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StateError> for WidgetError {
    fn from(err: StateError) -> Self {
        Self::State(err)
    }
}

/// Reject user edits on disabled widgets.
pub(crate) fn ensure_enabled(spec: &ElementSpec) -> Result<(), WidgetError> {
    if spec.disabled {
        #[cfg(feature = "tracing")]
        tracing::debug!(widget = %spec.id, "edit ignored on disabled widget");
        return Err(WidgetError::Disabled(spec.id.clone()));
    }
    Ok(())
}
