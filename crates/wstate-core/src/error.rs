#![forbid(unsafe_code)]

//! Errors raised by the widget state layer.
//!
//! Only programming errors in the calling layer are errors here. Conditions
//! that happen in normal operation (submitting a form that vanished between
//! reruns, reading a widget before its first spec arrives) are reported as
//! values, not errors.

use std::fmt;

use crate::ids::WidgetId;
use crate::value::ValueKind;

/// Errors returned by state-mutating operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// A value of a different kind than the one fixed for the widget was
    /// supplied. Indicates a spec/view desynchronization; nothing is written.
    KindMismatch {
        widget: WidgetId,
        expected: ValueKind,
        found: ValueKind,
    },
    /// A user edit arrived through a spec the backend has since replaced
    /// (different parameters or form). Nothing is written.
    StaleSpec { widget: WidgetId },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::KindMismatch {
                widget,
                expected,
                found,
            } => write!(
                f,
                "kind mismatch for widget {widget}: expected {expected}, found {found}"
            ),
            StateError::StaleSpec { widget } => {
                write!(f, "stale spec for widget {widget}: re-specified by the backend")
            }
        }
    }
}

impl std::error::Error for StateError {}

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;
