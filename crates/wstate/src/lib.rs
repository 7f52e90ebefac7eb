#![forbid(unsafe_code)]

//! wstate public facade crate.
//!
//! This crate provides the stable surface area for users. It re-exports the
//! common types from the internal crates and offers a lightweight prelude for
//! day-to-day usage.
//!
//! ```
//! use wstate::prelude::*;
//!
//! let mut mgr = WidgetStateManager::default();
//! let spec = ElementSpec::new("t1", "12:45");
//! mgr.set_value(&spec, "12:08".into(), Provenance::FromUser)?;
//! assert_eq!(mgr.get_value("t1"), Some(&WidgetValue::from("12:08")));
//! assert_eq!(mgr.rerun_count(), 1);
//! # Ok::<(), wstate::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use wstate_core::{
    ElementSpec, FormId, LabelVisibility, Provenance, StateError, StateResult, ValueKind,
    WidgetId, WidgetValue,
};
#[cfg(feature = "tracing-json")]
pub use wstate_core::{LoggingError, init_json_logging};

// --- Runtime re-exports ----------------------------------------------------

pub use wstate_runtime::{
    CloseReport, FormsData, ListenerId, ManagerConfig, ManagerStats, RefreshReport, Registration,
    RerunCause, RerunRequest, RerunSink, RerunToken, SchedulerConfig, SubmitOutcome,
    SubmitReport, WidgetStateManager,
};

// --- Widget re-exports -----------------------------------------------------

#[cfg(feature = "widgets")]
pub use wstate_widgets::{
    Checkbox, FormSubmitButton, StatefulView, TimeInput, TimeOfDay, WidgetError,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for wstate users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The state manager rejected an operation.
    State(StateError),
    /// A widget rejected an edit.
    #[cfg(feature = "widgets")]
    Widget(WidgetError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(err) => write!(f, "{err}"),
            #[cfg(feature = "widgets")]
            Self::Widget(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::State(err) => Some(err),
            #[cfg(feature = "widgets")]
            Self::Widget(err) => Some(err),
        }
    }
}

impl From<StateError> for Error {
    fn from(err: StateError) -> Self {
        Self::State(err)
    }
}

#[cfg(feature = "widgets")]
impl From<WidgetError> for Error {
    fn from(err: WidgetError) -> Self {
        match err {
            WidgetError::State(inner) => Self::State(inner),
            other => Self::Widget(other),
        }
    }
}

/// Standard result type for wstate APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Manager configured from the process environment
/// (see [`ManagerConfig::from_env`]).
#[must_use]
pub fn manager_from_env() -> WidgetStateManager {
    WidgetStateManager::new(ManagerConfig::from_env())
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ElementSpec, Error, FormId, ManagerConfig, Provenance, RerunRequest, Result,
        SubmitOutcome, WidgetId, WidgetStateManager, WidgetValue,
    };

    #[cfg(feature = "widgets")]
    pub use crate::{Checkbox, FormSubmitButton, StatefulView, TimeInput, TimeOfDay};

    pub use crate::{core, runtime};
    #[cfg(feature = "widgets")]
    pub use crate::widgets;
}

pub use wstate_core as core;
pub use wstate_runtime as runtime;
#[cfg(feature = "widgets")]
pub use wstate_widgets as widgets;
