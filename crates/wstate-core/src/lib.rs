#![forbid(unsafe_code)]

//! Core data model for the wstate widget synchronization layer: widget and
//! form ids, kind-tagged values, provenance, backend element specs, and the
//! error type shared by the runtime.

pub mod element;
pub mod error;
pub mod ids;
pub mod logging;
pub mod value;

pub use element::{ElementSpec, LabelVisibility};
pub use error::{StateError, StateResult};
pub use ids::{FormId, WidgetId};
pub use value::{Provenance, ValueKind, WidgetValue};

#[cfg(feature = "tracing-json")]
pub use logging::{LoggingError, init_json_logging};
