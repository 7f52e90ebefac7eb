#![forbid(unsafe_code)]

//! Client-side widget state runtime.
//!
//! # Role in wstate
//! `wstate-runtime` is the stateful half of the widget synchronization layer.
//! It keeps committed widget values, buffers edits made inside forms, and
//! decides when the backend must re-execute the script.
//!
//! # Primary responsibilities
//! - **ValueStore**: committed values, provenance and backend defaults.
//! - **FormRegistry**: form membership, staged edits, atomic submit, dialog close.
//! - **RerunScheduler**: rerun tokens, event-scoped coalescing, deadlines.
//! - **WidgetStateManager**: the single entry point views talk to.
//!
//! # How it fits in the system
//! Views call [`WidgetStateManager`] with the [`ElementSpec`](wstate_core::ElementSpec)
//! they were rendered from. Rerun requests leave through a
//! [`RerunSink`] installed by the transport layer. Everything runs on one
//! logical UI thread; nothing here locks.

pub mod config;
pub mod form_registry;
pub mod rerun_scheduler;
pub mod state_manager;
pub mod subscription;
pub mod value_store;

pub use config::ManagerConfig;
pub use form_registry::{
    CloseReport, FormRegistry, FormState, FormsData, SubmitOutcome, SubmitReport,
};
pub use rerun_scheduler::{
    DecisionLog, RerunCause, RerunRequest, RerunScheduler, RerunSink, RerunToken,
    ScheduleAction, SchedulerConfig, SchedulerStats,
};
pub use state_manager::{ManagerStats, RefreshReport, Registration, WidgetStateManager};
pub use subscription::{ListenerId, Listeners};
pub use value_store::{StoreStats, ValueEntry, ValueStore};
