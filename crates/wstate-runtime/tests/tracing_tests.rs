#![forbid(unsafe_code)]

//! Log event integration tests.
//!
//! Benign conditions (a submit for a form that vanished) must be visible at
//! warn level; programming errors (kind mismatch) at error level.
//!
//!   cargo test -p wstate-runtime --test tracing_tests

use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use wstate_core::{ElementSpec, FormId, Provenance};
use wstate_runtime::{SubmitOutcome, WidgetStateManager};

// ============================================================================
// Test Infrastructure
// ============================================================================

/// A captured event with its level and fields.
#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    fields: Vec<(String, String)>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A tracing Layer that records every event.
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

/// Visitor that extracts event fields.
struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0,
        });
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    (result, captured)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn unknown_form_submit_logs_warning() {
    let mut mgr = WidgetStateManager::default();
    let ghost = FormId::from("ghost");

    let (outcome, events) = capture(|| mgr.submit_form(&ghost));

    assert_eq!(outcome, SubmitOutcome::UnknownForm(ghost));
    let warns: Vec<_> = events.iter().filter(|e| e.level == Level::WARN).collect();
    assert_eq!(warns.len(), 1);
    assert_eq!(warns[0].field("form"), Some("ghost"));
}

#[test]
fn kind_mismatch_logs_error() {
    let mut mgr = WidgetStateManager::default();
    let spec = ElementSpec::new("t1", "12:45");

    let (result, events) = capture(|| mgr.set_value(&spec, true.into(), Provenance::FromUser));

    assert!(result.is_err());
    let errors: Vec<_> = events.iter().filter(|e| e.level == Level::ERROR).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("widget"), Some("t1"));
    assert_eq!(errors[0].field("expected"), Some("string"));
    assert_eq!(errors[0].field("found"), Some("bool"));
}

#[test]
fn stale_spec_edit_logs_error() {
    let mut mgr = WidgetStateManager::default();
    let old = ElementSpec::new("t1", "12:45").with_param("step", 900.0);
    mgr.register_element(&old);
    mgr.register_element(&old.clone().with_param("step", 60.0));

    let (result, events) = capture(|| mgr.set_value(&old, "12:30".into(), Provenance::FromUser));

    assert!(result.is_err());
    let errors: Vec<_> = events.iter().filter(|e| e.level == Level::ERROR).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("widget"), Some("t1"));
}

#[test]
fn normal_operation_logs_no_warnings() {
    let mut mgr = WidgetStateManager::default();
    let spec = ElementSpec::new("t1", "12:45").with_form("f");

    let (_, events) = capture(|| {
        mgr.set_value(&spec, "12:08".into(), Provenance::FromUser)
            .unwrap();
        mgr.submit_form(&FormId::from("f"));
    });

    assert!(!events.iter().any(|e| e.level == Level::WARN || e.level == Level::ERROR));
}
