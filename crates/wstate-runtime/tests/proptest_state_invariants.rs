//! Property-based invariant tests for the widget state manager.
//!
//! 1. Backend writes read back exactly and never rerun.
//! 2. Standalone user edits read back exactly and rerun once each.
//! 3. Staged edits never change the committed read; they do change the display read.
//! 4. Submit applies every staged edit with exactly one rerun.
//! 5. Clear-on-submit with nothing staged resets every member to its default.
//! 6. Rerun tokens are strictly increasing.
//! 7. A burst inside one event produces at most one rerun.
//! 8. No panics on arbitrary operation sequences.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use proptest::prelude::*;
use wstate_core::{ElementSpec, FormId, Provenance, WidgetValue};
use wstate_runtime::{ManagerConfig, RerunRequest, SchedulerConfig, WidgetStateManager};

// ── Strategies ────────────────────────────────────────────────────────────

fn widget_id() -> impl Strategy<Value = String> {
    "[a-e]"
}

fn hhmm() -> impl Strategy<Value = String> {
    (0u8..24, 0u8..60).prop_map(|(h, m)| format!("{h:02}:{m:02}"))
}

#[derive(Debug, Clone)]
enum Op {
    Backend(String, String),
    User(String, String),
    Submit,
    Discard,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (widget_id(), hhmm()).prop_map(|(id, v)| Op::Backend(id, v)),
        (widget_id(), hhmm()).prop_map(|(id, v)| Op::User(id, v)),
        Just(Op::Submit),
        Just(Op::Discard),
    ]
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn spec(id: &str, form: Option<&str>) -> ElementSpec {
    let spec = ElementSpec::new(id, "12:45").with_param("step", 60.0);
    match form {
        Some(f) => spec.with_form(f),
        None => spec,
    }
}

fn recording(config: ManagerConfig) -> (WidgetStateManager, Rc<RefCell<Vec<RerunRequest>>>) {
    let requests = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&requests);
    let mgr = WidgetStateManager::new(config)
        .with_rerun_sink(move |req: RerunRequest| sink.borrow_mut().push(req));
    (mgr, requests)
}

fn relaxed() -> ManagerConfig {
    ManagerConfig::default()
        .with_scheduler(SchedulerConfig::default().with_max_batch_age_ms(60_000))
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn backend_writes_read_back_without_rerun(
        writes in prop::collection::vec((widget_id(), hhmm()), 1..30),
    ) {
        let (mut mgr, requests) = recording(ManagerConfig::default());
        let mut expected = BTreeMap::new();
        for (id, value) in &writes {
            mgr.set_value(&spec(id, None), value.as_str().into(), Provenance::FromBackend).unwrap();
            expected.insert(id.clone(), value.clone());
            prop_assert_eq!(mgr.get_value(id), Some(&WidgetValue::from(value.as_str())));
        }
        for (id, value) in &expected {
            prop_assert_eq!(mgr.get_value(id), Some(&WidgetValue::from(value.as_str())));
        }
        prop_assert!(requests.borrow().is_empty());
    }

    #[test]
    fn standalone_user_edits_rerun_once_each(
        edits in prop::collection::vec((widget_id(), hhmm()), 1..30),
    ) {
        let (mut mgr, requests) = recording(ManagerConfig::default());
        for (n, (id, value)) in edits.iter().enumerate() {
            mgr.set_value(&spec(id, None), value.as_str().into(), Provenance::FromUser).unwrap();
            prop_assert_eq!(mgr.get_value(id), Some(&WidgetValue::from(value.as_str())));
            prop_assert_eq!(mgr.rerun_count(), n as u64 + 1);
        }
        let tokens: Vec<u64> = requests.borrow().iter().map(|r| r.token.get()).collect();
        prop_assert!(tokens.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn staging_changes_display_not_committed(
        edits in prop::collection::vec((widget_id(), hhmm()), 1..20),
    ) {
        let (mut mgr, requests) = recording(ManagerConfig::default());
        for (id, value) in &edits {
            let member = spec(id, Some("f"));
            let committed_before = mgr.get_value(id).cloned();
            mgr.set_value(&member, value.as_str().into(), Provenance::FromUser).unwrap();

            let committed = mgr.get_value(id).cloned();
            prop_assert_eq!(
                committed,
                committed_before.or(Some(WidgetValue::from("12:45")))
            );
            prop_assert_eq!(mgr.get_display_value(id), Some(&WidgetValue::from(value.as_str())));
        }
        prop_assert!(requests.borrow().is_empty());
    }

    #[test]
    fn submit_applies_all_with_one_rerun(
        edits in prop::collection::vec((widget_id(), hhmm()), 0..20),
        clear in any::<bool>(),
    ) {
        let (mut mgr, requests) = recording(ManagerConfig::default());
        let f = FormId::from("f");
        mgr.set_form_clear_on_submit(&f, clear);
        mgr.register_element(&spec("anchor", Some("f")));

        let mut staged = BTreeMap::new();
        for (id, value) in &edits {
            mgr.set_value(&spec(id, Some("f")), value.as_str().into(), Provenance::FromUser).unwrap();
            staged.insert(id.clone(), value.clone());
        }

        let outcome = mgr.submit_form(&f);
        prop_assert!(outcome.is_submitted());
        prop_assert_eq!(requests.borrow().len(), 1);
        for (id, value) in &staged {
            prop_assert_eq!(mgr.get_value(id), Some(&WidgetValue::from(value.as_str())));
        }
        prop_assert_eq!(mgr.form_registry().pending_count(), 0);
    }

    #[test]
    fn clear_with_nothing_staged_resets_members(
        writes in prop::collection::vec((widget_id(), hhmm()), 1..20),
    ) {
        let (mut mgr, requests) = recording(ManagerConfig::default());
        let f = FormId::from("f");
        mgr.set_form_clear_on_submit(&f, true);
        for (id, value) in &writes {
            mgr.set_value(&spec(id, Some("f")), value.as_str().into(), Provenance::FromBackend).unwrap();
        }

        mgr.submit_form(&f);
        for (id, _) in &writes {
            prop_assert_eq!(mgr.get_value(id), Some(&WidgetValue::from("12:45")));
            prop_assert_eq!(mgr.provenance(id), Some(Provenance::FromBackend));
        }
        prop_assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn burst_in_one_event_reruns_at_most_once(
        edits in prop::collection::vec((widget_id(), hhmm()), 0..30),
    ) {
        let (mut mgr, requests) = recording(relaxed());
        mgr.process_event(|m| {
            for (id, value) in &edits {
                m.set_value(&spec(id, None), value.as_str().into(), Provenance::FromUser).unwrap();
            }
        });
        let expected = usize::from(!edits.is_empty());
        prop_assert_eq!(requests.borrow().len(), expected);
    }

    #[test]
    fn arbitrary_sequences_never_panic(ops in prop::collection::vec(op(), 0..60)) {
        let (mut mgr, requests) = recording(ManagerConfig::default());
        let f = FormId::from("f");
        for op in ops {
            match op {
                Op::Backend(id, v) => {
                    let form = (id.as_str() < "c").then_some("f");
                    mgr.set_value(&spec(&id, form), v.as_str().into(), Provenance::FromBackend).unwrap();
                }
                Op::User(id, v) => {
                    let form = (id.as_str() < "c").then_some("f");
                    mgr.set_value(&spec(&id, form), v.as_str().into(), Provenance::FromUser).unwrap();
                }
                Op::Submit => {
                    let _ = mgr.submit_form(&f);
                }
                Op::Discard => {
                    mgr.discard_pending(&f);
                }
            }
        }
        let tokens: Vec<u64> = requests.borrow().iter().map(|r| r.token.get()).collect();
        prop_assert!(tokens.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(tokens.len() as u64, mgr.rerun_count());
    }
}
