//! Rerun request scheduling and coalescing.
//!
//! Standalone widget edits ask the backend to re-execute the script. When a
//! single UI event produces several edits (a drag that updates two sliders, a
//! spec refresh that re-fires callbacks) the backend should see one rerun,
//! not one per edit. Form submits are never merged with anything.
//!
//! # Usage
//!
//! ```
//! use wstate_runtime::rerun_scheduler::{RerunScheduler, ScheduleAction, SchedulerConfig};
//! use wstate_core::WidgetId;
//!
//! let mut scheduler = RerunScheduler::new(SchedulerConfig::default().with_max_batch_age_ms(1_000));
//!
//! scheduler.begin_event();
//! assert_eq!(scheduler.request_immediate(WidgetId::from("a")), ScheduleAction::Coalesced);
//! assert_eq!(scheduler.request_immediate(WidgetId::from("b")), ScheduleAction::Coalesced);
//! let token = scheduler.end_event();
//!
//! assert!(token.is_some());
//! assert_eq!(scheduler.rerun_count(), 1);
//! ```
//!
//! # Invariants
//!
//! - **No lost bursts**: every immediate request is part of exactly one
//!   emitted rerun, no later than the end of its event scope or
//!   `max_batch_age_ms` after the batch opened (whichever is first, checked
//!   on each request and tick).
//! - **Submit isolation**: a form submit emits its own request. A batch
//!   pending at that moment is flushed first so emission order follows
//!   event-arrival order.
//! - **Monotonic tokens**: every emitted request carries a token strictly
//!   greater than all earlier ones, including dropped requests.
//! - **Deterministic**: identical request sequences yield identical decision
//!   logs and checksums.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | No sink installed or sink unavailable | Request dropped, token still consumed |
//! | `end_event` without `begin_event` | Logged, pending batch flushed |
//! | `max_batch_age_ms = 0` | Batches flush on the request that opened them |
//!
//! # Decision Rule
//!
//! 1) Outside an event scope, an immediate request is **emitted**.
//! 2) Inside a scope, it joins the pending batch (**coalesce**).
//! 3) If the batch is older than `max_batch_age_ms`, it is **flushed** (forced).
//! 4) Closing the outermost scope **flushes** the batch.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use wstate_core::{FormId, WidgetId};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv_hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= *byte as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests and sinks
// ─────────────────────────────────────────────────────────────────────────────

/// Monotonic sequence token carried by every rerun request.
///
/// The transport uses it to drop duplicates; it carries no other meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RerunToken(u64);

impl RerunToken {
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RerunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rerun#{}", self.0)
    }
}

/// Why a rerun was requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RerunCause {
    /// One or more standalone widgets were edited in the same event.
    WidgetEdits(Vec<WidgetId>),
    /// A form was submitted.
    FormSubmit(FormId),
}

impl RerunCause {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WidgetEdits(_) => "widget_edits",
            Self::FormSubmit(_) => "form_submit",
        }
    }
}

/// An outgoing "rerun requested" event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RerunRequest {
    pub token: RerunToken,
    pub cause: RerunCause,
}

/// Receiver of rerun requests, normally the transport layer.
pub trait RerunSink {
    /// Deliver one request. Called synchronously from the UI thread.
    fn rerun_requested(&mut self, request: RerunRequest);

    /// Whether the transport can currently accept requests.
    ///
    /// Requests raised while unavailable are dropped, not queued.
    fn is_available(&self) -> bool {
        true
    }
}

impl<F> RerunSink for F
where
    F: FnMut(RerunRequest),
{
    fn rerun_requested(&mut self, request: RerunRequest) {
        self(request);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the rerun scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Hard deadline for a pending batch (ms). A batch older than this is
    /// flushed on the next request or tick even if its event scope is still
    /// open.
    pub max_batch_age_ms: u64,

    /// Enable decision logging.
    pub enable_logging: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_age_ms: 16, // one frame
            enable_logging: false,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_max_batch_age_ms(mut self, ms: u64) -> Self {
        self.max_batch_age_ms = ms;
        self
    }

    /// Enable or disable decision logging.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

/// Result of an immediate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    /// A request went out (or was dropped by an unavailable transport).
    Emitted(RerunToken),
    /// The request joined a pending batch.
    Coalesced,
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision log
// ─────────────────────────────────────────────────────────────────────────────

/// One scheduler decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionLog {
    pub seq: u64,
    /// `"emit"`, `"coalesce"`, `"flush"`, `"flush_forced"` or `"submit"`.
    pub action: &'static str,
    pub cause: &'static str,
    /// Widgets covered by the decision.
    pub widgets: usize,
    pub forced: bool,
    /// Event scope depth when the decision was made.
    pub depth: u32,
    pub token: Option<RerunToken>,
    /// Whether the sink accepted the request (emit decisions only).
    pub delivered: bool,
}

impl DecisionLog {
    /// Serialize to a single JSONL line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Counters for the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Requests emitted (delivered or dropped).
    pub emitted: u64,
    /// Requests absorbed into an existing batch.
    pub coalesced: u64,
    /// Requests dropped for lack of a transport.
    pub dropped: u64,
    /// Batches flushed by the age deadline.
    pub forced: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

struct PendingBatch {
    widgets: Vec<WidgetId>,
    opened_at: Instant,
}

/// Micro-batching rerun scheduler.
pub struct RerunScheduler {
    config: SchedulerConfig,
    sink: Option<Box<dyn RerunSink>>,
    depth: u32,
    pending: Option<PendingBatch>,
    last_token: u64,
    stats: SchedulerStats,
    logs: Vec<DecisionLog>,
    decision_seq: u64,
}

impl RerunScheduler {
    /// Create a scheduler without a sink. Requests are dropped until one is set.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            sink: None,
            depth: 0,
            pending: None,
            last_token: 0,
            stats: SchedulerStats::default(),
            logs: Vec::new(),
            decision_seq: 0,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl RerunSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn set_sink(&mut self, sink: impl RerunSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Detach the sink. Later requests are dropped.
    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Open an event scope. Scopes nest; only the outermost close flushes.
    pub fn begin_event(&mut self) {
        self.depth += 1;
    }

    /// Close an event scope, flushing the pending batch if this was the
    /// outermost scope.
    pub fn end_event(&mut self) -> Option<RerunToken> {
        self.end_event_at(Instant::now())
    }

    pub fn end_event_at(&mut self, now: Instant) -> Option<RerunToken> {
        if self.depth == 0 {
            tracing::warn!("end_event without matching begin_event");
        } else {
            self.depth -= 1;
        }
        if self.depth == 0 {
            self.flush_pending_at(now, false)
        } else {
            None
        }
    }

    /// Whether an event scope is open.
    #[inline]
    #[must_use]
    pub fn in_event(&self) -> bool {
        self.depth > 0
    }

    /// Request a rerun for a standalone widget edit.
    pub fn request_immediate(&mut self, widget: WidgetId) -> ScheduleAction {
        self.request_immediate_at(widget, Instant::now())
    }

    /// Request a rerun at a specific time (for testing).
    pub fn request_immediate_at(&mut self, widget: WidgetId, now: Instant) -> ScheduleAction {
        if self.depth == 0 {
            let token = self.emit(RerunCause::WidgetEdits(vec![widget]), "emit", false);
            return ScheduleAction::Emitted(token);
        }

        let batch = self.pending.get_or_insert_with(|| PendingBatch {
            widgets: Vec::new(),
            opened_at: now,
        });
        if !batch.widgets.is_empty() {
            self.stats.coalesced += 1;
        }
        if !batch.widgets.contains(&widget) {
            batch.widgets.push(widget);
        }
        let widgets = batch.widgets.len();
        let age = duration_since_or_zero(now, batch.opened_at);

        if age >= Duration::from_millis(self.config.max_batch_age_ms)
            && let Some(token) = self.flush_pending_at(now, true)
        {
            return ScheduleAction::Emitted(token);
        }

        self.log_decision("coalesce", "widget_edits", widgets, false, None, false);
        ScheduleAction::Coalesced
    }

    /// Request the single rerun that follows a form submit.
    pub fn request_from_form_submit(&mut self, form: FormId) -> RerunToken {
        self.flush_pending_at(Instant::now(), false);
        self.emit(RerunCause::FormSubmit(form), "submit", false)
    }

    /// Flush the pending batch now, regardless of scope.
    pub fn flush(&mut self) -> Option<RerunToken> {
        self.flush_pending_at(Instant::now(), false)
    }

    /// Tick the scheduler (call once per frame).
    pub fn tick(&mut self) -> Option<RerunToken> {
        self.tick_at(Instant::now())
    }

    /// Tick at a specific time (for testing).
    pub fn tick_at(&mut self, now: Instant) -> Option<RerunToken> {
        let batch = self.pending.as_ref()?;
        if self.depth == 0 {
            return self.flush_pending_at(now, false);
        }
        let age = duration_since_or_zero(now, batch.opened_at);
        if age >= Duration::from_millis(self.config.max_batch_age_ms) {
            return self.flush_pending_at(now, true);
        }
        None
    }

    /// Time until the pending batch hits its deadline.
    #[must_use]
    pub fn time_until_flush(&self, now: Instant) -> Option<Duration> {
        let batch = self.pending.as_ref()?;
        let elapsed = duration_since_or_zero(now, batch.opened_at);
        let target = Duration::from_millis(self.config.max_batch_age_ms);
        Some(target.saturating_sub(elapsed))
    }

    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Widgets in the pending batch, in first-request order.
    #[must_use]
    pub fn pending_widgets(&self) -> &[WidgetId] {
        self.pending
            .as_ref()
            .map(|b| b.widgets.as_slice())
            .unwrap_or(&[])
    }

    /// Number of requests emitted so far.
    #[inline]
    #[must_use]
    pub fn rerun_count(&self) -> u64 {
        self.stats.emitted
    }

    /// Token of the most recent emitted request.
    #[must_use]
    pub fn last_token(&self) -> Option<RerunToken> {
        (self.last_token > 0).then_some(RerunToken(self.last_token))
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn flush_pending_at(&mut self, now: Instant, forced: bool) -> Option<RerunToken> {
        let batch = self.pending.take()?;
        if forced {
            self.stats.forced += 1;
            tracing::debug!(
                widgets = batch.widgets.len(),
                age_ms = duration_since_or_zero(now, batch.opened_at).as_millis() as u64,
                "rerun batch hit deadline"
            );
        }
        let action = if forced { "flush_forced" } else { "flush" };
        Some(self.emit(RerunCause::WidgetEdits(batch.widgets), action, forced))
    }

    fn emit(&mut self, cause: RerunCause, action: &'static str, forced: bool) -> RerunToken {
        self.last_token += 1;
        let token = RerunToken(self.last_token);
        self.stats.emitted += 1;

        let cause_name = cause.as_str();
        let widgets = match &cause {
            RerunCause::WidgetEdits(ids) => ids.len(),
            RerunCause::FormSubmit(_) => 0,
        };

        let delivered = match self.sink.as_mut() {
            Some(sink) if sink.is_available() => {
                tracing::debug!(%token, cause = cause_name, widgets, "rerun requested");
                sink.rerun_requested(RerunRequest { token, cause });
                true
            }
            _ => {
                self.stats.dropped += 1;
                tracing::debug!(%token, cause = cause_name, "rerun dropped, transport unavailable");
                false
            }
        };

        self.log_decision(action, cause_name, widgets, forced, Some(token), delivered);
        token
    }

    fn log_decision(
        &mut self,
        action: &'static str,
        cause: &'static str,
        widgets: usize,
        forced: bool,
        token: Option<RerunToken>,
        delivered: bool,
    ) {
        if !self.config.enable_logging {
            return;
        }
        self.decision_seq += 1;
        self.logs.push(DecisionLog {
            seq: self.decision_seq,
            action,
            cause,
            widgets,
            forced,
            depth: self.depth,
            token,
            delivered,
        });
    }

    // ── Decision log access ──────────────────────────────────────────────

    /// Get decision logs (if logging enabled).
    #[must_use]
    pub fn logs(&self) -> &[DecisionLog] {
        &self.logs
    }

    /// Clear decision logs.
    pub fn clear_logs(&mut self) {
        self.logs.clear();
        self.decision_seq = 0;
    }

    /// Export decision logs as JSONL, one decision per line.
    #[must_use]
    pub fn decision_logs_jsonl(&self) -> String {
        self.logs
            .iter()
            .map(DecisionLog::to_jsonl)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Deterministic FNV-1a checksum over the decision log.
    #[must_use]
    pub fn decision_checksum(&self) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        for entry in &self.logs {
            fnv_hash_bytes(&mut hash, &entry.seq.to_le_bytes());
            fnv_hash_bytes(&mut hash, entry.action.as_bytes());
            fnv_hash_bytes(&mut hash, entry.cause.as_bytes());
            fnv_hash_bytes(&mut hash, &(entry.widgets as u64).to_le_bytes());
            fnv_hash_bytes(&mut hash, &[entry.forced as u8, entry.delivered as u8]);
            fnv_hash_bytes(&mut hash, &entry.depth.to_le_bytes());
            let token = entry.token.map(RerunToken::get).unwrap_or(0);
            fnv_hash_bytes(&mut hash, &token.to_le_bytes());
        }
        hash
    }

    /// Checksum as a zero-padded hex string.
    #[must_use]
    pub fn decision_checksum_hex(&self) -> String {
        format!("{:016x}", self.decision_checksum())
    }
}

impl fmt::Debug for RerunScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RerunScheduler")
            .field("config", &self.config)
            .field("has_sink", &self.sink.is_some())
            .field("depth", &self.depth)
            .field("pending", &self.pending_widgets())
            .field("stats", &self.stats)
            .finish()
    }
}
