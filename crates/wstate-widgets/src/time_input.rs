#![forbid(unsafe_code)]

//! Time-of-day input.
//!
//! The value is a string of the form `HH:MM` (24-hour clock). The `step`
//! parameter, in seconds, sets the granularity of the options a picker
//! offers; it is structural, so changing it re-creates the widget with its
//! new default.

use std::fmt;
use std::str::FromStr;

use wstate_core::{ElementSpec, FormId, LabelVisibility, Provenance, WidgetId};
use wstate_runtime::WidgetStateManager;

use crate::{StatefulView, WidgetError, ensure_enabled};

/// Name of the step parameter in the spec.
pub const STEP_PARAM: &str = "step";
/// Step used when the spec carries none (15 minutes).
pub const DEFAULT_STEP_SECS: u32 = 900;
/// Bounds applied to the step.
pub const MIN_STEP_SECS: u32 = 60;
pub const MAX_STEP_SECS: u32 = 23 * 3600;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// `None` if `hour > 23` or `minute > 59`.
    #[must_use]
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    #[inline]
    #[must_use]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    #[must_use]
    pub const fn minutes_since_midnight(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// Wraps past midnight.
    #[must_use]
    pub const fn from_minutes(minutes: u16) -> Self {
        let m = minutes % MINUTES_PER_DAY;
        Self {
            hour: (m / 60) as u8,
            minute: (m % 60) as u8,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WidgetError::InvalidTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(h) || !two_digits(m) {
            return Err(invalid());
        }
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

/// A time picker bound to one widget id.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeInput {
    spec: ElementSpec,
}

impl TimeInput {
    /// Create a standalone time input with the default 15-minute step.
    #[must_use]
    pub fn new(id: impl Into<WidgetId>, default: TimeOfDay) -> Self {
        Self {
            spec: ElementSpec::new(id, default.to_string())
                .with_param(STEP_PARAM, f64::from(DEFAULT_STEP_SECS)),
        }
    }

    /// Wrap a backend spec, checking that it describes a time input.
    pub fn from_spec(spec: ElementSpec) -> Result<Self, WidgetError> {
        let Some(default) = spec.default.as_str() else {
            return Err(WidgetError::WrongSpec {
                widget: spec.id.clone(),
                reason: "default is not a string",
            });
        };
        default.parse::<TimeOfDay>()?;
        if spec.param(STEP_PARAM).is_some_and(|v| v.as_number().is_none()) {
            return Err(WidgetError::WrongSpec {
                widget: spec.id.clone(),
                reason: "step is not a number",
            });
        }
        Ok(Self { spec })
    }

    /// Step in seconds (builder). Clamped to one minute .. 23 hours.
    #[must_use]
    pub fn with_step(mut self, secs: u32) -> Self {
        let secs = secs.clamp(MIN_STEP_SECS, MAX_STEP_SECS);
        self.spec = self.spec.with_param(STEP_PARAM, f64::from(secs));
        self
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
    pub fn with_label_visibility(mut self, visibility: LabelVisibility) -> Self {
        self.spec = self.spec.with_label_visibility(visibility);
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.spec = self.spec.with_disabled(disabled);
        self
    }

    /// Step in seconds, clamped.
    #[must_use]
    pub fn step_secs(&self) -> u32 {
        self.spec
            .param(STEP_PARAM)
            .and_then(|v| v.as_number())
            .map_or(DEFAULT_STEP_SECS, |secs| {
                secs.clamp(f64::from(MIN_STEP_SECS), f64::from(MAX_STEP_SECS)) as u32
            })
    }

    /// Default time from the spec.
    #[must_use]
    pub fn default_time(&self) -> Option<TimeOfDay> {
        self.spec.default.as_str()?.parse().ok()
    }

    /// Times a picker offers, from midnight in `step` increments.
    #[must_use]
    pub fn options(&self) -> Vec<TimeOfDay> {
        let step = (self.step_secs() / 60).max(1) as usize;
        (0..MINUTES_PER_DAY)
            .step_by(step)
            .map(TimeOfDay::from_minutes)
            .collect()
    }

    /// Time to show, staged edit first. `None` before mount.
    #[must_use]
    pub fn value(&self, mgr: &WidgetStateManager) -> Option<TimeOfDay> {
        self.display_value(mgr)?.as_str()?.parse().ok()
    }

    /// Time the backend has seen or will see on the next rerun.
    #[must_use]
    pub fn committed(&self, mgr: &WidgetStateManager) -> Option<TimeOfDay> {
        mgr.get_value(self.spec.id.as_str())?.as_str()?.parse().ok()
    }

    /// Report a user pick.
    pub fn on_change(
        &self,
        mgr: &mut WidgetStateManager,
        time: TimeOfDay,
    ) -> Result<(), WidgetError> {
        ensure_enabled(&self.spec)?;
        mgr.set_value(&self.spec, time.to_string().into(), Provenance::FromUser)?;
        Ok(())
    }

    /// Report user-typed text; rejected unless it is a valid `HH:MM`.
    pub fn on_text(&self, mgr: &mut WidgetStateManager, text: &str) -> Result<(), WidgetError> {
        let time = text.trim().parse::<TimeOfDay>()?;
        self.on_change(mgr, time)
    }

    /// Apply a value pushed by the backend.
    pub fn set_from_backend(
        &self,
        mgr: &mut WidgetStateManager,
        time: TimeOfDay,
    ) -> Result<(), WidgetError> {
        mgr.set_value(&self.spec, time.to_string().into(), Provenance::FromBackend)?;
        Ok(())
    }
}

impl StatefulView for TimeInput {
    fn spec(&self) -> &ElementSpec {
        &self.spec
    }
}

impl From<TimeInput> for ElementSpec {
    fn from(input: TimeInput) -> Self {
        input.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wstate_core::WidgetValue;

    fn t(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    #[test]
    fn time_of_day_parses_and_formats() {
        assert_eq!("07:05".parse::<TimeOfDay>().unwrap(), t(7, 5));
        assert_eq!(t(7, 5).to_string(), "07:05");
        assert_eq!(t(23, 59).minutes_since_midnight(), 1439);
        assert_eq!(TimeOfDay::from_minutes(1440), t(0, 0));
    }

    #[test]
    fn time_of_day_rejects_malformed() {
        for raw in ["7:05", "24:00", "12:60", "1205", "ab:cd", "12:5", ""] {
            assert!(
                raw.parse::<TimeOfDay>().is_err(),
                "{raw:?} should not parse"
            );
        }
        assert!(TimeOfDay::new(24, 0).is_none());
    }

    #[test]
    fn time_of_day_rejects_signs() {
        for raw in ["+1:05", "12:+5", "-1:05", "+0:+0"] {
            assert_eq!(
                raw.parse::<TimeOfDay>(),
                Err(WidgetError::InvalidTime(raw.to_string()))
            );
        }
    }

    #[test]
    fn step_defaults_and_clamps() {
        let input = TimeInput::new("t1", t(12, 45));
        assert_eq!(input.step_secs(), DEFAULT_STEP_SECS);
        assert_eq!(input.clone().with_step(1).step_secs(), MIN_STEP_SECS);
        assert_eq!(input.with_step(86_400).step_secs(), MAX_STEP_SECS);
    }

    #[test]
    fn options_follow_step() {
        let input = TimeInput::new("t1", t(12, 45));
        let options = input.options();
        assert_eq!(options.len(), 96);
        assert_eq!(options[0], t(0, 0));
        assert_eq!(options[1], t(0, 15));
        assert_eq!(options[95], t(23, 45));

        let hourly = TimeInput::new("t1", t(12, 45)).with_step(3600);
        assert_eq!(hourly.options().len(), 24);
    }

    #[test]
    fn from_spec_validates() {
        assert!(TimeInput::from_spec(ElementSpec::new("t", "08:00")).is_ok());
        assert!(matches!(
            TimeInput::from_spec(ElementSpec::new("t", true)),
            Err(WidgetError::WrongSpec { .. })
        ));
        assert_eq!(
            TimeInput::from_spec(ElementSpec::new("t", "8 am")),
            Err(WidgetError::InvalidTime("8 am".into()))
        );
        assert!(matches!(
            TimeInput::from_spec(ElementSpec::new("t", "08:00").with_param("step", "fast")),
            Err(WidgetError::WrongSpec { .. })
        ));
    }

    #[test]
    fn spec_carries_presentation() {
        let input = TimeInput::new("t1", t(12, 45))
            .with_label("Label")
            .with_label_visibility(LabelVisibility::Hidden)
            .with_disabled(true);
        assert_eq!(input.spec().default, WidgetValue::from("12:45"));
        assert!(input.visible_label().is_none());
        assert!(input.is_disabled());
    }
}
