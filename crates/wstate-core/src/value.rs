#![forbid(unsafe_code)]

//! Typed widget values and their provenance.
//!
//! Every widget type produces exactly one [`ValueKind`]. A time picker, for
//! example, reports a formatted `"HH:MM"` string; a checkbox reports a
//! boolean. The kind is fixed by the widget's spec and never changes for the
//! lifetime of that widget id (a structural change re-creates the widget).
//!
//! # Wire shape
//!
//! Values serialize as adjacently tagged objects so the kind survives
//! transport even for ambiguous payloads:
//!
//! ```
//! # use wstate_core::value::WidgetValue;
//! let v = WidgetValue::from("12:45");
//! assert_eq!(
//!     serde_json::to_string(&v).unwrap(),
//!     r#"{"kind":"string","value":"12:45"}"#
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind tag of a [`WidgetValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Number,
    Bool,
    Array,
    Struct,
}

impl ValueKind {
    /// Stable lowercase name, used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Struct => "struct",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value of a widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<WidgetValue>),
    Struct(BTreeMap<String, WidgetValue>),
}

impl WidgetValue {
    /// The kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::Array(_) => ValueKind::Array,
            Self::Struct(_) => ValueKind::Struct,
        }
    }

    /// Equality that treats NaN numbers as equal to each other, so a spec
    /// compared with itself always matches.
    #[must_use]
    pub fn same_as(&self, other: &WidgetValue) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Self::Struct(a), Self::Struct(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_as(vb))
            }
            _ => self == other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[WidgetValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&BTreeMap<String, WidgetValue>> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for WidgetValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for WidgetValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for WidgetValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for WidgetValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for WidgetValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<WidgetValue>> for WidgetValue {
    fn from(items: Vec<WidgetValue>) -> Self {
        Self::Array(items)
    }
}

impl From<BTreeMap<String, WidgetValue>> for WidgetValue {
    fn from(fields: BTreeMap<String, WidgetValue>) -> Self {
        Self::Struct(fields)
    }
}

/// Where a stored value came from.
///
/// Replaces the `from_ui: bool` flag found in older widget managers; a named
/// variant cannot be inverted by accident at a call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Written while processing a backend spec (initialization or update).
    FromBackend,
    /// Written in response to a user edit in a view.
    FromUser,
}

impl Provenance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FromBackend => "backend",
            Self::FromUser => "user",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_user(self) -> bool {
        matches!(self, Self::FromUser)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
