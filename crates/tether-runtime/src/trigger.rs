#![forbid(unsafe_code)]

//! Load-trigger vocabulary.
//!
//! | `data-load` value | Trigger |
//! |-------------------|---------|
//! | absent | [`LoadTrigger::Immediate`] |
//! | `visible` | lazy, any visible pixel |
//! | `fully-visible` | strict, whole element visible |
//! | `on:<event>` | first `<event>` dispatched at the element |
//! | anything else | [`LoadTrigger::Immediate`], logged at `debug` |

use tracing::debug;

/// When an element's controller is initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTrigger {
    Immediate,
    Visible(Visibility),
    Event(String),
}

/// Visibility threshold for [`LoadTrigger::Visible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Any pixel visible.
    Any,
    /// The whole element visible.
    Full,
}

impl Visibility {
    /// Intersection ratio an observer must reach.
    #[must_use]
    pub const fn threshold(self) -> f64 {
        match self {
            Self::Any => 0.0,
            Self::Full => 1.0,
        }
    }

    /// Whether an observed ratio satisfies this threshold.
    #[must_use]
    pub fn reached(self, ratio: f64) -> bool {
        match self {
            Self::Any => ratio > 0.0,
            Self::Full => ratio >= 1.0,
        }
    }
}

impl LoadTrigger {
    /// Interpret the value of the load attribute.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::Immediate;
        };
        match raw.trim() {
            "visible" => Self::Visible(Visibility::Any),
            "fully-visible" => Self::Visible(Visibility::Full),
            other => match other.strip_prefix("on:").map(str::trim) {
                Some(event) if !event.is_empty() => Self::Event(event.to_string()),
                _ => {
                    debug!(value = raw, "unrecognised load trigger, loading immediately");
                    Self::Immediate
                }
            },
        }
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        !matches!(self, Self::Immediate)
    }
}

impl std::fmt::Display for LoadTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => f.write_str("immediate"),
            Self::Visible(Visibility::Any) => f.write_str("visible"),
            Self::Visible(Visibility::Full) => f.write_str("fully-visible"),
            Self::Event(event) => write!(f, "on:{event}"),
        }
    }
}
