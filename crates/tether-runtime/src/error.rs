#![forbid(unsafe_code)]

//! Errors raised by the controller runtime.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown controller | Marker names an undeclared controller | `Err` to the caller, `error!` on observer paths |
//! | Duplicate declaration | `declare` called twice for one name | `Err`, first declaration stays |
//! | Malformed binding | Clause without `(events): methods` shape | `Err` from the parser, `warn!` during hydration |
//! | Unresolved method | Path segment missing from the scope | Not an error; the listener is skipped |
//! | Released context | A `RefHandle` outliving its `Context` | `Err` from the accessor |

use tether_dom::{DomError, NodeId};

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from runtime operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An element names a controller that was never declared.
    UnknownController { name: String, element: NodeId },
    /// An element was asked to initialize without a controller marker.
    MissingControllerName { element: NodeId },
    /// A controller name was declared twice.
    DuplicateController { name: String },
    /// A value key that is not part of the controller's schema.
    UnknownValue { controller: String, key: String },
    /// An event-binding attribute could not be parsed.
    BindingSyntax { source: String, reason: String },
    /// A reference handle was used after its context was released.
    ContextReleased { reference: String },
    /// A host document operation failed.
    Dom(DomError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownController { name, element } => {
                write!(f, "controller '{name}' is not declared (element {element})")
            }
            Self::MissingControllerName { element } => {
                write!(f, "element {element} has no controller name")
            }
            Self::DuplicateController { name } => {
                write!(f, "controller '{name}' is already declared")
            }
            Self::UnknownValue { controller, key } => {
                write!(f, "controller '{controller}' has no value '{key}'")
            }
            Self::BindingSyntax { source, reason } => {
                write!(f, "invalid event binding '{source}': {reason}")
            }
            Self::ContextReleased { reference } => {
                write!(f, "reference '{reference}' outlived its context")
            }
            Self::Dom(err) => write!(f, "document error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomError> for Error {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}
