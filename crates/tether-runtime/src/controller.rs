#![forbid(unsafe_code)]

//! Controller declarations.

use std::rc::Rc;

use crate::context::Context;
use crate::scope::Scope;
use crate::values::ValuesSchema;

/// Builds the scope of one controller instance.
pub type Factory = Rc<dyn Fn(&Context) -> Option<Scope>>;

/// A named behavior declared on an [`Engine`](crate::Engine).
///
/// The factory runs once per bound element. A returned scope is merged into
/// the context scope; factories that mutate the scope later should capture
/// [`Context::scope`] instead.
#[derive(Clone)]
pub struct Controller {
    factory: Factory,
    values: Option<ValuesSchema>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(factory: impl Fn(&Context) -> Option<Scope> + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            values: None,
        }
    }

    /// Declare reactive values read from the root's dataset.
    #[must_use]
    pub fn with_values(mut self, schema: ValuesSchema) -> Self {
        self.values = Some(schema);
        self
    }

    #[must_use]
    pub fn values(&self) -> Option<&ValuesSchema> {
        self.values.as_ref()
    }

    pub(crate) fn build(&self, ctx: &Context) -> Option<Scope> {
        (self.factory)(ctx)
    }
}
