#![forbid(unsafe_code)]

//! Marker vocabulary used by the engine.
//!
//! Every attribute and tag the runtime reads is configurable. The defaults
//! are:
//!
//! | Field | Default |
//! |-------|---------|
//! | `controller_attribute` | `data-controller` |
//! | `load_attribute` | `data-load` |
//! | `repeat_attribute` | `data-load-repeat` |
//! | `ref_attribute` | `data-ref` |
//! | `events_attribute` | `data-on` |
//! | `scope_attribute` | `data-scope` |
//! | `binder_tag` | `x-on` |
//! | `binder_target_attribute` | `target` |

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EngineConfig {
    /// Attribute holding the controller name of a root element.
    pub controller_attribute: String,
    /// Attribute selecting the load trigger.
    pub load_attribute: String,
    /// Attribute whose presence keeps a visibility trigger observing.
    pub repeat_attribute: String,
    /// Attribute naming a reference target.
    pub ref_attribute: String,
    /// Attribute carrying the combined event-binding string.
    pub events_attribute: String,
    /// Attribute naming the sub-scope a binding resolves against.
    pub scope_attribute: String,
    /// Tag of binder elements carrying `:event` attributes.
    pub binder_tag: String,
    /// Binder attribute naming the reference to bind to.
    pub binder_target_attribute: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            controller_attribute: "data-controller".into(),
            load_attribute: "data-load".into(),
            repeat_attribute: "data-load-repeat".into(),
            ref_attribute: "data-ref".into(),
            events_attribute: "data-on".into(),
            scope_attribute: "data-scope".into(),
            binder_tag: "x-on".into(),
            binder_target_attribute: "target".into(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_controller_attribute(mut self, name: impl Into<String>) -> Self {
        self.controller_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_load_attribute(mut self, name: impl Into<String>) -> Self {
        self.load_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_repeat_attribute(mut self, name: impl Into<String>) -> Self {
        self.repeat_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_ref_attribute(mut self, name: impl Into<String>) -> Self {
        self.ref_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_events_attribute(mut self, name: impl Into<String>) -> Self {
        self.events_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_scope_attribute(mut self, name: impl Into<String>) -> Self {
        self.scope_attribute = name.into();
        self
    }

    #[must_use]
    pub fn with_binder_tag(mut self, tag: impl Into<String>) -> Self {
        self.binder_tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_binder_target_attribute(mut self, name: impl Into<String>) -> Self {
        self.binder_target_attribute = name.into();
        self
    }

    /// Selector matching every root of `controller`.
    #[must_use]
    pub fn controller_selector(&self, controller: &str) -> String {
        format!("[{}=\"{}\"]", self.controller_attribute, controller)
    }

    /// Selector matching elements tagged with reference `name`.
    #[must_use]
    pub fn ref_selector(&self, name: &str) -> String {
        format!("[{}=\"{}\"]", self.ref_attribute, name)
    }

    /// Parse a configuration from TOML. Missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_use_configured_attributes() {
        let config = EngineConfig::default()
            .with_controller_attribute("data-ctl")
            .with_ref_attribute("data-target");
        assert_eq!(config.controller_selector("menu"), r#"[data-ctl="menu"]"#);
        assert_eq!(config.ref_selector("item"), r#"[data-target="item"]"#);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_overrides_only_named_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            controller_attribute = "data-component"
            binder_tag = "bind-on"
            "#,
        )
        .unwrap();
        assert_eq!(config.controller_attribute, "data-component");
        assert_eq!(config.binder_tag, "bind-on");
        assert_eq!(config.load_attribute, "data-load");
    }
}
