use crate::error::{Error, Result};
use crate::tokens::is_single_token;

pub(crate) const DEFAULT_ATTR_PREFIX: &str = "handob-";
pub(crate) const DEFAULT_HANDLER_ATTR: &str = "handler";
pub(crate) const DEFAULT_OBSERVER_ATTR: &str = "observer";
pub(crate) const DEFAULT_EVENT: &str = "click";

/// Attribute naming and defaults for a [`Page`](crate::Page).
///
/// With the defaults, elements opt in through `data-handob-handler` and
/// `data-handob-observer`, and handlers registered without an event listen for
/// `click`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    attr_prefix: String,
    prefix_enabled: bool,
    handler_attr: String,
    observer_attr: String,
    default_event: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            attr_prefix: DEFAULT_ATTR_PREFIX.into(),
            prefix_enabled: true,
            handler_attr: DEFAULT_HANDLER_ATTR.into(),
            observer_attr: DEFAULT_OBSERVER_ATTR.into(),
            default_event: DEFAULT_EVENT.into(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attr_prefix = prefix.into();
        self
    }

    pub fn with_prefix_enabled(mut self, enabled: bool) -> Self {
        self.prefix_enabled = enabled;
        self
    }

    pub fn with_handler_attr(mut self, name: impl Into<String>) -> Self {
        self.handler_attr = name.into();
        self
    }

    pub fn with_observer_attr(mut self, name: impl Into<String>) -> Self {
        self.observer_attr = name.into();
        self
    }

    pub fn with_default_event(mut self, event: impl Into<String>) -> Self {
        self.default_event = event.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.attr_prefix.bytes().all(is_attr_name_byte) {
            return Err(Error::InvalidConfig(format!(
                "attribute prefix {:?} contains characters not allowed in attribute names",
                self.attr_prefix
            )));
        }
        for (what, name) in [
            ("handler attribute", &self.handler_attr),
            ("observer attribute", &self.observer_attr),
        ] {
            if name.is_empty() || !name.bytes().all(is_attr_name_byte) {
                return Err(Error::InvalidConfig(format!("{what} {name:?} is not a valid attribute name")));
            }
        }
        if self.handler_attr.eq_ignore_ascii_case(&self.observer_attr) {
            return Err(Error::InvalidConfig(
                "handler and observer attributes must differ".into(),
            ));
        }
        if !is_single_token(&self.default_event) {
            return Err(Error::InvalidConfig(format!(
                "default event {:?} must be a single non-empty name",
                self.default_event
            )));
        }
        Ok(())
    }

    pub fn attr_prefix(&self) -> &str {
        &self.attr_prefix
    }

    pub fn prefix_enabled(&self) -> bool {
        self.prefix_enabled
    }

    pub fn default_event(&self) -> &str {
        &self.default_event
    }

    pub(crate) fn set_prefix_enabled(&mut self, enabled: bool) {
        self.prefix_enabled = enabled;
    }

    fn prefix_in_use(&self) -> &str {
        if self.prefix_enabled {
            &self.attr_prefix
        } else {
            ""
        }
    }

    /// Full attribute name looked up for handler declarations, e.g. `data-handob-handler`.
    pub fn handler_attr_name(&self) -> String {
        format!("data-{}{}", self.prefix_in_use(), self.handler_attr).to_ascii_lowercase()
    }

    /// Full attribute name looked up for observer declarations, e.g. `data-handob-observer`.
    pub fn observer_attr_name(&self) -> String {
        format!("data-{}{}", self.prefix_in_use(), self.observer_attr).to_ascii_lowercase()
    }
}

fn is_attr_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_prefixed_data_attributes() -> Result<()> {
        let config = Config::default();
        config.validate()?;
        assert_eq!(config.handler_attr_name(), "data-handob-handler");
        assert_eq!(config.observer_attr_name(), "data-handob-observer");
        assert_eq!(config.default_event(), "click");
        Ok(())
    }

    #[test]
    fn disabling_the_prefix_changes_only_attribute_names() {
        let mut config = Config::default();
        config.set_prefix_enabled(false);
        assert_eq!(config.handler_attr_name(), "data-handler");
        assert_eq!(config.observer_attr_name(), "data-observer");
        assert_eq!(config.attr_prefix(), "handob-");
        config.set_prefix_enabled(true);
        assert_eq!(config.handler_attr_name(), "data-handob-handler");
    }

    #[test]
    fn custom_names_are_lowercased() -> Result<()> {
        let config = Config::new()
            .with_attr_prefix("App-")
            .with_handler_attr("On")
            .with_observer_attr("Watch")
            .with_default_event("activate");
        config.validate()?;
        assert_eq!(config.handler_attr_name(), "data-app-on");
        assert_eq!(config.observer_attr_name(), "data-app-watch");
        Ok(())
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad = [
            Config::new().with_attr_prefix("a b"),
            Config::new().with_handler_attr(""),
            Config::new().with_observer_attr("x=y"),
            Config::new().with_observer_attr("handler"),
            Config::new().with_default_event(""),
            Config::new().with_default_event("click tap"),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "expected {config:?} to be rejected"
            );
        }
    }
}
