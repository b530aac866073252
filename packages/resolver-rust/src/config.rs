use beanmeta_core::{AccessTimeout, ComponentKind};
use serde::{Deserialize, Serialize};

/// How configuration errors are reported during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// The first error aborts the build.
    #[default]
    Strict,
    /// Errors are collected; the build continues with legal defaults substituted.
    Lenient,
}

/// Resolver-level configuration shared by every component build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    pub validation_mode: ValidationMode,
    /// Access timeout applied to stateful components when no source sets one.
    pub stateful_access_timeout: AccessTimeout,
    /// Access timeout applied to singleton components when no source sets one.
    pub singleton_access_timeout: AccessTimeout,
    /// Parameter type of one-arg scheduled callbacks.
    pub schedule_context_type: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            validation_mode: ValidationMode::Strict,
            stateful_access_timeout: AccessTimeout::Unbounded,
            singleton_access_timeout: AccessTimeout::Millis(300_000),
            schedule_context_type: "Timer".to_string(),
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            validation_mode: ValidationMode::Lenient,
            ..Self::default()
        }
    }

    /// Default access timeout for a component flavour.
    ///
    /// Stateless and message-driven instances are never shared, so the
    /// value only matters for stateful and singleton components.
    #[must_use]
    pub fn default_access_timeout(&self, kind: ComponentKind) -> AccessTimeout {
        match kind {
            ComponentKind::Singleton => self.singleton_access_timeout,
            ComponentKind::Stateful | ComponentKind::Stateless | ComponentKind::MessageDriven => {
                self.stateful_access_timeout
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = ResolverConfig::default();
        assert_eq!(config.validation_mode, ValidationMode::Strict);
        assert_eq!(config.stateful_access_timeout, AccessTimeout::Unbounded);
        assert_eq!(config.singleton_access_timeout, AccessTimeout::Millis(300_000));
        assert_eq!(config.schedule_context_type, "Timer");
    }

    #[test]
    fn flavour_defaults_are_distinct() {
        let config = ResolverConfig::default();
        assert_eq!(
            config.default_access_timeout(ComponentKind::Stateful),
            AccessTimeout::Unbounded
        );
        assert_eq!(
            config.default_access_timeout(ComponentKind::Singleton),
            AccessTimeout::Millis(300_000)
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"validationMode":"lenient"}"#).unwrap();
        assert_eq!(config, ResolverConfig::lenient());
    }
}
