//! Routes configuration errors according to the validation mode.

use beanmeta_core::ConfigError;

use crate::config::ValidationMode;

/// Error sink for one component build.
///
/// In strict mode [`Diagnostics::report`] hands the error straight back so
/// the caller can propagate it with `?`. In lenient mode the error is logged,
/// recorded, and the caller continues with a legal default.
#[derive(Debug)]
pub struct Diagnostics {
    component: String,
    mode: ValidationMode,
    errors: Vec<ConfigError>,
}

impl Diagnostics {
    pub fn new(component: impl Into<String>, mode: ValidationMode) -> Self {
        Self {
            component: component.into(),
            mode,
            errors: Vec::new(),
        }
    }

    /// Name of the component being built, used when constructing errors.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Reports an error.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged in strict mode.
    pub fn report(&mut self, err: ConfigError) -> Result<(), ConfigError> {
        match self.mode {
            ValidationMode::Strict => Err(err),
            ValidationMode::Lenient => {
                tracing::warn!(
                    component = %self.component,
                    kind = %err.kind(),
                    "{err}"
                );
                self.errors.push(err);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ConfigError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use beanmeta_core::{ComponentKind, ErrorKind};

    use super::*;

    fn missing_exposure() -> ConfigError {
        ConfigError::RequiredExposureMissing {
            component: "Billing".to_string(),
            kind: ComponentKind::Stateless,
            required: "local-business".to_string(),
        }
    }

    #[test]
    fn strict_returns_first_error() {
        let mut diag = Diagnostics::new("Billing", ValidationMode::Strict);
        let err = diag.report(missing_exposure()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequiredExposureMissing);
        assert!(diag.errors().is_empty());
    }

    #[test]
    fn lenient_collects_all() {
        let mut diag = Diagnostics::new("Billing", ValidationMode::Lenient);
        diag.report(missing_exposure()).unwrap();
        diag.report(missing_exposure()).unwrap();
        assert_eq!(diag.component(), "Billing");
        assert_eq!(diag.into_errors().len(), 2);
    }
}
