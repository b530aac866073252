use beanmeta_core::{
    AttributeFamily, ConfigError, MethodElement, Operation, Resolved, TransactionMode,
};

use super::styles::{self, Style};
use super::{merge, AttributeMerger};
use crate::diagnostics::Diagnostics;

/// Transaction modes an asynchronous operation may run under.
const ASYNC_MODES: [TransactionMode; 4] = [
    TransactionMode::Required,
    TransactionMode::RequiresNew,
    TransactionMode::NotSupported,
    TransactionMode::SelfManaged,
];

fn wildcard_with_params(element: &MethodElement) -> bool {
    element.is_wildcard() && element.params.is_some()
}

impl AttributeMerger<'_> {
    pub(super) fn check_async_declarations(&self, diag: &mut Diagnostics) -> Result<(), ConfigError> {
        for element in &self.input.document.async_methods {
            if wildcard_with_params(element) {
                diag.report(ConfigError::InvalidAttributeValue {
                    component: self.component(),
                    location: element.to_string(),
                    family: AttributeFamily::Asynchronous,
                    detail: "a wildcard asynchronous method must not list parameters".to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Asynchronous dispatch is switched on by either source and never off.
    pub(super) fn asynchronous(
        &self,
        op: &Operation,
        transaction: &Resolved<TransactionMode>,
        diag: &mut Diagnostics,
    ) -> Result<Resolved<bool>, ConfigError> {
        let client_view = op.surfaces.iter().copied().find(|s| s.supports_asynchronous());
        let Some(surface) = client_view.filter(|_| !op.synthetic) else {
            return Ok(Resolved::defaulted(false));
        };

        let declarative = self
            .input
            .document
            .async_methods
            .iter()
            .filter(|e| !wildcard_with_params(e) && styles::reaches(e, op))
            .map(Style::of)
            .max()
            .map(|style| Resolved::declarative(true, style.specificity()));
        let code = self.code_level(
            op,
            |m| m.asynchronous.then_some(true),
            |t| t.asynchronous.then_some(true),
        );

        let resolved = merge(declarative, code, false);
        if resolved.value && !ASYNC_MODES.contains(&transaction.value) {
            self.illegal_for_surface(op, surface, AttributeFamily::Transaction, transaction, diag)?;
            return Ok(Resolved::defaulted(false));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use beanmeta_core::{
        ComponentKind, ErrorKind, ExposureSurface, MarkerTable, Specificity, TypeMarkers,
    };

    use super::super::test_support::*;
    use super::*;
    use crate::config::ResolverConfig;

    fn required() -> Resolved<TransactionMode> {
        Resolved::defaulted(TransactionMode::Required)
    }

    #[test]
    fn declarative_entry_turns_async_on() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.document.async_methods = vec![MethodElement::named("charge")];
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .asynchronous(&charge, &required(), &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::declarative(true, Specificity::OperationName));
    }

    #[test]
    fn type_marker_turns_async_on() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Singleton);
        input.markers = MarkerTable::default().with_type(
            "BillingBean",
            TypeMarkers {
                asynchronous: true,
                ..TypeMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .asynchronous(&charge, &required(), &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::code_level(true, Specificity::TypeLevel));
    }

    #[test]
    fn service_endpoint_operations_are_never_async() {
        let endpoint = op("charge", &["Money"], &[ExposureSurface::ServiceEndpoint]);
        let mut input = input(ComponentKind::Stateless);
        input.document.async_methods = vec![MethodElement::wildcard()];
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .asynchronous(&endpoint, &required(), &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::defaulted(false));
    }

    #[test]
    fn async_requires_a_legal_transaction_mode() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.document.async_methods = vec![MethodElement::wildcard()];
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        let mandatory = Resolved::defaulted(TransactionMode::Mandatory);
        let err = merger
            .asynchronous(&charge, &mandatory, &mut strict())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeIllegalForExposureSurface);
        assert!(err.to_string().contains("mandatory"));
    }

    #[test]
    fn wildcard_with_parameters_is_invalid() {
        let mut input = input(ComponentKind::Stateless);
        input.document.async_methods = vec![MethodElement::signature("*", ["Money"])];
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        let err = merger.check_declarations(&mut strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAttributeValue);

        let resolved = merger
            .asynchronous(&business("charge", &["Money"]), &required(), &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::defaulted(false));
    }
}
