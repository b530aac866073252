use beanmeta_core::{
    AccessTimeout, AttributeFamily, ConfigError, LockMode, Management, Operation, Resolved,
    TimeoutSpec,
};

use super::{merge, styles, AttributeMerger};
use crate::diagnostics::Diagnostics;

impl AttributeMerger<'_> {
    pub(super) fn lock(&self, op: &Operation, diag: &mut Diagnostics) -> Result<Resolved<LockMode>, ConfigError> {
        let mut declarative = styles::declarative(op, &self.input.document.lock_types);
        let mut code = self.code_level(op, |m| m.lock, |t| t.lock);

        if op.synthetic {
            return Ok(Resolved::defaulted(LockMode::Exclusive));
        }

        if self.management.concurrency == Management::SelfManaged {
            self.reject_self_managed(op, AttributeFamily::Lock, declarative.as_ref().or(code.as_ref()), diag)?;
            return Ok(Resolved::defaulted(LockMode::SelfManaged));
        }

        for slot in [&mut declarative, &mut code] {
            if let Some(value) = slot.as_ref().filter(|v| v.value == LockMode::SelfManaged) {
                self.invalid_value(
                    op,
                    AttributeFamily::Lock,
                    format!("{} is only implied by self-managed concurrency ({})", value.value, value.provenance),
                    diag,
                )?;
                *slot = None;
            }
        }

        Ok(merge(declarative, code, LockMode::Exclusive))
    }

    /// Resolves the access timeout.
    ///
    /// Source values stay `None` until the default-fill step so an explicit
    /// `0` is never confused with "not set".
    pub(super) fn access_timeout(
        &self,
        op: &Operation,
        diag: &mut Diagnostics,
    ) -> Result<Resolved<AccessTimeout>, ConfigError> {
        let flavour_default = self.config.default_access_timeout(self.input.component.kind);
        if op.synthetic {
            return Ok(Resolved::defaulted(flavour_default));
        }

        let declarative = styles::declarative(op, &self.input.document.access_timeouts);
        let code = self.code_level(op, |m| m.access_timeout, |t| t.access_timeout);

        if self.management.concurrency == Management::SelfManaged {
            self.reject_self_managed(
                op,
                AttributeFamily::AccessTimeout,
                declarative.as_ref().or(code.as_ref()),
                diag,
            )?;
            return Ok(Resolved::defaulted(flavour_default));
        }

        let declarative = self.convert(op, declarative, diag)?;
        let code = self.convert(op, code, diag)?;
        Ok(merge(declarative, code, flavour_default))
    }

    fn convert(
        &self,
        op: &Operation,
        spec: Option<Resolved<TimeoutSpec>>,
        diag: &mut Diagnostics,
    ) -> Result<Option<Resolved<AccessTimeout>>, ConfigError> {
        let Some(spec) = spec else {
            return Ok(None);
        };
        match spec.value.to_access_timeout() {
            Ok(timeout) => Ok(Some(spec.map(|_| timeout))),
            Err(err) => {
                self.invalid_value(
                    op,
                    AttributeFamily::AccessTimeout,
                    format!("{err} ({})", spec.provenance),
                    diag,
                )?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use beanmeta_core::{
        AttributeRule, ComponentKind, ErrorKind, MarkerTable, MethodElement, OperationMarkers,
        Provenance, Specificity, TimeUnit, TypeMarkers,
    };

    use super::super::test_support::*;
    use super::*;
    use crate::config::ResolverConfig;

    #[test]
    fn code_level_lock_applies() {
        let read = business("balance", &[]);
        let mut input = input(ComponentKind::Singleton);
        input.markers = MarkerTable::default().with_type(
            "BillingBean",
            TypeMarkers {
                lock: Some(LockMode::Shared),
                ..TypeMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .lock(&read, &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::code_level(LockMode::Shared, Specificity::TypeLevel));
    }

    #[test]
    fn self_managed_concurrency_rejects_lock() {
        let read = business("balance", &[]);
        let mut input = input(ComponentKind::Singleton);
        input.component.management.concurrency = Management::SelfManaged;
        input.document.lock_types = vec![AttributeRule::new(vec![MethodElement::named("balance")], LockMode::Shared)];
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        let err = merger.lock(&read, &mut strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalAttributeForSelfManagedMode);
        assert_eq!(
            merger.lock(&read, &mut lenient()).unwrap(),
            Resolved::defaulted(LockMode::SelfManaged)
        );
    }

    #[test]
    fn unset_timeout_uses_flavour_default() {
        let read = business("balance", &[]);
        let config = ResolverConfig::default();

        let singleton = input(ComponentKind::Singleton);
        let resolved = AttributeMerger::new(&singleton, &config)
            .access_timeout(&read, &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::defaulted(AccessTimeout::Millis(300_000)));

        let stateful = input(ComponentKind::Stateful);
        let resolved = AttributeMerger::new(&stateful, &config)
            .access_timeout(&read, &mut strict())
            .unwrap();
        assert_eq!(resolved, Resolved::defaulted(AccessTimeout::Unbounded));
    }

    #[test]
    fn explicit_zero_is_kept() {
        let read = business("balance", &[]);
        let mut input = input(ComponentKind::Singleton);
        input.markers = MarkerTable::default().with_operation(
            read.id.clone(),
            OperationMarkers {
                access_timeout: Some(TimeoutSpec::millis(0)),
                ..OperationMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .access_timeout(&read, &mut strict())
            .unwrap();
        assert_eq!(resolved.value, AccessTimeout::Millis(0));
        assert_eq!(resolved.provenance, Provenance::CodeLevel(Specificity::OperationSignature));
    }

    #[test]
    fn declarative_timeout_converts_units() {
        let read = business("balance", &[]);
        let mut input = input(ComponentKind::Singleton);
        input.document.access_timeouts = vec![AttributeRule::new(
            vec![MethodElement::wildcard()],
            TimeoutSpec {
                value: 3,
                unit: TimeUnit::Seconds,
            },
        )];
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .access_timeout(&read, &mut strict())
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::declarative(AccessTimeout::Millis(3_000), Specificity::ComponentDefault)
        );
    }

    #[test]
    fn out_of_range_timeout_is_invalid() {
        let read = business("balance", &[]);
        let mut input = input(ComponentKind::Singleton);
        input.document.access_timeouts =
            vec![AttributeRule::new(vec![MethodElement::named("balance")], TimeoutSpec::millis(-5))];
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        let err = merger.access_timeout(&read, &mut strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAttributeValue);

        let mut diag = lenient();
        let resolved = merger.access_timeout(&read, &mut diag).unwrap();
        assert_eq!(resolved, Resolved::defaulted(AccessTimeout::Millis(300_000)));
        assert_eq!(diag.errors().len(), 1);
    }

    #[test]
    fn self_managed_concurrency_rejects_timeout() {
        let read = business("balance", &[]);
        let mut input = input(ComponentKind::Singleton);
        input.component.management.concurrency = Management::SelfManaged;
        input.document.access_timeouts =
            vec![AttributeRule::new(vec![MethodElement::wildcard()], TimeoutSpec::millis(10))];
        let config = ResolverConfig::default();
        let err = AttributeMerger::new(&input, &config)
            .access_timeout(&read, &mut strict())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalAttributeForSelfManagedMode);
        assert!(err.to_string().contains("10 milliseconds"));
    }
}
