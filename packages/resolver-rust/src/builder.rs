//! Orchestrates one component build from input tree to frozen table.

use beanmeta_core::{
    ComponentInput, ConfigError, Operation, ResolvedDescriptor, ResolvedTable,
};

use crate::callbacks::CallbackDisambiguator;
use crate::catalog::Catalog;
use crate::config::ResolverConfig;
use crate::diagnostics::Diagnostics;
use crate::interceptors::{CodeInterceptors, InterceptorBindings};
use crate::merge::AttributeMerger;
use crate::validate::validate;

/// Result of a successful build.
///
/// `errors` is always empty in strict mode. In lenient mode it lists every
/// configuration error that was replaced by a legal default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub table: ResolvedTable,
    pub errors: Vec<ConfigError>,
}

impl BuildOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builds [`ResolvedTable`]s under one [`ResolverConfig`].
///
/// A builder holds no per-build state and may be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    config: ResolverConfig,
}

impl DescriptorBuilder {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves every operation of `input` into a frozen table.
    ///
    /// The stages run in a fixed order: declaration checks, operation
    /// catalog, callback binding, interceptor rule preparation, per-operation
    /// merge and chain resolution, then structural validation of the table.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first [`ConfigError`] raised by any stage.
    /// Lenient builds only fail on errors no default can repair, which is
    /// none at present.
    pub fn build(&self, input: &ComponentInput) -> Result<BuildOutcome, ConfigError> {
        let component = &input.component;
        let mut diag = Diagnostics::new(&component.name, self.config.validation_mode);

        let merger = AttributeMerger::new(input, &self.config);
        merger.check_declarations(&mut diag)?;

        let mut catalog = Catalog::build(input, &mut diag)?;
        let callbacks = CallbackDisambiguator::new(input, &self.config).disambiguate(&mut diag)?;
        catalog.join_callbacks(&callbacks, input);

        let bindings = InterceptorBindings::prepare(
            &input.document.interceptor_bindings,
            catalog.operations(),
            &mut diag,
        )?;

        let mut descriptors = Vec::with_capacity(catalog.len());
        for op in catalog.operations() {
            let merged = merger.merge_operation(op, &mut diag)?;
            let interceptor_chain = Self::chain(input, &bindings, op, &mut diag)?;
            descriptors.push(ResolvedDescriptor {
                operation: op.clone(),
                transaction_mode: merged.transaction_mode,
                lock_mode: merged.lock_mode,
                access_timeout: merged.access_timeout,
                authorization: merged.authorization,
                activity_scope: merged.activity_scope,
                asynchronous: merged.asynchronous,
                remove_semantics: merged.remove_semantics,
                interceptor_chain,
            });
        }

        let table = ResolvedTable::new(&component.name, component.kind, descriptors, callbacks);
        for err in validate(&table) {
            diag.report(err)?;
        }

        let errors = diag.into_errors();
        tracing::info!(
            component = %component.name,
            kind = %component.kind,
            operations = table.len(),
            callbacks = table.callbacks().len(),
            errors = errors.len(),
            "component resolved"
        );
        Ok(BuildOutcome { table, errors })
    }

    fn chain(
        input: &ComponentInput,
        bindings: &InterceptorBindings,
        op: &Operation,
        diag: &mut Diagnostics,
    ) -> Result<Vec<String>, ConfigError> {
        let code = if input.honours_markers() {
            CodeInterceptors::from_markers(
                input.markers.for_type(&input.implementation.type_name),
                input.markers.for_operation(&op.id),
            )
        } else {
            CodeInterceptors::default()
        };
        match bindings.resolve(op, code) {
            Ok(chain) => Ok(chain),
            Err(err) => {
                diag.report(err)?;
                Ok(bindings.resolve_unordered(op, code))
            }
        }
    }
}
