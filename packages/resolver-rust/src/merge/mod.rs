//! Per-family attribute merging.
//!
//! Each family module extends [`AttributeMerger`] with the resolution of one
//! attribute family. They share the same precedence: a declarative value
//! beats a code-level value, which beats the family's structural default.

mod activity;
mod asynchronous;
mod concurrency;
mod remove;
mod security;
pub mod styles;
mod transaction;

use std::fmt::Display;

use beanmeta_core::{
    AccessTimeout, ActivityScopeMode, AttributeFamily, Authorization, ComponentInput, ConfigError,
    ExposureSurface, LockMode, ManagementModes, Operation, OperationMarkers, RemoveSemantics,
    Resolved, Specificity, TransactionMode, TypeMarkers,
};

use crate::config::ResolverConfig;
use crate::diagnostics::Diagnostics;

pub use styles::Style;

/// Picks the value of one attribute family for one operation.
///
/// The declarative value outranks the code-level value; when neither is
/// present the structural default is used with [`Provenance::Default`].
///
/// [`Provenance::Default`]: beanmeta_core::Provenance::Default
pub fn merge<T>(declarative: Option<Resolved<T>>, code_level: Option<Resolved<T>>, default: T) -> Resolved<T> {
    declarative
        .or(code_level)
        .unwrap_or_else(|| Resolved::defaulted(default))
}

/// Merged attributes of one operation, before the interceptor chain is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedAttributes {
    pub transaction_mode: Resolved<TransactionMode>,
    pub lock_mode: Resolved<LockMode>,
    pub access_timeout: Resolved<AccessTimeout>,
    pub authorization: Resolved<Authorization>,
    pub activity_scope: Resolved<ActivityScopeMode>,
    pub asynchronous: Resolved<bool>,
    pub remove_semantics: Option<Resolved<RemoveSemantics>>,
}

/// Merges declarative rules and code-level markers for one component.
#[derive(Debug)]
pub struct AttributeMerger<'a> {
    input: &'a ComponentInput,
    config: &'a ResolverConfig,
    management: ManagementModes,
}

impl<'a> AttributeMerger<'a> {
    #[must_use]
    pub fn new(input: &'a ComponentInput, config: &'a ResolverConfig) -> Self {
        Self {
            input,
            config,
            management: input.management(),
        }
    }

    /// Checks declarations that do not depend on a particular operation.
    ///
    /// # Errors
    ///
    /// In strict mode, returns [`ConfigError::ConflictingMarkers`] for
    /// contradictory type-level authorization markers and
    /// [`ConfigError::InvalidAttributeValue`] for a wildcard asynchronous
    /// entry carrying parameters.
    pub fn check_declarations(&self, diag: &mut Diagnostics) -> Result<(), ConfigError> {
        self.check_type_security_markers(diag)?;
        self.check_async_declarations(diag)
    }

    /// Resolves every attribute family of `op`.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first configuration error raised by any
    /// family.
    pub fn merge_operation(&self, op: &Operation, diag: &mut Diagnostics) -> Result<MergedAttributes, ConfigError> {
        let transaction_mode = self.transaction(op, diag)?;
        let lock_mode = self.lock(op, diag)?;
        let access_timeout = self.access_timeout(op, diag)?;
        let authorization = self.authorization(op, diag)?;
        let activity_scope = self.activity_scope(op, diag)?;
        let asynchronous = self.asynchronous(op, &transaction_mode, diag)?;
        let remove_semantics = self.remove_semantics(op);
        Ok(MergedAttributes {
            transaction_mode,
            lock_mode,
            access_timeout,
            authorization,
            activity_scope,
            asynchronous,
            remove_semantics,
        })
    }

    /// Code-level value for `op`: an operation marker, else a marker on the
    /// declaring type. Lifecycle-only operations consult operation markers only.
    fn code_level<T>(
        &self,
        op: &Operation,
        from_operation: impl Fn(&OperationMarkers) -> Option<T>,
        from_type: impl Fn(&TypeMarkers) -> Option<T>,
    ) -> Option<Resolved<T>> {
        if !self.input.honours_markers() || op.synthetic {
            return None;
        }
        let markers = &self.input.markers;
        if let Some(value) = markers.for_operation(&op.id).and_then(from_operation) {
            return Some(Resolved::code_level(value, Specificity::OperationSignature));
        }
        if op.is_lifecycle_only() {
            return None;
        }
        markers
            .for_type(&op.id.declaring_type)
            .and_then(from_type)
            .map(|value| Resolved::code_level(value, Specificity::TypeLevel))
    }

    fn operation_markers(&self, op: &Operation) -> Option<&'a OperationMarkers> {
        if !self.input.honours_markers() || op.synthetic {
            return None;
        }
        self.input.markers.for_operation(&op.id)
    }

    fn component(&self) -> String {
        self.input.component.name.clone()
    }

    /// Reports an explicit value on a family the component manages itself.
    fn reject_self_managed<T: Display>(
        &self,
        op: &Operation,
        family: AttributeFamily,
        explicit: Option<&Resolved<T>>,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        match explicit {
            Some(value) => diag.report(ConfigError::IllegalAttributeForSelfManagedMode {
                component: self.component(),
                operation: op.id.clone(),
                family,
                value: value.value.to_string(),
                provenance: value.provenance,
            }),
            None => Ok(()),
        }
    }

    fn illegal_for_surface<T: Display>(
        &self,
        op: &Operation,
        surface: ExposureSurface,
        family: AttributeFamily,
        value: &Resolved<T>,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        diag.report(ConfigError::AttributeIllegalForExposureSurface {
            component: self.component(),
            operation: op.id.clone(),
            surface,
            family,
            value: value.value.to_string(),
            provenance: value.provenance,
        })
    }

    fn invalid_value(
        &self,
        op: &Operation,
        family: AttributeFamily,
        detail: String,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        diag.report(ConfigError::InvalidAttributeValue {
            component: self.component(),
            location: op.id.to_string(),
            family,
            detail,
        })
    }
}
