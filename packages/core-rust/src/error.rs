//! Configuration error taxonomy.
//!
//! Every [`ConfigError`] indicates that the declarative document, the
//! code-level markers and the implementation surface disagree. None of them
//! is transient: rebuilding an unchanged input reproduces the same error.

use std::fmt;

use crate::attributes::{AttributeFamily, AttributeSource, Provenance, Specificity};
use crate::component::ComponentKind;
use crate::operation::OperationId;
use crate::rules::{Arity, ExcludeFlag};
use crate::surface::ExposureSurface;

/// Error kinds, independent of the context carried by [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    OperationNotImplemented,
    InvalidExcludeDeclaration,
    AmbiguousBindingSpecificity,
    IllegalAttributeForSelfManagedMode,
    AttributeIllegalForExposureSurface,
    CallbackTargetNotFound,
    AmbiguousCallbackTarget,
    RequiredExposureMissing,
    ForbiddenExposurePresent,
    StructuralSignatureViolation,
    BindingTargetNotFound,
    PartialInterceptorOrder,
    ConflictingMarkers,
    InvalidAttributeValue,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A configuration error raised while building one component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{component}: {surface} operation {operation} has no implementation method {expected}")]
    OperationNotImplemented {
        component: String,
        surface: ExposureSurface,
        operation: String,
        expected: String,
    },

    #[error("{component}: {flag} is not allowed on a {specificity} interceptor binding")]
    InvalidExcludeDeclaration {
        component: String,
        specificity: Specificity,
        flag: ExcludeFlag,
    },

    #[error("{component}: ambiguous interceptor bindings for {target}: {detail}")]
    AmbiguousBindingSpecificity {
        component: String,
        target: String,
        detail: String,
    },

    #[error(
        "{component}: {family} value {value} from {provenance} on {operation} \
         conflicts with self-managed {family}"
    )]
    IllegalAttributeForSelfManagedMode {
        component: String,
        operation: OperationId,
        family: AttributeFamily,
        value: String,
        provenance: Provenance,
    },

    #[error(
        "{component}: {family} value {value} from {provenance} is not allowed on {operation} \
         exposed as {surface}"
    )]
    AttributeIllegalForExposureSurface {
        component: String,
        operation: OperationId,
        surface: ExposureSurface,
        family: AttributeFamily,
        value: String,
        provenance: Provenance,
    },

    #[error("{component}: no {arity} callback method named {method} (requested by {origin})")]
    CallbackTargetNotFound {
        component: String,
        method: String,
        arity: Arity,
        origin: AttributeSource,
    },

    #[error("{component}: callback target {method} is ambiguous: {detail}")]
    AmbiguousCallbackTarget {
        component: String,
        method: String,
        detail: String,
    },

    #[error("{component}: {kind} component must expose at least one of [{required}]")]
    RequiredExposureMissing {
        component: String,
        kind: ComponentKind,
        required: String,
    },

    #[error("{component}: {kind} component must not expose {surface}")]
    ForbiddenExposurePresent {
        component: String,
        kind: ComponentKind,
        surface: ExposureSurface,
    },

    #[error("{component}: {operation} {detail}")]
    StructuralSignatureViolation {
        component: String,
        operation: OperationId,
        detail: String,
    },

    #[error("{component}: {specificity} interceptor binding targets {target}, which is not a business operation")]
    BindingTargetNotFound {
        component: String,
        specificity: Specificity,
        target: String,
    },

    #[error("{component}: interceptor order for {target} is not a total ordering, missing [{missing}]")]
    PartialInterceptorOrder {
        component: String,
        target: String,
        missing: String,
    },

    #[error("{component}: conflicting markers on {location}: {detail}")]
    ConflictingMarkers {
        component: String,
        location: String,
        detail: String,
    },

    #[error("{component}: invalid {family} value on {location}: {detail}")]
    InvalidAttributeValue {
        component: String,
        location: String,
        family: AttributeFamily,
        detail: String,
    },
}

impl ConfigError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OperationNotImplemented { .. } => ErrorKind::OperationNotImplemented,
            Self::InvalidExcludeDeclaration { .. } => ErrorKind::InvalidExcludeDeclaration,
            Self::AmbiguousBindingSpecificity { .. } => ErrorKind::AmbiguousBindingSpecificity,
            Self::IllegalAttributeForSelfManagedMode { .. } => {
                ErrorKind::IllegalAttributeForSelfManagedMode
            }
            Self::AttributeIllegalForExposureSurface { .. } => {
                ErrorKind::AttributeIllegalForExposureSurface
            }
            Self::CallbackTargetNotFound { .. } => ErrorKind::CallbackTargetNotFound,
            Self::AmbiguousCallbackTarget { .. } => ErrorKind::AmbiguousCallbackTarget,
            Self::RequiredExposureMissing { .. } => ErrorKind::RequiredExposureMissing,
            Self::ForbiddenExposurePresent { .. } => ErrorKind::ForbiddenExposurePresent,
            Self::StructuralSignatureViolation { .. } => ErrorKind::StructuralSignatureViolation,
            Self::BindingTargetNotFound { .. } => ErrorKind::BindingTargetNotFound,
            Self::PartialInterceptorOrder { .. } => ErrorKind::PartialInterceptorOrder,
            Self::ConflictingMarkers { .. } => ErrorKind::ConflictingMarkers,
            Self::InvalidAttributeValue { .. } => ErrorKind::InvalidAttributeValue,
        }
    }

    /// Name of the component whose build raised the error.
    #[must_use]
    pub fn component(&self) -> &str {
        match self {
            Self::OperationNotImplemented { component, .. }
            | Self::InvalidExcludeDeclaration { component, .. }
            | Self::AmbiguousBindingSpecificity { component, .. }
            | Self::IllegalAttributeForSelfManagedMode { component, .. }
            | Self::AttributeIllegalForExposureSurface { component, .. }
            | Self::CallbackTargetNotFound { component, .. }
            | Self::AmbiguousCallbackTarget { component, .. }
            | Self::RequiredExposureMissing { component, .. }
            | Self::ForbiddenExposurePresent { component, .. }
            | Self::StructuralSignatureViolation { component, .. }
            | Self::BindingTargetNotFound { component, .. }
            | Self::PartialInterceptorOrder { component, .. }
            | Self::ConflictingMarkers { component, .. }
            | Self::InvalidAttributeValue { component, .. } => component,
        }
    }
}

/// Failure to encode or decode a table snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("snapshot decoding failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
