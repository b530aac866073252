//! Attribute families, their value types, and provenance tracking.
//!
//! Every resolved value is wrapped in [`Resolved`], which records the
//! source that supplied it so diagnostics can name the winning rule.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Specificity & provenance
// ---------------------------------------------------------------------------

/// Granularity at which a rule is declared. Ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Specificity {
    /// Applies to every operation (the `*` wildcard).
    ComponentDefault,
    /// Applies to every operation of the component type.
    TypeLevel,
    /// Applies to every overload with the given name.
    OperationName,
    /// Applies to the single overload with the exact parameter list.
    OperationSignature,
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ComponentDefault => "component-default",
            Self::TypeLevel => "type-level",
            Self::OperationName => "operation-name",
            Self::OperationSignature => "operation-signature",
        })
    }
}

/// Which configuration source supplied a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeSource {
    /// The structured configuration document.
    #[default]
    Declarative,
    /// Markers attached to code elements.
    CodeLevel,
}

impl fmt::Display for AttributeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Declarative => "declarative",
            Self::CodeLevel => "code-level",
        })
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    /// Structural default; neither source supplied a value.
    Default,
    /// Supplied by the declarative document at the given specificity.
    Declarative(Specificity),
    /// Supplied by a code-level marker at the given specificity.
    CodeLevel(Specificity),
}

impl Provenance {
    /// The source, or `None` for a structural default.
    #[must_use]
    pub const fn source(self) -> Option<AttributeSource> {
        match self {
            Self::Default => None,
            Self::Declarative(_) => Some(AttributeSource::Declarative),
            Self::CodeLevel(_) => Some(AttributeSource::CodeLevel),
        }
    }

    #[must_use]
    pub const fn is_explicit(self) -> bool {
        !matches!(self, Self::Default)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Declarative(s) => write!(f, "declarative ({s})"),
            Self::CodeLevel(s) => write!(f, "code-level ({s})"),
        }
    }
}

/// A value plus the provenance of the source that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolved<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Resolved<T> {
    pub const fn new(value: T, provenance: Provenance) -> Self {
        Self { value, provenance }
    }

    pub const fn defaulted(value: T) -> Self {
        Self::new(value, Provenance::Default)
    }

    pub const fn declarative(value: T, specificity: Specificity) -> Self {
        Self::new(value, Provenance::Declarative(specificity))
    }

    pub const fn code_level(value: T, specificity: Specificity) -> Self {
        Self::new(value, Provenance::CodeLevel(specificity))
    }

    /// Keeps the provenance, replaces the value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved::new(f(self.value), self.provenance)
    }
}

/// Attribute families resolved per operation. Used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeFamily {
    Transaction,
    Lock,
    AccessTimeout,
    Authorization,
    ActivityScope,
    Asynchronous,
    RemoveSemantics,
    Interceptors,
}

impl fmt::Display for AttributeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transaction => "transaction",
            Self::Lock => "lock",
            Self::AccessTimeout => "access-timeout",
            Self::Authorization => "authorization",
            Self::ActivityScope => "activity-scope",
            Self::Asynchronous => "asynchronous",
            Self::RemoveSemantics => "remove-semantics",
            Self::Interceptors => "interceptors",
        })
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Transaction demarcation for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    NotSupported,
    Supports,
    Required,
    RequiresNew,
    Mandatory,
    Never,
    /// The component demarcates its own transactions.
    SelfManaged,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotSupported => "not-supported",
            Self::Supports => "supports",
            Self::Required => "required",
            Self::RequiresNew => "requires-new",
            Self::Mandatory => "mandatory",
            Self::Never => "never",
            Self::SelfManaged => "self-managed",
        })
    }
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// Container-managed concurrency lock for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockMode {
    /// Concurrent readers allowed.
    Shared,
    /// One caller at a time.
    Exclusive,
    /// The component synchronises itself.
    SelfManaged,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shared => "shared",
            Self::Exclusive => "exclusive",
            Self::SelfManaged => "self-managed",
        })
    }
}

/// Time units accepted for access timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nanoseconds => "nanoseconds",
            Self::Microseconds => "microseconds",
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        })
    }
}

/// An access timeout as written in a source, before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutSpec {
    /// `-1` waits forever, `0` rejects concurrent access, positive values wait.
    pub value: i64,
    #[serde(default)]
    pub unit: TimeUnit,
}

impl TimeoutSpec {
    #[must_use]
    pub const fn millis(value: i64) -> Self {
        Self {
            value,
            unit: TimeUnit::Milliseconds,
        }
    }

    /// Converts to an [`AccessTimeout`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTimeout::OutOfRange`] for values below `-1` or equal
    /// to `i64::MAX`, and [`InvalidTimeout::Overflow`] if the conversion to
    /// milliseconds overflows.
    pub fn to_access_timeout(self) -> Result<AccessTimeout, InvalidTimeout> {
        if self.value < -1 || self.value == i64::MAX {
            return Err(InvalidTimeout::OutOfRange { value: self.value });
        }
        if self.value == -1 {
            return Ok(AccessTimeout::Unbounded);
        }
        let millis = match self.unit {
            TimeUnit::Nanoseconds => Some(self.value / 1_000_000),
            TimeUnit::Microseconds => Some(self.value / 1_000),
            TimeUnit::Milliseconds => Some(self.value),
            TimeUnit::Seconds => self.value.checked_mul(1_000),
            TimeUnit::Minutes => self.value.checked_mul(60_000),
            TimeUnit::Hours => self.value.checked_mul(3_600_000),
            TimeUnit::Days => self.value.checked_mul(86_400_000),
        };
        match millis {
            Some(ms) if ms != i64::MAX => Ok(AccessTimeout::Millis(ms.unsigned_abs())),
            _ => Err(InvalidTimeout::Overflow {
                value: self.value,
                unit: self.unit,
            }),
        }
    }
}

impl fmt::Display for TimeoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Why a [`TimeoutSpec`] could not be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTimeout {
    #[error("access timeout {value} must be -1 or greater and less than {}", i64::MAX)]
    OutOfRange { value: i64 },
    #[error("converting access timeout {value} {unit} to milliseconds overflows")]
    Overflow { value: i64, unit: TimeUnit },
}

/// How long a caller waits for the operation's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessTimeout {
    /// Wait forever.
    Unbounded,
    /// Wait at most this many milliseconds; `0` rejects concurrent access outright.
    Millis(u64),
}

impl fmt::Display for AccessTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Millis(ms) => write!(f, "{ms}ms"),
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Who may invoke an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Authorization {
    DenyAll,
    PermitAll,
    Roles(BTreeSet<String>),
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DenyAll => f.write_str("deny-all"),
            Self::PermitAll => f.write_str("permit-all"),
            Self::Roles(roles) => {
                let joined: Vec<&str> = roles.iter().map(String::as_str).collect();
                write!(f, "roles[{}]", joined.join(","))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Activity scope
// ---------------------------------------------------------------------------

/// Activity-session demarcation. Only the declarative source sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityScopeMode {
    #[default]
    Unspecified,
    NotSupported,
    Supports,
    Required,
    RequiresNew,
    Mandatory,
    Never,
    SelfManaged,
}

impl fmt::Display for ActivityScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unspecified => "unspecified",
            Self::NotSupported => "not-supported",
            Self::Supports => "supports",
            Self::Required => "required",
            Self::RequiresNew => "requires-new",
            Self::Mandatory => "mandatory",
            Self::Never => "never",
            Self::SelfManaged => "self-managed",
        })
    }
}

// ---------------------------------------------------------------------------
// Remove semantics
// ---------------------------------------------------------------------------

/// Marks an operation that ends the component instance's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSemantics {
    /// Keep the instance when the operation ends with an application exception.
    #[serde(default)]
    pub retain_if_exception: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_is_totally_ordered() {
        assert!(Specificity::ComponentDefault < Specificity::TypeLevel);
        assert!(Specificity::TypeLevel < Specificity::OperationName);
        assert!(Specificity::OperationName < Specificity::OperationSignature);
    }

    #[test]
    fn provenance_source() {
        assert_eq!(Provenance::Default.source(), None);
        assert_eq!(
            Provenance::Declarative(Specificity::OperationName).source(),
            Some(AttributeSource::Declarative)
        );
        assert_eq!(
            Provenance::CodeLevel(Specificity::TypeLevel).source(),
            Some(AttributeSource::CodeLevel)
        );
        assert!(!Provenance::Default.is_explicit());
    }

    #[test]
    fn timeout_special_values() {
        assert_eq!(
            TimeoutSpec::millis(-1).to_access_timeout(),
            Ok(AccessTimeout::Unbounded)
        );
        assert_eq!(
            TimeoutSpec::millis(0).to_access_timeout(),
            Ok(AccessTimeout::Millis(0))
        );
    }

    #[test]
    fn timeout_converts_units() {
        let spec = TimeoutSpec {
            value: 2,
            unit: TimeUnit::Minutes,
        };
        assert_eq!(spec.to_access_timeout(), Ok(AccessTimeout::Millis(120_000)));

        let spec = TimeoutSpec {
            value: 5_000_000,
            unit: TimeUnit::Nanoseconds,
        };
        assert_eq!(spec.to_access_timeout(), Ok(AccessTimeout::Millis(5)));
    }

    #[test]
    fn timeout_rejects_out_of_range_and_overflow() {
        assert_eq!(
            TimeoutSpec::millis(-2).to_access_timeout(),
            Err(InvalidTimeout::OutOfRange { value: -2 })
        );
        assert_eq!(
            TimeoutSpec::millis(i64::MAX).to_access_timeout(),
            Err(InvalidTimeout::OutOfRange { value: i64::MAX })
        );
        let huge = TimeoutSpec {
            value: i64::MAX / 2,
            unit: TimeUnit::Days,
        };
        assert!(matches!(
            huge.to_access_timeout(),
            Err(InvalidTimeout::Overflow { .. })
        ));
    }

    #[test]
    fn authorization_display_lists_roles_sorted() {
        let auth = Authorization::Roles(BTreeSet::from(["teller".to_string(), "auditor".to_string()]));
        assert_eq!(auth.to_string(), "roles[auditor,teller]");
    }

    #[test]
    fn resolved_map_keeps_provenance() {
        let r = Resolved::code_level(3_u32, Specificity::TypeLevel);
        let mapped = r.map(|v| v * 2);
        assert_eq!(mapped.value, 6);
        assert_eq!(mapped.provenance, Provenance::CodeLevel(Specificity::TypeLevel));
    }
}
