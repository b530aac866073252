//! Operation identity and the structural facts recorded for each cataloged operation.
//!
//! An operation is identified by `(declaring type, name, parameter types)`.
//! Parameter type names are compared after [`normalize_type_name`], so
//! `int [ ]` and `int[]` denote the same parameter.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::surface::ExposureSurface;

/// Blanks in front of array brackets (and runs of blanks) carry no meaning.
static BRACKET_BLANKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(\[|\])|\[\s+").expect("static pattern is valid")
});

/// Removes blanks in the vicinity of array brackets and trims the name.
///
/// ```
/// use beanmeta_core::operation::normalize_type_name;
///
/// assert_eq!(normalize_type_name(" int [ ] [ ]"), "int[][]");
/// assert_eq!(normalize_type_name("Money"), "Money");
/// ```
#[must_use]
pub fn normalize_type_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut current = trimmed.to_string();
    loop {
        let next = BRACKET_BLANKS.replace_all(&current, |caps: &regex::Captures<'_>| {
            caps.get(1).map_or_else(|| "[".to_string(), |m| m.as_str().to_string())
        });
        if next == current {
            return current;
        }
        current = next.into_owned();
    }
}

/// Returns `true` if two parameter lists are equal after normalisation.
#[must_use]
pub fn params_match(declared: &[String], actual: &[String]) -> bool {
    declared.len() == actual.len()
        && declared
            .iter()
            .zip(actual)
            .all(|(d, a)| normalize_type_name(d) == normalize_type_name(a))
}

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// Identity of a callable operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationId {
    /// Type that declares the operation (the most derived declaration when overridden).
    pub declaring_type: String,
    /// Operation name.
    pub name: String,
    /// Ordered, normalised parameter type names.
    #[serde(default)]
    pub params: Vec<String>,
}

impl OperationId {
    /// Creates an identity, normalising each parameter type name.
    pub fn new<I, S>(declaring_type: impl Into<String>, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params: params
                .into_iter()
                .map(|p| normalize_type_name(p.as_ref()))
                .collect(),
        }
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Signature in `name:P1,P2` form, independent of the declaring type.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}:{}", self.name, self.params.join(","))
    }

    /// Returns `true` if name and parameter list match.
    #[must_use]
    pub fn matches(&self, name: &str, params: &[String]) -> bool {
        self.name == name && params_match(&self.params, params)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.declaring_type,
            self.name,
            self.params.join(",")
        )
    }
}

/// A name plus parameter list, without a declaring type.
///
/// Used for interface method declarations and lifecycle callback references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl MethodSig {
    pub fn new<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            params: params
                .into_iter()
                .map(|p| normalize_type_name(p.as_ref()))
                .collect(),
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(","))
    }
}

// ---------------------------------------------------------------------------
// Structural facts
// ---------------------------------------------------------------------------

/// Return type shape, reduced to what the resolution rules care about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReturnType {
    /// No value.
    #[default]
    Void,
    /// A deferred result handle (future-like) completed by the container.
    Deferred,
    /// Any other value type, by name.
    Value(String),
}

/// Structural modifiers of an implementation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifiers {
    /// `false` for final-equivalent methods.
    pub overridable: bool,
    /// `false` for static-equivalent methods.
    pub instance: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            overridable: true,
            instance: true,
        }
    }
}

/// A cataloged operation. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    /// Every surface through which the operation is reachable.
    pub surfaces: BTreeSet<ExposureSurface>,
    pub return_type: ReturnType,
    /// Declared application exceptions.
    pub exceptions: Vec<String>,
    pub modifiers: Modifiers,
    /// Hierarchy depth of the declaring type; 0 is the root of the hierarchy.
    pub depth: u32,
    /// Position of the declaration within its declaring type.
    pub declaration_index: u32,
    /// Container-internal placeholder with no implementation method.
    pub synthetic: bool,
}

impl Operation {
    #[must_use]
    pub fn arity(&self) -> usize {
        self.id.arity()
    }

    #[must_use]
    pub fn is_on(&self, surface: ExposureSurface) -> bool {
        self.surfaces.contains(&surface)
    }

    /// `true` when the operation is reachable only as a lifecycle callback.
    #[must_use]
    pub fn is_lifecycle_only(&self) -> bool {
        !self.surfaces.is_empty()
            && self
                .surfaces
                .iter()
                .all(|s| *s == ExposureSurface::LifecycleCallback)
    }

    /// `true` when at least one surface runs around-invoke style interceptors.
    #[must_use]
    pub fn is_interceptable(&self) -> bool {
        !self.synthetic && self.surfaces.iter().any(|s| s.is_interceptable())
    }
}
