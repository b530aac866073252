//! Style ranking of declarative attribute rules.
//!
//! A declarative rule reaches an operation through one of its method
//! elements. Elements rank as wildcard < surface-qualified wildcard <
//! operation name < operation signature; the highest-ranked match wins and
//! a later rule replaces an earlier one of equal rank.

use beanmeta_core::{AttributeRule, MethodElement, MethodTarget, Operation, Resolved, Specificity};

/// Rank of a method element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Style {
    Wildcard = 1,
    QualifiedWildcard = 2,
    Name = 3,
    Signature = 4,
}

impl Style {
    #[must_use]
    pub fn of(element: &MethodElement) -> Self {
        match element.target() {
            MethodTarget::Wildcard if element.surface.is_some() => Self::QualifiedWildcard,
            MethodTarget::Wildcard => Self::Wildcard,
            MethodTarget::Name(_) => Self::Name,
            MethodTarget::Signature(..) => Self::Signature,
        }
    }

    /// Provenance specificity recorded for a value won at this rank.
    #[must_use]
    pub const fn specificity(self) -> Specificity {
        match self {
            Self::Wildcard | Self::QualifiedWildcard => Specificity::ComponentDefault,
            Self::Name => Specificity::OperationName,
            Self::Signature => Specificity::OperationSignature,
        }
    }
}

/// Returns `true` if `element` applies to `op`.
///
/// An unqualified wildcard never reaches an operation that is only a
/// lifecycle callback.
#[must_use]
pub fn reaches(element: &MethodElement, op: &Operation) -> bool {
    if element.is_wildcard() && element.surface.is_none() && op.is_lifecycle_only() {
        return false;
    }
    element.matches(op)
}

/// Highest style among `elements` that reach `op`.
#[must_use]
pub fn element_style(op: &Operation, elements: &[MethodElement]) -> Option<Style> {
    elements
        .iter()
        .filter(|e| reaches(e, op))
        .map(Style::of)
        .max()
}

/// The rule value that wins for `op`, with the rank it won at.
pub fn winning_rule<'r, T>(op: &Operation, rules: &'r [AttributeRule<T>]) -> Option<(&'r T, Style)> {
    let mut best: Option<(&'r T, Style)> = None;
    for (index, rule) in rules.iter().enumerate() {
        let Some(style) = element_style(op, &rule.methods) else {
            continue;
        };
        match best {
            Some((_, current)) if style < current => {}
            Some((_, current)) => {
                tracing::debug!(
                    operation = %op.id,
                    rule = index,
                    style = ?style,
                    replaced = ?current,
                    "declarative rule replaces earlier match"
                );
                best = Some((&rule.value, style));
            }
            None => best = Some((&rule.value, style)),
        }
    }
    best
}

/// The winning declarative value for `op`, with provenance.
pub fn declarative<T: Clone>(op: &Operation, rules: &[AttributeRule<T>]) -> Option<Resolved<T>> {
    winning_rule(op, rules).map(|(value, style)| Resolved::declarative(value.clone(), style.specificity()))
}
