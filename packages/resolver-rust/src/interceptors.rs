//! Interceptor chain resolution across the four binding specificities.
//!
//! Chains are additive across levels: component default, then type level,
//! then the most specific operation-level binding. Exclude flags opt an
//! operation out of the inherited levels, and an interceptor order replaces
//! the computed chain when it names every member.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use beanmeta_core::operation::normalize_type_name;
use beanmeta_core::{
    AttributeFamily, BindingRule, ConfigError, ExcludeFlag, Operation, OperationMarkers,
    Specificity, TypeMarkers,
};

use crate::diagnostics::Diagnostics;

// ---------------------------------------------------------------------------
// Code-level interceptor markers
// ---------------------------------------------------------------------------

/// Code-level interceptor markers that apply to one operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeInterceptors<'a> {
    pub type_level: &'a [String],
    pub type_excludes_default: bool,
    pub operation: &'a [String],
    pub operation_excludes_default: bool,
    pub operation_excludes_type: bool,
}

impl<'a> CodeInterceptors<'a> {
    #[must_use]
    pub fn from_markers(
        type_markers: Option<&'a TypeMarkers>,
        operation_markers: Option<&'a OperationMarkers>,
    ) -> Self {
        let mut code = Self::default();
        if let Some(t) = type_markers {
            code.type_level = &t.interceptors;
            code.type_excludes_default = t.exclude_default_interceptors;
        }
        if let Some(o) = operation_markers {
            code.operation = &o.interceptors;
            code.operation_excludes_default = o.exclude_default_interceptors;
            code.operation_excludes_type = o.exclude_class_interceptors;
        }
        code
    }
}

// ---------------------------------------------------------------------------
// Prepared rule set
// ---------------------------------------------------------------------------

/// Declarative interceptor bindings after validation and same-target merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptorBindings {
    component: String,
    component_default: Option<BindingRule>,
    type_level: Option<BindingRule>,
    by_name: BTreeMap<String, BindingRule>,
    by_signature: BTreeMap<(String, Vec<String>), BindingRule>,
}

impl InterceptorBindings {
    /// Validates `rules` and merges rules that share a target.
    ///
    /// Type-level rules, and operation-level rules with an equal target, are
    /// merged in declaration order: interceptor lists are concatenated and a
    /// later explicit flag or non-empty order replaces an earlier one.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first of:
    /// [`ConfigError::InvalidExcludeDeclaration`] for exclude flags on a
    /// component-default rule or `exclude_type_level` on a type-level rule,
    /// [`ConfigError::AmbiguousBindingSpecificity`] for a second
    /// component-default rule or contradictory name and signature rules, and
    /// [`ConfigError::BindingTargetNotFound`] when an operation-level rule
    /// names no interceptable operation.
    pub fn prepare<'a>(
        rules: &[BindingRule],
        operations: impl Iterator<Item = &'a Operation> + Clone,
        diag: &mut Diagnostics,
    ) -> Result<Self, ConfigError> {
        let mut bindings = Self {
            component: diag.component().to_string(),
            ..Self::default()
        };

        for rule in rules {
            let mut rule = rule.clone();
            match rule.specificity {
                Specificity::ComponentDefault => {
                    bindings.check_component_default(&mut rule, diag)?;
                    if bindings.component_default.is_some() {
                        diag.report(ConfigError::AmbiguousBindingSpecificity {
                            component: bindings.component.clone(),
                            target: rule.target_label(),
                            detail: "more than one component-default interceptor binding".to_string(),
                        })?;
                        continue;
                    }
                    bindings.component_default = Some(rule);
                }
                Specificity::TypeLevel => {
                    if rule.exclude_type_level.is_some() {
                        diag.report(ConfigError::InvalidExcludeDeclaration {
                            component: bindings.component.clone(),
                            specificity: Specificity::TypeLevel,
                            flag: ExcludeFlag::TypeLevel,
                        })?;
                        rule.exclude_type_level = None;
                    }
                    merge_into(&mut bindings.type_level, rule);
                }
                Specificity::OperationName | Specificity::OperationSignature => {
                    let Some(name) = rule.method_name.clone() else {
                        diag.report(ConfigError::InvalidAttributeValue {
                            component: bindings.component.clone(),
                            location: rule.target_label(),
                            family: AttributeFamily::Interceptors,
                            detail: format!("{} binding without a method name", rule.specificity),
                        })?;
                        continue;
                    };
                    // Signature keys compare equal under array-bracket spacing.
                    rule.params = rule.params.iter().map(|p| normalize_type_name(p)).collect();
                    let exists = operations.clone().any(|op| {
                        op.is_interceptable()
                            && match rule.specificity {
                                Specificity::OperationSignature => op.id.matches(&name, &rule.params),
                                _ => op.id.name == name,
                            }
                    });
                    if !exists {
                        diag.report(ConfigError::BindingTargetNotFound {
                            component: bindings.component.clone(),
                            specificity: rule.specificity,
                            target: rule.target_label(),
                        })?;
                        continue;
                    }
                    if rule.specificity == Specificity::OperationSignature {
                        let key = (name, rule.params.clone());
                        merge_keyed(&mut bindings.by_signature, key, rule);
                    } else {
                        merge_keyed(&mut bindings.by_name, name, rule);
                    }
                }
            }
        }

        bindings.check_contradictions(diag)?;
        Ok(bindings)
    }

    fn check_component_default(
        &self,
        rule: &mut BindingRule,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        if rule.exclude_component_default.take().is_some() {
            diag.report(ConfigError::InvalidExcludeDeclaration {
                component: self.component.clone(),
                specificity: Specificity::ComponentDefault,
                flag: ExcludeFlag::ComponentDefault,
            })?;
        }
        if rule.exclude_type_level.take().is_some() {
            diag.report(ConfigError::InvalidExcludeDeclaration {
                component: self.component.clone(),
                specificity: Specificity::ComponentDefault,
                flag: ExcludeFlag::TypeLevel,
            })?;
        }
        if !rule.order.is_empty() {
            diag.report(ConfigError::InvalidAttributeValue {
                component: self.component.clone(),
                location: rule.target_label(),
                family: AttributeFamily::Interceptors,
                detail: "interceptor order is only allowed on type-level and operation-level bindings"
                    .to_string(),
            })?;
            rule.order.clear();
        }
        Ok(())
    }

    /// Name and signature rules for the same operation may coexist unless
    /// they set the same exclude flag to opposite values.
    fn check_contradictions(&self, diag: &mut Diagnostics) -> Result<(), ConfigError> {
        for ((name, params), sig_rule) in &self.by_signature {
            let Some(name_rule) = self.by_name.get(name) else {
                continue;
            };
            let clashes = [
                (
                    ExcludeFlag::ComponentDefault,
                    sig_rule.exclude_component_default,
                    name_rule.exclude_component_default,
                ),
                (
                    ExcludeFlag::TypeLevel,
                    sig_rule.exclude_type_level,
                    name_rule.exclude_type_level,
                ),
            ];
            for (flag, by_sig, by_name) in clashes {
                if let (Some(a), Some(b)) = (by_sig, by_name) {
                    if a != b {
                        diag.report(ConfigError::AmbiguousBindingSpecificity {
                            component: self.component.clone(),
                            target: format!("{name}({})", params.join(",")),
                            detail: format!(
                                "operation-signature binding sets {flag}={a} but operation-name binding sets {flag}={b}"
                            ),
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// The operation-level rule for `op`: signature first, then name.
    #[must_use]
    pub fn operation_rule(&self, op: &Operation) -> Option<&BindingRule> {
        self.by_signature
            .iter()
            .find(|((name, params), _)| op.id.matches(name, params))
            .map(|(_, rule)| rule)
            .or_else(|| self.by_name.get(&op.id.name))
    }

    /// Resolves the interceptor chain of `op`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PartialInterceptorOrder`] when an interceptor
    /// order omits a member of the chain it replaces.
    pub fn resolve(&self, op: &Operation, code: CodeInterceptors<'_>) -> Result<Vec<String>, ConfigError> {
        self.chain(op, code, true)
    }

    /// Resolves the chain of `op` without applying interceptor orders.
    #[must_use]
    pub fn resolve_unordered(&self, op: &Operation, code: CodeInterceptors<'_>) -> Vec<String> {
        self.chain(op, code, false).unwrap_or_default()
    }

    fn chain(
        &self,
        op: &Operation,
        code: CodeInterceptors<'_>,
        apply_order: bool,
    ) -> Result<Vec<String>, ConfigError> {
        if !op.is_interceptable() {
            return Ok(Vec::new());
        }

        let op_rule = self.operation_rule(op);

        let type_excludes_default = self
            .type_level
            .as_ref()
            .and_then(|r| r.exclude_component_default)
            .unwrap_or(code.type_excludes_default);
        let op_excludes_default = op_rule
            .and_then(|r| r.exclude_component_default)
            .unwrap_or(code.operation_excludes_default);
        let op_excludes_type = op_rule
            .and_then(|r| r.exclude_type_level)
            .unwrap_or(code.operation_excludes_type);

        let mut inherited = Vec::new();
        if !(type_excludes_default || op_excludes_default) {
            if let Some(rule) = &self.component_default {
                inherited.extend(rule.interceptors.iter().cloned());
            }
        }
        if !op_excludes_type {
            inherited.extend(code.type_level.iter().cloned());
            if let Some(rule) = &self.type_level {
                inherited.extend(rule.interceptors.iter().cloned());
            }
        }

        if apply_order {
            if let Some(rule) = self.type_level.as_ref().filter(|r| !r.order.is_empty()) {
                inherited = self.ordered(&inherited, &rule.order, "<type>")?;
            }
        }

        let mut chain = inherited;
        chain.extend(code.operation.iter().cloned());
        if let Some(rule) = op_rule {
            chain.extend(rule.interceptors.iter().cloned());
            if apply_order && !rule.order.is_empty() {
                chain = self.ordered(&chain, &rule.order, &rule.target_label())?;
            }
        }
        Ok(chain)
    }

    fn ordered(&self, chain: &[String], order: &[String], target: &str) -> Result<Vec<String>, ConfigError> {
        let missing: Vec<&str> = chain
            .iter()
            .filter(|i| !order.contains(*i))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(order.to_vec())
        } else {
            Err(ConfigError::PartialInterceptorOrder {
                component: self.component.clone(),
                target: target.to_string(),
                missing: missing.join(","),
            })
        }
    }
}

fn merge_into(slot: &mut Option<BindingRule>, rule: BindingRule) {
    match slot {
        Some(existing) => merge_entry(existing, rule),
        None => *slot = Some(rule),
    }
}

fn merge_keyed<K: Ord>(map: &mut BTreeMap<K, BindingRule>, key: K, rule: BindingRule) {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(rule);
        }
        Entry::Occupied(mut slot) => merge_entry(slot.get_mut(), rule),
    }
}

fn merge_entry(existing: &mut BindingRule, rule: BindingRule) {
    existing.interceptors.extend(rule.interceptors);
    if !rule.order.is_empty() {
        existing.order = rule.order;
    }
    if rule.exclude_component_default.is_some() {
        existing.exclude_component_default = rule.exclude_component_default;
    }
    if rule.exclude_type_level.is_some() {
        existing.exclude_type_level = rule.exclude_type_level;
    }
}
