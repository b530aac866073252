use std::collections::BTreeSet;

use beanmeta_core::{
    AttributeFamily, Authorization, ConfigError, ExposureSurface, Operation, Resolved,
};

use super::styles::{self, Style};
use super::{merge, AttributeMerger};
use crate::diagnostics::Diagnostics;

/// Authorization markers found on one code element.
#[derive(Debug, Clone, Copy)]
struct MarkerSet<'m> {
    deny_all: bool,
    permit_all: bool,
    roles: Option<&'m [String]>,
}

impl MarkerSet<'_> {
    /// Deny outranks permit, which outranks roles.
    fn authorization(self) -> Option<Authorization> {
        if self.deny_all {
            Some(Authorization::DenyAll)
        } else if self.permit_all {
            Some(Authorization::PermitAll)
        } else {
            self.roles
                .map(|roles| Authorization::Roles(roles.iter().cloned().collect()))
        }
    }

    fn conflict(self) -> Option<String> {
        let present: Vec<&str> = [
            (self.deny_all, "deny-all"),
            (self.permit_all, "permit-all"),
            (self.roles.is_some(), "roles-allowed"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
        if present.len() > 1 {
            return Some(format!("{} on the same element", present.join(" and ")));
        }
        let roles = self.roles?;
        let mut seen = BTreeSet::new();
        roles
            .iter()
            .find(|role| !seen.insert(role.as_str()))
            .map(|role| format!("role {role} listed more than once"))
    }
}

impl AttributeMerger<'_> {
    pub(super) fn check_type_security_markers(&self, diag: &mut Diagnostics) -> Result<(), ConfigError> {
        if !self.input.honours_markers() {
            return Ok(());
        }
        for entry in &self.input.markers.types {
            let set = MarkerSet {
                deny_all: entry.markers.deny_all,
                permit_all: entry.markers.permit_all,
                roles: entry.markers.roles_allowed.as_deref(),
            };
            if let Some(detail) = set.conflict() {
                diag.report(ConfigError::ConflictingMarkers {
                    component: self.component(),
                    location: entry.type_name.clone(),
                    detail,
                })?;
            }
        }
        Ok(())
    }

    fn declarative_authorization(&self, op: &Operation) -> Option<Resolved<Authorization>> {
        let document = &self.input.document;
        if let Some(style) = styles::element_style(op, &document.exclude_list) {
            return Some(Resolved::declarative(Authorization::DenyAll, style.specificity()));
        }

        let mut unchecked: Option<Style> = None;
        let mut roles_style: Option<Style> = None;
        let mut roles = BTreeSet::new();
        for permission in &document.method_permissions {
            let Some(style) = styles::element_style(op, &permission.methods) else {
                continue;
            };
            if permission.unchecked {
                unchecked = unchecked.max(Some(style));
            } else {
                roles_style = roles_style.max(Some(style));
                roles.extend(permission.roles.iter().cloned());
            }
        }

        if let Some(style) = unchecked {
            Some(Resolved::declarative(Authorization::PermitAll, style.specificity()))
        } else {
            roles_style.map(|style| Resolved::declarative(Authorization::Roles(roles), style.specificity()))
        }
    }

    fn code_level_authorization(
        &self,
        op: &Operation,
        diag: &mut Diagnostics,
    ) -> Result<Option<Resolved<Authorization>>, ConfigError> {
        if let Some(markers) = self.operation_markers(op) {
            let set = MarkerSet {
                deny_all: markers.deny_all,
                permit_all: markers.permit_all,
                roles: markers.roles_allowed.as_deref(),
            };
            if let Some(detail) = set.conflict() {
                diag.report(ConfigError::ConflictingMarkers {
                    component: self.component(),
                    location: op.id.to_string(),
                    detail,
                })?;
            }
            if set.authorization().is_some() {
                return Ok(self.code_level(op, |_| set.authorization(), |_| None));
            }
        }
        Ok(self.code_level(
            op,
            |_| None,
            |t| {
                MarkerSet {
                    deny_all: t.deny_all,
                    permit_all: t.permit_all,
                    roles: t.roles_allowed.as_deref(),
                }
                .authorization()
            },
        ))
    }

    pub(super) fn authorization(
        &self,
        op: &Operation,
        diag: &mut Diagnostics,
    ) -> Result<Resolved<Authorization>, ConfigError> {
        let declarative = self.declarative_authorization(op);
        let code = self.code_level_authorization(op, diag)?;

        if op.is_lifecycle_only() {
            if let Some(value) = declarative.as_ref().or(code.as_ref()) {
                self.illegal_for_surface(
                    op,
                    ExposureSurface::LifecycleCallback,
                    AttributeFamily::Authorization,
                    value,
                    diag,
                )?;
            }
            return Ok(Resolved::defaulted(Authorization::PermitAll));
        }

        Ok(merge(declarative, code, Authorization::PermitAll))
    }
}

#[cfg(test)]
mod tests {
    use beanmeta_core::{
        ComponentKind, ErrorKind, MarkerTable, MethodElement, OperationMarkers, PermissionRule,
        Provenance, Specificity, TypeMarkers,
    };

    use super::super::test_support::*;
    use super::*;
    use crate::config::ResolverConfig;

    fn roles(names: &[&str]) -> Authorization {
        Authorization::Roles(names.iter().map(|s| (*s).to_string()).collect())
    }

    fn permission(methods: Vec<MethodElement>, role_names: &[&str]) -> PermissionRule {
        PermissionRule {
            methods,
            roles: role_names.iter().map(|s| (*s).to_string()).collect(),
            unchecked: false,
        }
    }

    #[test]
    fn exclude_list_denies() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.document.method_permissions = vec![permission(vec![MethodElement::wildcard()], &["teller"])];
        input.document.exclude_list = vec![MethodElement::named("charge")];
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .authorization(&charge, &mut strict())
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::declarative(Authorization::DenyAll, Specificity::OperationName)
        );
    }

    #[test]
    fn matching_roles_are_unioned() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.document.method_permissions = vec![
            permission(vec![MethodElement::wildcard()], &["auditor"]),
            permission(vec![MethodElement::signature("charge", ["Money"])], &["teller"]),
            permission(vec![MethodElement::named("refund")], &["manager"]),
        ];
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .authorization(&charge, &mut strict())
            .unwrap();
        assert_eq!(resolved.value, roles(&["auditor", "teller"]));
        assert_eq!(resolved.provenance, Provenance::Declarative(Specificity::OperationSignature));
    }

    #[test]
    fn unchecked_permission_permits_all() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.document.method_permissions = vec![
            permission(vec![MethodElement::named("charge")], &["teller"]),
            PermissionRule {
                methods: vec![MethodElement::wildcard()],
                roles: Vec::new(),
                unchecked: true,
            },
        ];
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .authorization(&charge, &mut strict())
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::declarative(Authorization::PermitAll, Specificity::ComponentDefault)
        );
    }

    #[test]
    fn operation_marker_beats_type_marker() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.markers = MarkerTable::default()
            .with_type(
                "BillingBean",
                TypeMarkers {
                    roles_allowed: Some(vec!["teller".to_string()]),
                    ..TypeMarkers::default()
                },
            )
            .with_operation(
                charge.id.clone(),
                OperationMarkers {
                    permit_all: true,
                    ..OperationMarkers::default()
                },
            );
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        assert_eq!(
            merger.authorization(&charge, &mut strict()).unwrap(),
            Resolved::code_level(Authorization::PermitAll, Specificity::OperationSignature)
        );
        assert_eq!(
            merger.authorization(&business("refund", &[]), &mut strict()).unwrap(),
            Resolved::code_level(roles(&["teller"]), Specificity::TypeLevel)
        );
    }

    #[test]
    fn conflicting_operation_markers_are_rejected() {
        let charge = business("charge", &["Money"]);
        let mut input = input(ComponentKind::Stateless);
        input.markers = MarkerTable::default().with_operation(
            charge.id.clone(),
            OperationMarkers {
                deny_all: true,
                roles_allowed: Some(vec!["teller".to_string()]),
                ..OperationMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        let err = merger.authorization(&charge, &mut strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictingMarkers);

        let mut diag = lenient();
        let resolved = merger.authorization(&charge, &mut diag).unwrap();
        assert_eq!(resolved.value, Authorization::DenyAll);
        assert_eq!(diag.errors().len(), 1);
    }

    #[test]
    fn duplicate_roles_on_type_are_rejected() {
        let mut input = input(ComponentKind::Stateless);
        input.markers = MarkerTable::default().with_type(
            "BillingBean",
            TypeMarkers {
                roles_allowed: Some(vec!["teller".to_string(), "teller".to_string()]),
                ..TypeMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        let err = AttributeMerger::new(&input, &config)
            .check_declarations(&mut strict())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictingMarkers);
        assert!(err.to_string().contains("role teller listed more than once"));
    }

    #[test]
    fn lifecycle_callbacks_carry_no_authorization() {
        let init = op("init", &[], &[ExposureSurface::LifecycleCallback]);
        let mut input = input(ComponentKind::Stateful);
        input.document.method_permissions = vec![permission(vec![MethodElement::wildcard()], &["teller"])];
        let config = ResolverConfig::default();
        let merger = AttributeMerger::new(&input, &config);
        assert_eq!(
            merger.authorization(&init, &mut strict()).unwrap(),
            Resolved::defaulted(Authorization::PermitAll)
        );

        input.document.method_permissions = vec![permission(vec![MethodElement::named("init")], &["teller"])];
        let merger = AttributeMerger::new(&input, &config);
        let err = merger.authorization(&init, &mut strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeIllegalForExposureSurface);
    }
}
