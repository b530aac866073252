use beanmeta_core::{ComponentKind, Operation, RemoveSemantics, Resolved};

use super::styles::{self, Style};
use super::AttributeMerger;

impl AttributeMerger<'_> {
    /// Remove semantics exist only on stateful components.
    pub(super) fn remove_semantics(&self, op: &Operation) -> Option<Resolved<RemoveSemantics>> {
        if op.synthetic {
            return None;
        }

        let mut declarative: Option<(RemoveSemantics, Style)> = None;
        for decl in &self.input.document.remove_methods {
            if !styles::reaches(&decl.method, op) {
                continue;
            }
            let style = Style::of(&decl.method);
            if declarative.is_none_or(|(_, current)| style >= current) {
                declarative = Some((
                    RemoveSemantics {
                        retain_if_exception: decl.retain_if_exception,
                    },
                    style,
                ));
            }
        }
        let declarative =
            declarative.map(|(value, style)| Resolved::declarative(value, style.specificity()));
        let code = self.code_level(op, |m| m.remove, |_| None);
        let resolved = declarative.or(code)?;

        if self.input.component.kind != ComponentKind::Stateful {
            tracing::debug!(
                component = %self.input.component.name,
                operation = %op.id,
                kind = %self.input.component.kind,
                "remove semantics ignored on non-stateful component"
            );
            return None;
        }
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use beanmeta_core::{
        MarkerTable, MethodElement, OperationMarkers, RemoveMethodDecl, Specificity,
    };

    use super::super::test_support::*;
    use super::*;
    use crate::config::ResolverConfig;

    #[test]
    fn declarative_remove_method_outranks_marker() {
        let checkout = business("checkout", &[]);
        let mut input = input(ComponentKind::Stateful);
        input.document.remove_methods = vec![RemoveMethodDecl {
            method: MethodElement::named("checkout"),
            retain_if_exception: true,
        }];
        input.markers = MarkerTable::default().with_operation(
            checkout.id.clone(),
            OperationMarkers {
                remove: Some(RemoveSemantics::default()),
                ..OperationMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        let resolved = AttributeMerger::new(&input, &config)
            .remove_semantics(&checkout)
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::declarative(
                RemoveSemantics {
                    retain_if_exception: true
                },
                Specificity::OperationName
            )
        );
    }

    #[test]
    fn stateless_components_have_no_remove_semantics() {
        let checkout = business("checkout", &[]);
        let mut input = input(ComponentKind::Stateless);
        input.markers = MarkerTable::default().with_operation(
            checkout.id.clone(),
            OperationMarkers {
                remove: Some(RemoveSemantics::default()),
                ..OperationMarkers::default()
            },
        );
        let config = ResolverConfig::default();
        assert!(AttributeMerger::new(&input, &config)
            .remove_semantics(&checkout)
            .is_none());
    }
}
