//! Operation catalog: every operation a component exposes, bound to its implementation.

use std::collections::{BTreeMap, BTreeSet};

use beanmeta_core::{
    BoundCallback, ComponentInput, ConfigError, ExposureSurface, ImplMethod, InterfaceDecl,
    MethodSig, Modifiers, Operation, OperationId, ReturnType,
};

use crate::diagnostics::Diagnostics;

/// Name of the container-provided removal operation.
pub const REMOVE: &str = "remove";

/// Cataloged operations of one component, keyed by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    operations: BTreeMap<OperationId, Operation>,
}

impl Catalog {
    /// Catalogs every interface method and lifecycle callback of `input`.
    ///
    /// Interface methods bind to the most derived implementation method
    /// with an equal signature. Home methods bind through the
    /// `create`/`find`/home-method naming convention. Component-style
    /// interfaces receive a synthetic `remove()` placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OperationNotImplemented`] in strict mode when a
    /// surface promises an operation the implementation lacks.
    pub fn build(input: &ComponentInput, diag: &mut Diagnostics) -> Result<Self, ConfigError> {
        let mut catalog = Self::default();

        for interface in &input.interfaces {
            catalog.add_interface(input, interface, diag)?;
        }

        for callback in &input.lifecycle_callbacks {
            match input
                .implementation
                .most_derived(&callback.name, &callback.params)
            {
                Some(method) => catalog.insert(from_impl(method), ExposureSurface::LifecycleCallback),
                None => diag.report(ConfigError::OperationNotImplemented {
                    component: diag.component().to_string(),
                    surface: ExposureSurface::LifecycleCallback,
                    operation: callback.to_string(),
                    expected: callback.to_string(),
                })?,
            }
        }

        tracing::debug!(
            component = %diag.component(),
            operations = catalog.len(),
            "catalog built"
        );
        Ok(catalog)
    }

    fn add_interface(
        &mut self,
        input: &ComponentInput,
        interface: &InterfaceDecl,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        let surface = interface.surface;

        if surface.carries_remove_placeholder() {
            self.insert(
                synthetic(&interface.type_name, REMOVE, &[]),
                surface,
            );
        }

        for method in &interface.methods {
            if surface.carries_remove_placeholder() && method.name == REMOVE && method.params.is_empty() {
                continue;
            }
            if surface.is_home() && method.name == REMOVE {
                self.insert(synthetic(&interface.type_name, REMOVE, &method.params), surface);
                continue;
            }

            let impl_name = if surface.is_home() {
                home_method_name(&method.name)
            } else {
                method.name.clone()
            };

            match input.implementation.most_derived(&impl_name, &method.params) {
                Some(found) => self.insert(from_impl(found), surface),
                None => diag.report(ConfigError::OperationNotImplemented {
                    component: diag.component().to_string(),
                    surface,
                    operation: format!("{}.{method}", interface.type_name),
                    expected: MethodSig::new(impl_name, &method.params).to_string(),
                })?,
            }
        }
        Ok(())
    }

    /// Adds bound scheduled callbacks under [`ExposureSurface::ScheduledCallback`].
    pub fn join_callbacks(&mut self, callbacks: &[BoundCallback], input: &ComponentInput) {
        for callback in callbacks {
            let id = &callback.operation;
            let method = input
                .implementation
                .methods
                .iter()
                .find(|m| m.declaring_type == id.declaring_type && m.matches(&id.name, &id.params));
            if let Some(method) = method {
                self.insert(from_impl(method), ExposureSurface::ScheduledCallback);
            }
        }
    }

    fn insert(&mut self, operation: Operation, surface: ExposureSurface) {
        self.operations
            .entry(operation.id.clone())
            .or_insert(operation)
            .surfaces
            .insert(surface);
    }

    #[must_use]
    pub fn get(&self, id: &OperationId) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Operations in identity order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> + Clone {
        self.operations.values()
    }

    /// Surfaces exposed by at least one operation.
    #[must_use]
    pub fn surfaces(&self) -> BTreeSet<ExposureSurface> {
        self.operations
            .values()
            .flat_map(|op| op.surfaces.iter().copied())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Implementation-side name of a home method.
///
/// `createX` binds to `ejbCreateX`, `findX` to `ejbFindX`, and any other
/// home method `m` to `ejbHomeM`.
#[must_use]
pub fn home_method_name(name: &str) -> String {
    if let Some(rest) = name.strip_prefix("create") {
        format!("ejbCreate{rest}")
    } else if let Some(rest) = name.strip_prefix("find") {
        format!("ejbFind{rest}")
    } else {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("ejbHome{}{}", first.to_uppercase(), chars.as_str()),
            None => "ejbHome".to_string(),
        }
    }
}

fn from_impl(method: &ImplMethod) -> Operation {
    Operation {
        id: method.id(),
        surfaces: BTreeSet::new(),
        return_type: method.return_type.clone(),
        exceptions: method.exceptions.clone(),
        modifiers: method.modifiers,
        depth: method.depth,
        declaration_index: method.declaration_index,
        synthetic: false,
    }
}

fn synthetic(declaring_type: &str, name: &str, params: &[String]) -> Operation {
    Operation {
        id: OperationId::new(declaring_type, name, params),
        surfaces: BTreeSet::new(),
        return_type: ReturnType::Void,
        exceptions: Vec::new(),
        modifiers: Modifiers::default(),
        depth: 0,
        declaration_index: 0,
        synthetic: true,
    }
}
