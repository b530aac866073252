//! The in-memory input tree for one component build.
//!
//! Everything here is plain data handed over by collaborators: the parsed
//! declarative document, the pre-scanned code-level markers and the
//! implementation type surface. Nothing in this module performs lookups
//! beyond linear scans over those lists.

use serde::{Deserialize, Serialize};

use crate::attributes::{ActivityScopeMode, LockMode, RemoveSemantics, TimeoutSpec, TransactionMode};
use crate::component::{ComponentInfo, ManagementModes};
use crate::operation::{normalize_type_name, params_match, MethodSig, Modifiers, OperationId, ReturnType};
use crate::rules::{
    AttributeRule, BindingRule, MethodElement, PermissionRule, RemoveMethodDecl, ScheduleSpec,
    TimerCallbackRule,
};
use crate::surface::ExposureSurface;

// ---------------------------------------------------------------------------
// Implementation type surface
// ---------------------------------------------------------------------------

/// A concrete method declared somewhere in the implementation's type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplMethod {
    pub declaring_type: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub return_type: ReturnType,
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// 0 for the root of the hierarchy, increasing towards the implementation type.
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub declaration_index: u32,
}

impl ImplMethod {
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
            return_type: ReturnType::Void,
            exceptions: Vec::new(),
            modifiers: Modifiers::default(),
            depth: 0,
            declaration_index: 0,
        }
    }

    #[must_use]
    pub fn returning(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    #[must_use]
    pub fn throwing(mut self, exception: impl Into<String>) -> Self {
        self.exceptions.push(exception.into());
        self
    }

    #[must_use]
    pub fn at(mut self, depth: u32, declaration_index: u32) -> Self {
        self.depth = depth;
        self.declaration_index = declaration_index;
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn id(&self) -> OperationId {
        OperationId::new(&self.declaring_type, &self.name, &self.params)
    }

    #[must_use]
    pub fn matches(&self, name: &str, params: &[String]) -> bool {
        self.name == name && params_match(&self.params, params)
    }
}

/// All methods of the implementation type, flattened across its hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationSurface {
    pub type_name: String,
    #[serde(default)]
    pub methods: Vec<ImplMethod>,
}

impl ImplementationSurface {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: ImplMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// The most derived declaration of `name(params)`, if any.
    #[must_use]
    pub fn most_derived(&self, name: &str, params: &[String]) -> Option<&ImplMethod> {
        self.methods
            .iter()
            .filter(|m| m.matches(name, params))
            .max_by_key(|m| (m.depth, std::cmp::Reverse(m.declaration_index)))
    }

    /// Every declaration carrying `name`, in input order.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ImplMethod> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

/// A client-visible interface and the methods it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDecl {
    pub surface: ExposureSurface,
    pub type_name: String,
    #[serde(default)]
    pub methods: Vec<MethodSig>,
}

impl InterfaceDecl {
    pub fn new(surface: ExposureSurface, type_name: impl Into<String>, methods: Vec<MethodSig>) -> Self {
        Self {
            surface,
            type_name: type_name.into(),
            methods,
        }
    }
}

// ---------------------------------------------------------------------------
// Code-level markers
// ---------------------------------------------------------------------------

/// Markers found on one operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationMarkers {
    pub transaction: Option<TransactionMode>,
    pub lock: Option<LockMode>,
    pub access_timeout: Option<TimeoutSpec>,
    pub roles_allowed: Option<Vec<String>>,
    pub permit_all: bool,
    pub deny_all: bool,
    pub asynchronous: bool,
    pub interceptors: Vec<String>,
    pub exclude_default_interceptors: bool,
    pub exclude_class_interceptors: bool,
    pub schedules: Vec<ScheduleSpec>,
    /// Marks the component's timeout callback.
    pub timeout: bool,
    pub remove: Option<RemoveSemantics>,
}

/// Markers found on a type of the implementation hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeMarkers {
    pub transaction: Option<TransactionMode>,
    pub lock: Option<LockMode>,
    pub access_timeout: Option<TimeoutSpec>,
    pub roles_allowed: Option<Vec<String>>,
    pub permit_all: bool,
    pub deny_all: bool,
    pub asynchronous: bool,
    pub interceptors: Vec<String>,
    pub exclude_default_interceptors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMarkerEntry {
    pub operation: OperationId,
    pub markers: OperationMarkers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMarkerEntry {
    pub type_name: String,
    pub markers: TypeMarkers,
}

/// Pre-scanned code-level marker table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkerTable {
    pub operations: Vec<OperationMarkerEntry>,
    pub types: Vec<TypeMarkerEntry>,
}

impl MarkerTable {
    #[must_use]
    pub fn for_operation(&self, id: &OperationId) -> Option<&OperationMarkers> {
        self.operations
            .iter()
            .find(|e| {
                e.operation.declaring_type == id.declaring_type
                    && e.operation.matches(&id.name, &id.params)
            })
            .map(|e| &e.markers)
    }

    #[must_use]
    pub fn for_type(&self, type_name: &str) -> Option<&TypeMarkers> {
        self.types
            .iter()
            .find(|e| e.type_name == type_name)
            .map(|e| &e.markers)
    }

    #[must_use]
    pub fn with_operation(mut self, operation: OperationId, markers: OperationMarkers) -> Self {
        self.operations.push(OperationMarkerEntry { operation, markers });
        self
    }

    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>, markers: TypeMarkers) -> Self {
        self.types.push(TypeMarkerEntry {
            type_name: type_name.into(),
            markers,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Declarative document
// ---------------------------------------------------------------------------

/// The parsed declarative document, reduced to one component.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclarativeDocument {
    pub interceptor_bindings: Vec<BindingRule>,
    pub container_transactions: Vec<AttributeRule<TransactionMode>>,
    pub lock_types: Vec<AttributeRule<LockMode>>,
    pub access_timeouts: Vec<AttributeRule<TimeoutSpec>>,
    pub activity_sessions: Vec<AttributeRule<ActivityScopeMode>>,
    pub method_permissions: Vec<PermissionRule>,
    pub exclude_list: Vec<MethodElement>,
    pub async_methods: Vec<MethodElement>,
    pub remove_methods: Vec<RemoveMethodDecl>,
    pub timers: Vec<TimerCallbackRule>,
    pub timeout_method: Option<MethodElement>,
    /// Overrides the management modes carried by [`ComponentInfo`].
    pub management: Option<ManagementModes>,
}

// ---------------------------------------------------------------------------
// ComponentInput
// ---------------------------------------------------------------------------

/// Everything a single component build consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInput {
    pub component: ComponentInfo,
    pub implementation: ImplementationSurface,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDecl>,
    #[serde(default)]
    pub lifecycle_callbacks: Vec<MethodSig>,
    #[serde(default)]
    pub document: DeclarativeDocument,
    #[serde(default)]
    pub markers: MarkerTable,
}

impl ComponentInput {
    pub fn new(component: ComponentInfo, implementation: ImplementationSurface) -> Self {
        Self {
            component,
            implementation,
            interfaces: Vec::new(),
            lifecycle_callbacks: Vec::new(),
            document: DeclarativeDocument::default(),
            markers: MarkerTable::default(),
        }
    }

    #[must_use]
    pub fn with_interface(mut self, interface: InterfaceDecl) -> Self {
        self.interfaces.push(interface);
        self
    }

    #[must_use]
    pub fn with_lifecycle_callback(mut self, callback: MethodSig) -> Self {
        self.lifecycle_callbacks.push(callback);
        self
    }

    #[must_use]
    pub fn with_document(mut self, document: DeclarativeDocument) -> Self {
        self.document = document;
        self
    }

    #[must_use]
    pub fn with_markers(mut self, markers: MarkerTable) -> Self {
        self.markers = markers;
        self
    }

    /// Management modes after the document's overrides.
    #[must_use]
    pub fn management(&self) -> ManagementModes {
        self.document.management.unwrap_or(self.component.management)
    }

    /// `true` when code-level markers take part in resolution.
    #[must_use]
    pub fn honours_markers(&self) -> bool {
        !self.component.metadata_complete
    }
}
