//! Declarative rules: attribute overrides, interceptor bindings, and timers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeSource, Specificity};
use crate::operation::{normalize_type_name, Operation};
use crate::surface::ExposureSurface;

/// Name used by the declarative document for "every operation".
pub const WILDCARD: &str = "*";

// ---------------------------------------------------------------------------
// Method elements
// ---------------------------------------------------------------------------

/// A method reference as it appears in the declarative document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodElement {
    /// Operation name, or `*` for every operation.
    pub name: String,
    /// Parameter list; absent means "every overload".
    #[serde(default)]
    pub params: Option<Vec<String>>,
    /// Restricts the element to operations reachable through this surface.
    #[serde(default)]
    pub surface: Option<ExposureSurface>,
}

/// What a [`MethodElement`] targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodTarget<'a> {
    Wildcard,
    Name(&'a str),
    Signature(&'a str, &'a [String]),
}

impl MethodElement {
    pub fn wildcard() -> Self {
        Self {
            name: WILDCARD.to_string(),
            params: None,
            surface: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            surface: None,
        }
    }

    pub fn signature<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            params: Some(
                params
                    .into_iter()
                    .map(|p| normalize_type_name(p.as_ref()))
                    .collect(),
            ),
            surface: None,
        }
    }

    /// Restricts the element to one surface.
    #[must_use]
    pub fn on(mut self, surface: ExposureSurface) -> Self {
        self.surface = Some(surface);
        self
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name.trim() == WILDCARD
    }

    #[must_use]
    pub fn target(&self) -> MethodTarget<'_> {
        let name = self.name.trim();
        if name == WILDCARD {
            return MethodTarget::Wildcard;
        }
        match &self.params {
            None => MethodTarget::Name(name),
            Some(params) => MethodTarget::Signature(name, params),
        }
    }

    /// Specificity of the element when it matches.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        match self.target() {
            MethodTarget::Wildcard => Specificity::ComponentDefault,
            MethodTarget::Name(_) => Specificity::OperationName,
            MethodTarget::Signature(..) => Specificity::OperationSignature,
        }
    }

    /// Returns `true` if the element reaches the operation, ignoring style ranking.
    #[must_use]
    pub fn matches(&self, op: &Operation) -> bool {
        if let Some(surface) = self.surface {
            if !op.is_on(surface) {
                return false;
            }
        }
        match self.target() {
            MethodTarget::Wildcard => true,
            MethodTarget::Name(name) => op.id.name == name,
            MethodTarget::Signature(name, params) => op.id.matches(name, params),
        }
    }
}

impl fmt::Display for MethodElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.trim())?;
        if let Some(params) = &self.params {
            write!(f, "({})", params.join(","))?;
        }
        if let Some(surface) = self.surface {
            write!(f, " on {surface}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Attribute rules
// ---------------------------------------------------------------------------

/// One declarative attribute override applied to a list of method elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRule<T> {
    pub methods: Vec<MethodElement>,
    pub value: T,
}

impl<T> AttributeRule<T> {
    pub fn new(methods: Vec<MethodElement>, value: T) -> Self {
        Self { methods, value }
    }
}

/// A method-permission entry: either unchecked or a list of roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    pub methods: Vec<MethodElement>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub unchecked: bool,
}

/// A declarative remove-method entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMethodDecl {
    pub method: MethodElement,
    #[serde(default)]
    pub retain_if_exception: bool,
}

// ---------------------------------------------------------------------------
// Interceptor binding rules
// ---------------------------------------------------------------------------

/// Which inherited interceptor level an exclude flag opts out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExcludeFlag {
    ComponentDefault,
    TypeLevel,
}

impl fmt::Display for ExcludeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ComponentDefault => "exclude-component-default",
            Self::TypeLevel => "exclude-type-level",
        })
    }
}

/// Interceptor binding at one of the four specificity levels.
///
/// `ComponentDefault` and `TypeLevel` rules carry no method; `OperationName`
/// rules name a method; `OperationSignature` rules name a method and its
/// exact parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRule {
    pub specificity: Specificity,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub params: Vec<String>,
    /// Ordered interceptor identifiers contributed at this level.
    #[serde(default)]
    pub interceptors: Vec<String>,
    /// Optional total ordering that replaces the computed chain.
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub exclude_component_default: Option<bool>,
    #[serde(default)]
    pub exclude_type_level: Option<bool>,
}

impl BindingRule {
    fn at(specificity: Specificity, interceptors: &[&str]) -> Self {
        Self {
            specificity,
            method_name: None,
            params: Vec::new(),
            interceptors: interceptors.iter().map(|s| (*s).to_string()).collect(),
            order: Vec::new(),
            exclude_component_default: None,
            exclude_type_level: None,
        }
    }

    #[must_use]
    pub fn component_default(interceptors: &[&str]) -> Self {
        Self::at(Specificity::ComponentDefault, interceptors)
    }

    #[must_use]
    pub fn type_level(interceptors: &[&str]) -> Self {
        Self::at(Specificity::TypeLevel, interceptors)
    }

    #[must_use]
    pub fn operation_name(name: &str, interceptors: &[&str]) -> Self {
        let mut rule = Self::at(Specificity::OperationName, interceptors);
        rule.method_name = Some(name.to_string());
        rule
    }

    #[must_use]
    pub fn operation_signature(name: &str, params: &[&str], interceptors: &[&str]) -> Self {
        let mut rule = Self::at(Specificity::OperationSignature, interceptors);
        rule.method_name = Some(name.to_string());
        rule.params = params.iter().map(|p| normalize_type_name(p)).collect();
        rule
    }

    #[must_use]
    pub fn excluding_component_default(mut self, exclude: bool) -> Self {
        self.exclude_component_default = Some(exclude);
        self
    }

    #[must_use]
    pub fn excluding_type_level(mut self, exclude: bool) -> Self {
        self.exclude_type_level = Some(exclude);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: &[&str]) -> Self {
        self.order = order.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Human-readable target, used in diagnostics.
    #[must_use]
    pub fn target_label(&self) -> String {
        match (self.specificity, &self.method_name) {
            (Specificity::ComponentDefault, _) => WILDCARD.to_string(),
            (Specificity::TypeLevel, _) => "<type>".to_string(),
            (Specificity::OperationName, Some(name)) => name.clone(),
            (Specificity::OperationSignature, Some(name)) => {
                format!("{name}({})", self.params.join(","))
            }
            (_, None) => "<missing method name>".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduled callbacks
// ---------------------------------------------------------------------------

/// Declared parameter count of a callback target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Arity {
    Zero,
    One,
    #[default]
    Unspecified,
}

impl Arity {
    /// Explicit arity of an operation with `n` parameters, if callback-shaped.
    #[must_use]
    pub const fn of(n: usize) -> Option<Self> {
        match n {
            0 => Some(Self::Zero),
            1 => Some(Self::One),
            _ => None,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zero => "zero-arg",
            Self::One => "one-arg",
            Self::Unspecified => "unspecified",
        })
    }
}

/// Calendar schedule attached to a callback. Parsing is the timer service's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSpec {
    pub second: String,
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub month: String,
    pub day_of_week: String,
    pub year: String,
    pub timezone: Option<String>,
    pub info: Option<String>,
    pub persistent: bool,
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self {
            second: "0".to_string(),
            minute: "0".to_string(),
            hour: "0".to_string(),
            day_of_month: "*".to_string(),
            month: "*".to_string(),
            day_of_week: "*".to_string(),
            year: "*".to_string(),
            timezone: None,
            info: None,
            persistent: true,
        }
    }
}

/// A scheduled-callback binding request.
///
/// A rule without a schedule designates the component's timeout callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCallbackRule {
    pub method_name: String,
    #[serde(default)]
    pub arity: Arity,
    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,
    #[serde(default)]
    pub source: AttributeSource,
}

impl TimerCallbackRule {
    pub fn scheduled(method_name: impl Into<String>, arity: Arity, schedule: ScheduleSpec) -> Self {
        Self {
            method_name: method_name.into(),
            arity,
            schedule: Some(schedule),
            source: AttributeSource::Declarative,
        }
    }

    pub fn timeout(method_name: impl Into<String>, arity: Arity) -> Self {
        Self {
            method_name: method_name.into(),
            arity,
            schedule: None,
            source: AttributeSource::Declarative,
        }
    }

    #[must_use]
    pub fn is_timeout_callback(&self) -> bool {
        self.schedule.is_none()
    }
}
