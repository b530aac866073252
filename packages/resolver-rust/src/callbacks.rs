//! Scheduled-callback disambiguation.
//!
//! A callback may be named without an arity. Such a name resolves to the
//! zero-arg or the one-arg (schedule context) overload of the implementation
//! type; the rules below pick exactly one or report why they cannot.

use std::collections::{BTreeMap, BTreeSet};

use beanmeta_core::operation::{normalize_type_name, params_match};
use beanmeta_core::{
    Arity, AttributeSource, BoundCallback, ComponentInput, ConfigError, ImplMethod, MethodElement,
    OperationId, Provenance, ScheduleSpec, Specificity, TimerCallbackRule,
};

use crate::config::ResolverConfig;
use crate::diagnostics::Diagnostics;

/// A callback request before it is bound.
#[derive(Debug, Clone)]
struct Request {
    method_name: String,
    arity: Arity,
    schedule: Option<ScheduleSpec>,
    origin: AttributeSource,
}

impl Request {
    fn provenance(&self) -> Provenance {
        let specificity = match self.arity {
            Arity::Unspecified => Specificity::OperationName,
            Arity::Zero | Arity::One => Specificity::OperationSignature,
        };
        match self.origin {
            AttributeSource::Declarative => Provenance::Declarative(specificity),
            AttributeSource::CodeLevel => Provenance::CodeLevel(specificity),
        }
    }
}

impl From<&TimerCallbackRule> for Request {
    fn from(rule: &TimerCallbackRule) -> Self {
        Self {
            method_name: rule.method_name.clone(),
            arity: rule.arity,
            schedule: rule.schedule.clone(),
            origin: rule.source,
        }
    }
}

/// A callback bound to an implementation method, still open for merging.
#[derive(Debug)]
struct Binding<'a> {
    method: &'a ImplMethod,
    arity: Arity,
    schedules: Vec<ScheduleSpec>,
    timeout_callback: bool,
    provenance: Provenance,
}

/// Declarative values outrank code-level values; within a source the more
/// specific one wins.
fn rank(provenance: Provenance) -> (bool, Option<Specificity>) {
    match provenance {
        Provenance::Default => (false, None),
        Provenance::Declarative(s) => (true, Some(s)),
        Provenance::CodeLevel(s) => (false, Some(s)),
    }
}

/// Binds every scheduled and timeout callback of one component.
#[derive(Debug)]
pub struct CallbackDisambiguator<'a> {
    input: &'a ComponentInput,
    context_type: String,
}

impl<'a> CallbackDisambiguator<'a> {
    #[must_use]
    pub fn new(input: &'a ComponentInput, config: &ResolverConfig) -> Self {
        Self {
            input,
            context_type: normalize_type_name(&config.schedule_context_type),
        }
    }

    /// Resolves every callback request to exactly one implementation method.
    ///
    /// Code-level markers bind the operation they sit on. Declarative
    /// requests with an explicit arity bind that overload. A request
    /// without an arity binds the only callback-shaped overload, or, when
    /// both exist, the overload not already claimed by another request; if
    /// neither is claimed it binds the zero-arg overload when both share a
    /// declaring type.
    ///
    /// Callbacks are numbered from zero in hierarchy order, so equal inputs
    /// always produce equal ids.
    ///
    /// # Errors
    ///
    /// In strict mode, returns [`ConfigError::CallbackTargetNotFound`],
    /// [`ConfigError::AmbiguousCallbackTarget`] or
    /// [`ConfigError::StructuralSignatureViolation`] for a marker on a
    /// method that cannot be a callback.
    pub fn disambiguate(&self, diag: &mut Diagnostics) -> Result<Vec<BoundCallback>, ConfigError> {
        let mut bindings: BTreeMap<OperationId, Binding<'a>> = BTreeMap::new();
        let mut claimed: BTreeSet<(String, Arity)> = BTreeSet::new();

        self.bind_markers(&mut bindings, &mut claimed, diag)?;

        let requests = self.declarative_requests(diag)?;
        for request in &requests {
            if request.arity != Arity::Unspecified {
                claimed.insert((request.method_name.clone(), request.arity));
            }
        }
        for request in requests {
            let Some((method, arity)) = self.resolve(&request, &claimed, diag)? else {
                continue;
            };
            let provenance = request.provenance();
            let schedules: Vec<ScheduleSpec> = request.schedule.iter().cloned().collect();
            let timeout_callback = request.schedule.is_none();
            Self::record(&mut bindings, method, arity, schedules, timeout_callback, provenance);
        }

        self.check_single_timeout(&mut bindings, diag)?;

        let mut ordered: Vec<Binding<'a>> = bindings.into_values().collect();
        ordered.sort_by(|a, b| {
            (a.method.depth, a.method.declaration_index, a.method.id()).cmp(&(
                b.method.depth,
                b.method.declaration_index,
                b.method.id(),
            ))
        });

        let callbacks: Vec<BoundCallback> = ordered
            .into_iter()
            .zip(0u32..)
            .map(|(binding, id)| BoundCallback {
                id,
                operation: binding.method.id(),
                arity: binding.arity,
                schedules: binding.schedules,
                timeout_callback: binding.timeout_callback,
                provenance: binding.provenance,
            })
            .collect();

        tracing::debug!(
            component = %self.input.component.name,
            callbacks = callbacks.len(),
            "callbacks bound"
        );
        Ok(callbacks)
    }

    fn bind_markers(
        &self,
        bindings: &mut BTreeMap<OperationId, Binding<'a>>,
        claimed: &mut BTreeSet<(String, Arity)>,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        if !self.input.honours_markers() {
            return Ok(());
        }
        for entry in &self.input.markers.operations {
            let markers = &entry.markers;
            if markers.schedules.is_empty() && !markers.timeout {
                continue;
            }
            let id = &entry.operation;
            let marked = self
                .input
                .implementation
                .methods
                .iter()
                .find(|m| m.declaring_type == id.declaring_type && m.matches(&id.name, &id.params));
            // A subtype override takes the binding, as it does in the catalog.
            let Some(method) =
                marked.and_then(|_| self.input.implementation.most_derived(&id.name, &id.params))
            else {
                diag.report(ConfigError::CallbackTargetNotFound {
                    component: self.component(),
                    method: id.to_string(),
                    arity: Arity::of(id.arity()).unwrap_or_default(),
                    origin: AttributeSource::CodeLevel,
                })?;
                continue;
            };
            let Some(arity) = self.callback_arity(method) else {
                diag.report(ConfigError::StructuralSignatureViolation {
                    component: self.component(),
                    operation: method.id(),
                    detail: format!(
                        "cannot be a scheduled callback: expected no parameters or a single {}",
                        self.context_type
                    ),
                })?;
                continue;
            };
            claimed.insert((method.name.clone(), arity));
            Self::record(
                bindings,
                method,
                arity,
                markers.schedules.clone(),
                markers.timeout,
                Provenance::CodeLevel(Specificity::OperationSignature),
            );
        }
        Ok(())
    }

    /// Timer rules plus the document's timeout method, as requests.
    fn declarative_requests(&self, diag: &mut Diagnostics) -> Result<Vec<Request>, ConfigError> {
        let document = &self.input.document;
        let mut requests: Vec<Request> = document.timers.iter().map(Request::from).collect();
        if let Some(element) = &document.timeout_method {
            match self.element_arity(element) {
                Some(arity) => requests.push(Request {
                    method_name: element.name.trim().to_string(),
                    arity,
                    schedule: None,
                    origin: AttributeSource::Declarative,
                }),
                None => diag.report(ConfigError::CallbackTargetNotFound {
                    component: self.component(),
                    method: element.to_string(),
                    arity: element
                        .params
                        .as_ref()
                        .and_then(|p| Arity::of(p.len()))
                        .unwrap_or_default(),
                    origin: AttributeSource::Declarative,
                })?,
            }
        }
        Ok(requests)
    }

    fn element_arity(&self, element: &MethodElement) -> Option<Arity> {
        match element.params.as_deref() {
            None => Some(Arity::Unspecified),
            Some([]) => Some(Arity::Zero),
            Some(params @ [_]) if params_match(params, std::slice::from_ref(&self.context_type)) => {
                Some(Arity::One)
            }
            Some(_) => None,
        }
    }

    fn resolve(
        &self,
        request: &Request,
        claimed: &BTreeSet<(String, Arity)>,
        diag: &mut Diagnostics,
    ) -> Result<Option<(&'a ImplMethod, Arity)>, ConfigError> {
        let name = request.method_name.as_str();
        let zero = self.input.implementation.most_derived(name, &[]);
        let one = self
            .input
            .implementation
            .most_derived(name, std::slice::from_ref(&self.context_type));

        let chosen = match request.arity {
            Arity::Zero => zero.map(|m| (m, Arity::Zero)),
            Arity::One => one.map(|m| (m, Arity::One)),
            Arity::Unspecified => match (zero, one) {
                (Some(z), None) => Some((z, Arity::Zero)),
                (None, Some(o)) => Some((o, Arity::One)),
                (None, None) => None,
                (Some(z), Some(o)) => {
                    let zero_claimed = claimed.contains(&(name.to_string(), Arity::Zero));
                    let one_claimed = claimed.contains(&(name.to_string(), Arity::One));
                    if one_claimed && !zero_claimed {
                        Some((z, Arity::Zero))
                    } else if zero_claimed && !one_claimed {
                        Some((o, Arity::One))
                    } else if z.declaring_type == o.declaring_type {
                        Some((z, Arity::Zero))
                    } else {
                        diag.report(ConfigError::AmbiguousCallbackTarget {
                            component: self.component(),
                            method: name.to_string(),
                            detail: format!(
                                "{} and {} are declared on different types",
                                z.id(),
                                o.id()
                            ),
                        })?;
                        return Ok(None);
                    }
                }
            },
        };

        if chosen.is_none() {
            diag.report(ConfigError::CallbackTargetNotFound {
                component: self.component(),
                method: name.to_string(),
                arity: request.arity,
                origin: request.origin,
            })?;
        }
        Ok(chosen)
    }

    fn check_single_timeout(
        &self,
        bindings: &mut BTreeMap<OperationId, Binding<'a>>,
        diag: &mut Diagnostics,
    ) -> Result<(), ConfigError> {
        let targets: Vec<OperationId> = bindings
            .iter()
            .filter(|(_, b)| b.timeout_callback)
            .map(|(id, _)| id.clone())
            .collect();
        if targets.len() <= 1 {
            return Ok(());
        }

        diag.report(ConfigError::AmbiguousCallbackTarget {
            component: self.component(),
            method: targets[0].name.clone(),
            detail: format!(
                "more than one timeout callback: {}",
                targets
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?;

        // Lenient: the first target in identity order stays the timeout callback.
        for id in &targets[1..] {
            if let Some(binding) = bindings.get_mut(id) {
                binding.timeout_callback = false;
                if binding.schedules.is_empty() {
                    bindings.remove(id);
                }
            }
        }
        Ok(())
    }

    fn record(
        bindings: &mut BTreeMap<OperationId, Binding<'a>>,
        method: &'a ImplMethod,
        arity: Arity,
        schedules: Vec<ScheduleSpec>,
        timeout_callback: bool,
        provenance: Provenance,
    ) {
        let binding = bindings.entry(method.id()).or_insert_with(|| Binding {
            method,
            arity,
            schedules: Vec::new(),
            timeout_callback: false,
            provenance,
        });
        binding.schedules.extend(schedules);
        binding.timeout_callback |= timeout_callback;
        if rank(provenance) > rank(binding.provenance) {
            binding.provenance = provenance;
        }
    }

    /// Arity of a callback-shaped method, `None` for any other shape.
    fn callback_arity(&self, method: &ImplMethod) -> Option<Arity> {
        match method.params.as_slice() {
            [] => Some(Arity::Zero),
            [_] if params_match(&method.params, std::slice::from_ref(&self.context_type)) => Some(Arity::One),
            _ => None,
        }
    }

    fn component(&self) -> String {
        self.input.component.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use beanmeta_core::{
        ComponentInfo, ComponentKind, ErrorKind, ImplementationSurface, MarkerTable,
        OperationMarkers,
    };
    use proptest::prelude::*;

    use super::*;
    use crate::config::ValidationMode;

    fn input(methods: Vec<ImplMethod>) -> ComponentInput {
        let mut surface = ImplementationSurface::new("ClockBean");
        surface.methods = methods;
        ComponentInput::new(ComponentInfo::new("Clock", ComponentKind::Singleton), surface)
    }

    fn tick_overloads() -> Vec<ImplMethod> {
        vec![
            ImplMethod::new("ClockBean", "onTick", Vec::<String>::new()).at(1, 0),
            ImplMethod::new("ClockBean", "onTick", ["Timer"]).at(1, 1),
        ]
    }

    fn run(input: &ComponentInput) -> Result<Vec<BoundCallback>, ConfigError> {
        let config = ResolverConfig::default();
        CallbackDisambiguator::new(input, &config)
            .disambiguate(&mut Diagnostics::new("Clock", ValidationMode::Strict))
    }

    fn hourly() -> ScheduleSpec {
        ScheduleSpec {
            minute: "*".to_string(),
            ..ScheduleSpec::default()
        }
    }

    #[test]
    fn unspecified_arity_prefers_zero_arg_on_same_type() {
        let mut input = input(tick_overloads());
        input.document.timers = vec![TimerCallbackRule::scheduled("onTick", Arity::Unspecified, hourly())];
        let callbacks = run(&input).unwrap();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(callbacks[0].arity, Arity::Zero);
        assert_eq!(
            callbacks[0].operation,
            OperationId::new("ClockBean", "onTick", Vec::<String>::new())
        );
        assert_eq!(callbacks[0].provenance, Provenance::Declarative(Specificity::OperationName));
    }

    #[test]
    fn explicit_one_arg_without_overload_is_not_found() {
        let mut input = input(vec![ImplMethod::new("ClockBean", "onTick", Vec::<String>::new())]);
        input.document.timers = vec![TimerCallbackRule::scheduled("onTick", Arity::One, hourly())];
        let err = run(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CallbackTargetNotFound);
        assert!(err.to_string().contains("no one-arg callback method named onTick"));
    }

    #[test]
    fn single_overload_binds_regardless_of_arity_hint() {
        let mut input = input(vec![ImplMethod::new("ClockBean", "onTick", ["Timer"])]);
        input.document.timers = vec![TimerCallbackRule::scheduled("onTick", Arity::Unspecified, hourly())];
        let callbacks = run(&input).unwrap();
        assert_eq!(callbacks[0].arity, Arity::One);
    }

    #[test]
    fn marker_on_overridden_method_binds_the_override() {
        let mut input = input(vec![
            ImplMethod::new("ClockBase", "onTick", Vec::<String>::new()).at(0, 0),
            ImplMethod::new("ClockBean", "onTick", Vec::<String>::new()).at(1, 0),
        ]);
        input.markers = MarkerTable::default().with_operation(
            OperationId::new("ClockBase", "onTick", Vec::<String>::new()),
            OperationMarkers {
                schedules: vec![hourly()],
                ..OperationMarkers::default()
            },
        );
        let callbacks = run(&input).unwrap();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(
            callbacks[0].operation,
            OperationId::new("ClockBean", "onTick", Vec::<String>::new())
        );
        assert_eq!(callbacks[0].schedules, vec![hourly()]);
    }

    #[test]
    fn claimed_overload_is_skipped() {
        let mut input = input(tick_overloads());
        input.markers = MarkerTable::default().with_operation(
            OperationId::new("ClockBean", "onTick", Vec::<String>::new()),
            OperationMarkers {
                schedules: vec![ScheduleSpec::default()],
                ..OperationMarkers::default()
            },
        );
        input.document.timers = vec![TimerCallbackRule::scheduled("onTick", Arity::Unspecified, hourly())];
        let callbacks = run(&input).unwrap();
        assert_eq!(callbacks.len(), 2);
        assert_eq!(callbacks[0].arity, Arity::Zero);
        assert_eq!(callbacks[0].provenance, Provenance::CodeLevel(Specificity::OperationSignature));
        assert_eq!(callbacks[1].arity, Arity::One);
        assert_eq!(callbacks[1].schedules, vec![hourly()]);
        assert_eq!(callbacks[1].id, 1);
    }

    #[test]
    fn overloads_on_different_types_are_ambiguous() {
        let mut input = input(vec![
            ImplMethod::new("BaseClock", "onTick", Vec::<String>::new()).at(0, 0),
            ImplMethod::new("ClockBean", "onTick", ["Timer"]).at(1, 0),
        ]);
        input.document.timers = vec![TimerCallbackRule::scheduled("onTick", Arity::Unspecified, hourly())];
        let err = run(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousCallbackTarget);
    }

    #[test]
    fn schedules_on_one_method_are_merged() {
        let mut input = input(tick_overloads());
        input.document.timers = vec![
            TimerCallbackRule::scheduled("onTick", Arity::Zero, ScheduleSpec::default()),
            TimerCallbackRule::scheduled("onTick", Arity::Zero, hourly()),
        ];
        let callbacks = run(&input).unwrap();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(callbacks[0].schedules.len(), 2);
        assert!(!callbacks[0].timeout_callback);
    }

    #[test]
    fn timeout_method_from_document() {
        let mut input = input(tick_overloads());
        input.document.timeout_method = Some(MethodElement::signature("onTick", ["Timer"]));
        let callbacks = run(&input).unwrap();
        assert_eq!(callbacks.len(), 1);
        assert!(callbacks[0].timeout_callback);
        assert_eq!(callbacks[0].arity, Arity::One);

        input.document.timeout_method = Some(MethodElement::signature("onTick", ["String"]));
        assert_eq!(run(&input).unwrap_err().kind(), ErrorKind::CallbackTargetNotFound);
    }

    #[test]
    fn two_timeout_callbacks_are_ambiguous() {
        let mut input = input(vec![
            ImplMethod::new("ClockBean", "expire", Vec::<String>::new()).at(1, 0),
            ImplMethod::new("ClockBean", "onTick", Vec::<String>::new()).at(1, 1),
        ]);
        input.markers = MarkerTable::default().with_operation(
            OperationId::new("ClockBean", "expire", Vec::<String>::new()),
            OperationMarkers {
                timeout: true,
                ..OperationMarkers::default()
            },
        );
        input.document.timeout_method = Some(MethodElement::named("onTick"));
        assert_eq!(run(&input).unwrap_err().kind(), ErrorKind::AmbiguousCallbackTarget);

        let config = ResolverConfig::default();
        let mut diag = Diagnostics::new("Clock", ValidationMode::Lenient);
        let callbacks = CallbackDisambiguator::new(&input, &config)
            .disambiguate(&mut diag)
            .unwrap();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(callbacks[0].operation.name, "expire");
        assert_eq!(diag.errors().len(), 1);
    }

    #[test]
    fn marker_on_wrong_shape_is_a_signature_violation() {
        let mut input = input(vec![ImplMethod::new("ClockBean", "onTick", ["String", "int"])]);
        input.markers = MarkerTable::default().with_operation(
            OperationId::new("ClockBean", "onTick", ["String", "int"]),
            OperationMarkers {
                schedules: vec![ScheduleSpec::default()],
                ..OperationMarkers::default()
            },
        );
        assert_eq!(run(&input).unwrap_err().kind(), ErrorKind::StructuralSignatureViolation);
    }

    #[test]
    fn metadata_complete_ignores_markers() {
        let mut input = input(tick_overloads());
        input.component.metadata_complete = true;
        input.markers = MarkerTable::default().with_operation(
            OperationId::new("ClockBean", "onTick", Vec::<String>::new()),
            OperationMarkers {
                timeout: true,
                ..OperationMarkers::default()
            },
        );
        assert!(run(&input).unwrap().is_empty());
    }

    #[test]
    fn ids_follow_hierarchy_order() {
        let mut input = input(vec![
            ImplMethod::new("ClockBean", "late", Vec::<String>::new()).at(1, 0),
            ImplMethod::new("BaseClock", "early", Vec::<String>::new()).at(0, 5),
        ]);
        input.document.timers = vec![
            TimerCallbackRule::scheduled("late", Arity::Zero, hourly()),
            TimerCallbackRule::scheduled("early", Arity::Zero, hourly()),
        ];
        let callbacks = run(&input).unwrap();
        let names: Vec<_> = callbacks.iter().map(|c| (c.id, c.operation.name.as_str())).collect();
        assert_eq!(names, vec![(0, "early"), (1, "late")]);
    }

    proptest! {
        #[test]
        fn binding_ignores_method_order(
            methods in Just(vec![
                ImplMethod::new("BaseClock", "onTick", Vec::<String>::new()).at(0, 0),
                ImplMethod::new("ClockBean", "onTick", Vec::<String>::new()).at(1, 0),
                ImplMethod::new("ClockBean", "onTick", ["Timer"]).at(1, 1),
                ImplMethod::new("ClockBean", "sweep", Vec::<String>::new()).at(1, 2),
            ]).prop_shuffle(),
            arity in prop_oneof![Just(Arity::Zero), Just(Arity::One), Just(Arity::Unspecified)],
        ) {
            let mut shuffled = input(methods);
            shuffled.document.timers = vec![
                TimerCallbackRule::scheduled("onTick", arity, hourly()),
                TimerCallbackRule::scheduled("sweep", Arity::Unspecified, hourly()),
            ];
            let mut sorted = shuffled.clone();
            sorted.implementation.methods.sort_by_key(|m| (m.depth, m.declaration_index));

            let first = run(&shuffled).unwrap();
            prop_assert_eq!(&first, &run(&sorted).unwrap());
            prop_assert_eq!(&first, &run(&shuffled).unwrap());
            prop_assert!(first.iter().all(|c| c.arity != Arity::Unspecified));
            prop_assert!(first.iter().all(|c| c.operation.declaring_type == "ClockBean"));
        }
    }
}
