//! Structural validation of a resolved table.
//!
//! Runs after merging, so every check sees final surfaces and attributes.

use beanmeta_core::{ConfigError, ExposureSurface, ResolvedDescriptor, ResolvedTable, ReturnType};

/// Checks a finished table against the exposure rules of its component kind
/// and the signature rules of callbacks and asynchronous operations.
///
/// Returns every violation found; an empty vector means the table is valid.
#[must_use]
pub fn validate(table: &ResolvedTable) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    check_exposure(table, &mut errors);
    check_home_pairing(table, &mut errors);
    for descriptor in table.descriptors() {
        check_scheduled_callback(table, descriptor, &mut errors);
        check_asynchronous(table, descriptor, &mut errors);
    }
    errors
}

fn check_exposure(table: &ResolvedTable, errors: &mut Vec<ConfigError>) {
    let rules = table.kind.surface_rules();
    let exposed = table.exposed_surfaces();

    if !rules.required_any.iter().any(|s| exposed.contains(s)) {
        errors.push(ConfigError::RequiredExposureMissing {
            component: table.component.clone(),
            kind: table.kind,
            required: rules
                .required_any
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    for surface in rules.forbidden.iter().filter(|s| exposed.contains(s)) {
        errors.push(ConfigError::ForbiddenExposurePresent {
            component: table.component.clone(),
            kind: table.kind,
            surface: *surface,
        });
    }
}

/// A home surface needs its component surface and the reverse.
fn check_home_pairing(table: &ResolvedTable, errors: &mut Vec<ConfigError>) {
    let exposed = table.exposed_surfaces();
    for surface in [ExposureSurface::RemoteHome, ExposureSurface::LocalHome] {
        let Some(paired) = surface.paired_surface() else {
            continue;
        };
        let (present, missing) = match (exposed.contains(&surface), exposed.contains(&paired)) {
            (true, false) => (surface, paired),
            (false, true) => (paired, surface),
            _ => continue,
        };
        errors.push(ConfigError::RequiredExposureMissing {
            component: table.component.clone(),
            kind: table.kind,
            required: format!("{missing} (paired with {present})"),
        });
    }
}

fn check_scheduled_callback(table: &ResolvedTable, descriptor: &ResolvedDescriptor, errors: &mut Vec<ConfigError>) {
    let op = &descriptor.operation;
    if !op.is_on(ExposureSurface::ScheduledCallback) {
        return;
    }
    let mut problems = Vec::new();
    if op.return_type != ReturnType::Void {
        problems.push("must not return a value");
    }
    if !op.exceptions.is_empty() {
        problems.push("must not declare application exceptions");
    }
    if !op.modifiers.overridable {
        problems.push("must be overridable");
    }
    if !op.modifiers.instance {
        problems.push("must be an instance method");
    }
    for problem in problems {
        errors.push(ConfigError::StructuralSignatureViolation {
            component: table.component.clone(),
            operation: op.id.clone(),
            detail: format!("is a scheduled callback and {problem}"),
        });
    }
}

fn check_asynchronous(table: &ResolvedTable, descriptor: &ResolvedDescriptor, errors: &mut Vec<ConfigError>) {
    if !descriptor.asynchronous.value {
        return;
    }
    let op = &descriptor.operation;
    let detail = match &op.return_type {
        ReturnType::Value(name) => Some(format!(
            "is asynchronous and must return nothing or a deferred result, not {name}"
        )),
        ReturnType::Void if !op.exceptions.is_empty() => Some(format!(
            "is asynchronous without a result and cannot declare exceptions [{}]",
            op.exceptions.join(", ")
        )),
        ReturnType::Void | ReturnType::Deferred => None,
    };
    if let Some(detail) = detail {
        errors.push(ConfigError::StructuralSignatureViolation {
            component: table.component.clone(),
            operation: op.id.clone(),
            detail,
        });
    }
}
