use beanmeta_core::{
    AttributeFamily, ComponentKind, ConfigError, ExposureSurface, Management, Operation, Resolved,
    TransactionMode,
};

use super::{merge, styles, AttributeMerger};
use crate::diagnostics::Diagnostics;

/// Modes legal on scheduled and lifecycle callbacks.
const CALLBACK_MODES: [TransactionMode; 3] = [
    TransactionMode::Required,
    TransactionMode::RequiresNew,
    TransactionMode::NotSupported,
];

/// Modes legal on message endpoints.
const MESSAGE_ENDPOINT_MODES: [TransactionMode; 2] =
    [TransactionMode::Required, TransactionMode::NotSupported];

fn legal_modes(surface: ExposureSurface) -> Option<&'static [TransactionMode]> {
    match surface {
        ExposureSurface::ScheduledCallback | ExposureSurface::LifecycleCallback => Some(&CALLBACK_MODES),
        ExposureSurface::MessageEndpoint => Some(&MESSAGE_ENDPOINT_MODES),
        _ => None,
    }
}

impl AttributeMerger<'_> {
    fn transaction_default(&self, op: &Operation) -> TransactionMode {
        if op.is_lifecycle_only() {
            match self.input.component.kind {
                ComponentKind::Singleton => TransactionMode::Required,
                ComponentKind::Stateful | ComponentKind::Stateless | ComponentKind::MessageDriven => {
                    TransactionMode::NotSupported
                }
            }
        } else {
            TransactionMode::Required
        }
    }

    pub(super) fn transaction(
        &self,
        op: &Operation,
        diag: &mut Diagnostics,
    ) -> Result<Resolved<TransactionMode>, ConfigError> {
        let mut declarative = styles::declarative(op, &self.input.document.container_transactions);
        let mut code = self.code_level(op, |m| m.transaction, |t| t.transaction);
        let default = self.transaction_default(op);

        if op.synthetic {
            return Ok(normalize(op, Resolved::defaulted(default)));
        }

        if self.management.transaction == Management::SelfManaged {
            self.reject_self_managed(op, AttributeFamily::Transaction, declarative.as_ref().or(code.as_ref()), diag)?;
            return Ok(Resolved::defaulted(TransactionMode::SelfManaged));
        }

        for slot in [&mut declarative, &mut code] {
            if let Some(value) = slot.as_ref().filter(|v| v.value == TransactionMode::SelfManaged) {
                self.invalid_value(
                    op,
                    AttributeFamily::Transaction,
                    format!("{} is only implied by self-managed transactions ({})", value.value, value.provenance),
                    diag,
                )?;
                *slot = None;
            }
        }

        let stateless_lifecycle = op.is_lifecycle_only()
            && matches!(
                self.input.component.kind,
                ComponentKind::Stateless | ComponentKind::MessageDriven
            );
        if stateless_lifecycle {
            if let Some(value) = declarative.as_ref().or(code.as_ref()) {
                self.illegal_for_surface(
                    op,
                    ExposureSurface::LifecycleCallback,
                    AttributeFamily::Transaction,
                    value,
                    diag,
                )?;
            }
            return Ok(Resolved::defaulted(default));
        }

        let mut resolved = merge(declarative, code, default);
        if resolved.provenance.is_explicit() {
            let illegal_on = op.surfaces.iter().copied().find(|surface| {
                legal_modes(*surface).is_some_and(|legal| !legal.contains(&resolved.value))
            });
            if let Some(surface) = illegal_on {
                self.illegal_for_surface(op, surface, AttributeFamily::Transaction, &resolved, diag)?;
                resolved = Resolved::defaulted(default);
            }
        }
        Ok(normalize(op, resolved))
    }
}

/// Callbacks run without a caller transaction to join.
fn normalize(op: &Operation, resolved: Resolved<TransactionMode>) -> Resolved<TransactionMode> {
    let callback = op.is_on(ExposureSurface::ScheduledCallback) || op.is_on(ExposureSurface::LifecycleCallback);
    if callback && resolved.value == TransactionMode::Required {
        resolved.map(|_| TransactionMode::RequiresNew)
    } else {
        resolved
    }
}
