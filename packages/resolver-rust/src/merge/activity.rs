use beanmeta_core::{ActivityScopeMode, AttributeFamily, ConfigError, Management, Operation, Resolved};

use super::{merge, styles, AttributeMerger};
use crate::diagnostics::Diagnostics;

impl AttributeMerger<'_> {
    /// Activity scope is only ever set by the declarative document.
    pub(super) fn activity_scope(
        &self,
        op: &Operation,
        diag: &mut Diagnostics,
    ) -> Result<Resolved<ActivityScopeMode>, ConfigError> {
        if op.synthetic {
            return Ok(Resolved::defaulted(ActivityScopeMode::Unspecified));
        }
        let mut declarative = styles::declarative(op, &self.input.document.activity_sessions);

        if self.management.activity_scope == Management::SelfManaged {
            self.reject_self_managed(op, AttributeFamily::ActivityScope, declarative.as_ref(), diag)?;
            return Ok(Resolved::defaulted(ActivityScopeMode::SelfManaged));
        }

        if let Some(value) = declarative
            .as_ref()
            .filter(|v| v.value == ActivityScopeMode::SelfManaged)
        {
            self.invalid_value(
                op,
                AttributeFamily::ActivityScope,
                format!(
                    "{} is only implied by self-managed activity sessions ({})",
                    value.value, value.provenance
                ),
                diag,
            )?;
            declarative = None;
        }

        Ok(merge(declarative, None, ActivityScopeMode::Unspecified))
    }
}
