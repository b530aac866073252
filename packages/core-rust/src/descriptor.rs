//! Frozen build output: per-operation descriptors and bound callbacks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::attributes::{
    AccessTimeout, ActivityScopeMode, Authorization, LockMode, Provenance, RemoveSemantics,
    Resolved, TransactionMode,
};
use crate::component::ComponentKind;
use crate::error::SnapshotError;
use crate::operation::{Operation, OperationId};
use crate::rules::{Arity, ScheduleSpec};
use crate::surface::ExposureSurface;

/// Resolved attributes of one operation. Never mutated after the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDescriptor {
    pub operation: Operation,
    pub transaction_mode: Resolved<TransactionMode>,
    pub lock_mode: Resolved<LockMode>,
    pub access_timeout: Resolved<AccessTimeout>,
    pub authorization: Resolved<Authorization>,
    pub activity_scope: Resolved<ActivityScopeMode>,
    pub asynchronous: Resolved<bool>,
    /// Present only for operations that end the instance's conversation.
    pub remove_semantics: Option<Resolved<RemoveSemantics>>,
    /// Interceptor identifiers in invocation order; duplicates are kept.
    pub interceptor_chain: Vec<String>,
}

impl ResolvedDescriptor {
    #[must_use]
    pub fn id(&self) -> &OperationId {
        &self.operation.id
    }
}

/// A scheduled or timeout callback bound to a concrete operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundCallback {
    /// Stable identifier; equal inputs always yield equal ids.
    pub id: u32,
    pub operation: OperationId,
    /// Resolved arity, never [`Arity::Unspecified`].
    pub arity: Arity,
    pub schedules: Vec<ScheduleSpec>,
    pub timeout_callback: bool,
    pub provenance: Provenance,
}

/// The immutable table produced by one component build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTable {
    pub component: String,
    pub kind: ComponentKind,
    descriptors: Vec<ResolvedDescriptor>,
    callbacks: Vec<BoundCallback>,
}

impl ResolvedTable {
    /// Freezes descriptors and callbacks into a table.
    ///
    /// Descriptors are sorted by operation identity; callbacks keep the
    /// order in which their ids were assigned.
    pub fn new(
        component: impl Into<String>,
        kind: ComponentKind,
        mut descriptors: Vec<ResolvedDescriptor>,
        callbacks: Vec<BoundCallback>,
    ) -> Self {
        descriptors.sort_by(|a, b| a.operation.id.cmp(&b.operation.id));
        Self {
            component: component.into(),
            kind,
            descriptors,
            callbacks,
        }
    }

    #[must_use]
    pub fn get(&self, id: &OperationId) -> Option<&ResolvedDescriptor> {
        self.descriptors
            .binary_search_by(|d| d.operation.id.cmp(id))
            .ok()
            .map(|i| &self.descriptors[i])
    }

    /// Every overload named `name`, in identity order.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResolvedDescriptor> + 'a {
        self.descriptors.iter().filter(move |d| d.operation.id.name == name)
    }

    #[must_use]
    pub fn descriptors(&self) -> &[ResolvedDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn callbacks(&self) -> &[BoundCallback] {
        &self.callbacks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Every surface exposed by at least one operation.
    #[must_use]
    pub fn exposed_surfaces(&self) -> BTreeSet<ExposureSurface> {
        self.descriptors
            .iter()
            .flat_map(|d| d.operation.surfaces.iter().copied())
            .collect()
    }

    /// Encodes the table as named MessagePack.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] if serialisation fails.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes a table written by [`ResolvedTable::to_snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Decode`] on malformed input.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Specificity;
    use crate::operation::{Modifiers, ReturnType};

    fn descriptor(name: &str) -> ResolvedDescriptor {
        ResolvedDescriptor {
            operation: Operation {
                id: OperationId::new("Impl", name, Vec::<String>::new()),
                surfaces: BTreeSet::from([ExposureSurface::LocalBusiness]),
                return_type: ReturnType::Void,
                exceptions: Vec::new(),
                modifiers: Modifiers::default(),
                depth: 0,
                declaration_index: 0,
                synthetic: false,
            },
            transaction_mode: Resolved::declarative(TransactionMode::Required, Specificity::ComponentDefault),
            lock_mode: Resolved::defaulted(LockMode::Exclusive),
            access_timeout: Resolved::defaulted(AccessTimeout::Unbounded),
            authorization: Resolved::defaulted(Authorization::PermitAll),
            activity_scope: Resolved::defaulted(ActivityScopeMode::Unspecified),
            asynchronous: Resolved::defaulted(false),
            remove_semantics: None,
            interceptor_chain: vec!["Audit".to_string()],
        }
    }

    #[test]
    fn table_sorts_descriptors_and_supports_lookup() {
        let table = ResolvedTable::new(
            "Billing",
            ComponentKind::Stateless,
            vec![descriptor("refund"), descriptor("charge")],
            Vec::new(),
        );
        assert_eq!(table.descriptors()[0].id().name, "charge");
        let id = OperationId::new("Impl", "refund", Vec::<String>::new());
        assert_eq!(table.get(&id).unwrap().id(), &id);
        assert!(table
            .get(&OperationId::new("Impl", "missing", Vec::<String>::new()))
            .is_none());
        assert_eq!(table.named("charge").count(), 1);
        assert_eq!(
            table.exposed_surfaces(),
            BTreeSet::from([ExposureSurface::LocalBusiness])
        );
    }

    #[test]
    fn snapshot_round_trip() {
        let table = ResolvedTable::new(
            "Clock",
            ComponentKind::Singleton,
            vec![descriptor("onTick")],
            vec![BoundCallback {
                id: 0,
                operation: OperationId::new("Impl", "onTick", Vec::<String>::new()),
                arity: Arity::Zero,
                schedules: vec![ScheduleSpec::default()],
                timeout_callback: false,
                provenance: Provenance::Declarative(Specificity::OperationName),
            }],
        );
        let bytes = table.to_snapshot().unwrap();
        assert_eq!(ResolvedTable::from_snapshot(&bytes).unwrap(), table);
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        assert!(matches!(
            ResolvedTable::from_snapshot(&[0xc1]),
            Err(SnapshotError::Decode(_))
        ));
    }
}
