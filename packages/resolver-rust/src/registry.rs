use std::sync::Arc;

use arc_swap::ArcSwap;
use beanmeta_core::{ComponentInput, ConfigError, ResolvedTable};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::builder::DescriptorBuilder;

// ---------------------------------------------------------------------------
// ComponentReport
// ---------------------------------------------------------------------------

/// Per-component result of [`DescriptorRegistry::resolve_module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReport {
    pub component: String,
    /// Lenient-mode errors of a published table, or the error that stopped the build.
    pub result: Result<Vec<ConfigError>, ConfigError>,
}

impl ComponentReport {
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.result.is_ok()
    }
}

// ---------------------------------------------------------------------------
// DescriptorRegistry
// ---------------------------------------------------------------------------

/// Published resolved tables, one slot per component.
///
/// Readers get an `Arc` snapshot of a table and keep it for as long as they
/// need; republishing swaps the slot without disturbing them. A failed
/// rebuild never touches the slot, so the last good table stays visible.
pub struct DescriptorRegistry {
    /// Component name -> current table.
    tables: DashMap<String, Arc<ArcSwap<ResolvedTable>>>,
    /// First-publication order, for deterministic listing.
    publish_order: RwLock<Vec<String>>,
}

impl DescriptorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            publish_order: RwLock::new(Vec::new()),
        }
    }

    /// Publishes `table`, replacing any previous table of the same component.
    ///
    /// Returns the previously published table, if any.
    pub fn publish(&self, table: ResolvedTable) -> Option<Arc<ResolvedTable>> {
        let name = table.component.clone();
        let table = Arc::new(table);
        if let Some(slot) = self.tables.get(&name) {
            let previous = slot.swap(table);
            tracing::debug!(component = %name, "resolved table republished");
            return Some(previous);
        }

        // A concurrent first publication may win the entry; then this one swaps.
        let mut first = false;
        let slot = self
            .tables
            .entry(name.clone())
            .or_insert_with(|| {
                first = true;
                Arc::new(ArcSwap::from(Arc::clone(&table)))
            })
            .clone();
        if first {
            self.publish_order.write().push(name.clone());
            tracing::debug!(component = %name, "resolved table published");
            None
        } else {
            Some(slot.swap(table))
        }
    }

    /// The current table of `component`.
    #[must_use]
    pub fn get(&self, component: &str) -> Option<Arc<ResolvedTable>> {
        self.tables.get(component).map(|slot| slot.load_full())
    }

    /// Component names in first-publication order.
    #[must_use]
    pub fn components(&self) -> Vec<String> {
        self.publish_order.read().clone()
    }

    /// Withdraws a component's table.
    pub fn remove(&self, component: &str) -> Option<Arc<ResolvedTable>> {
        let (_, slot) = self.tables.remove(component)?;
        self.publish_order.write().retain(|name| name != component);
        Some(slot.load_full())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Builds every component of a module independently and publishes each
    /// table that builds.
    ///
    /// An error in one component never prevents the others from publishing.
    pub fn resolve_module(&self, builder: &DescriptorBuilder, inputs: &[ComponentInput]) -> Vec<ComponentReport> {
        inputs
            .iter()
            .map(|input| {
                let component = input.component.name.clone();
                let result = builder.build(input).map(|outcome| {
                    self.publish(outcome.table);
                    outcome.errors
                });
                if let Err(err) = &result {
                    tracing::error!(component = %component, kind = %err.kind(), "{err}");
                }
                ComponentReport { component, result }
            })
            .collect()
    }
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
