//! Component kinds, management modes, and the surface legality table per kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::surface::ExposureSurface;

/// The flavour of a deployed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Stateless,
    Stateful,
    Singleton,
    MessageDriven,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stateless => "stateless",
            Self::Stateful => "stateful",
            Self::Singleton => "singleton",
            Self::MessageDriven => "message-driven",
        })
    }
}

/// Surfaces a component kind must and must not expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceRules {
    /// At least one of these must be present.
    pub required_any: &'static [ExposureSurface],
    /// None of these may be present.
    pub forbidden: &'static [ExposureSurface],
}

impl ComponentKind {
    /// Pure lookup of the exposure rules for this kind.
    #[must_use]
    pub const fn surface_rules(self) -> SurfaceRules {
        use ExposureSurface as S;
        match self {
            Self::Stateless => SurfaceRules {
                required_any: &[
                    S::RemoteComponent,
                    S::LocalComponent,
                    S::RemoteBusiness,
                    S::LocalBusiness,
                    S::ServiceEndpoint,
                ],
                forbidden: &[S::MessageEndpoint],
            },
            Self::Stateful => SurfaceRules {
                required_any: &[
                    S::RemoteComponent,
                    S::LocalComponent,
                    S::RemoteBusiness,
                    S::LocalBusiness,
                ],
                forbidden: &[S::ScheduledCallback, S::ServiceEndpoint, S::MessageEndpoint],
            },
            Self::Singleton => SurfaceRules {
                required_any: &[S::RemoteBusiness, S::LocalBusiness, S::ServiceEndpoint],
                forbidden: &[
                    S::RemoteHome,
                    S::LocalHome,
                    S::RemoteComponent,
                    S::LocalComponent,
                    S::MessageEndpoint,
                ],
            },
            Self::MessageDriven => SurfaceRules {
                required_any: &[S::MessageEndpoint],
                forbidden: &[
                    S::RemoteComponent,
                    S::LocalComponent,
                    S::RemoteBusiness,
                    S::LocalBusiness,
                    S::RemoteHome,
                    S::LocalHome,
                    S::ServiceEndpoint,
                ],
            },
        }
    }
}

/// Who manages an attribute family at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Management {
    #[default]
    Container,
    SelfManaged,
}

/// Management mode per attribute family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagementModes {
    pub transaction: Management,
    pub concurrency: Management,
    pub activity_scope: Management,
}

/// Identity and flags of the component being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub name: String,
    pub kind: ComponentKind,
    #[serde(default)]
    pub management: ManagementModes,
    /// Code-level markers are ignored when set ("declarative-only").
    #[serde(default)]
    pub metadata_complete: bool,
}

impl ComponentInfo {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            management: ManagementModes::default(),
            metadata_complete: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_and_forbidden_never_overlap() {
        for kind in [
            ComponentKind::Stateless,
            ComponentKind::Stateful,
            ComponentKind::Singleton,
            ComponentKind::MessageDriven,
        ] {
            let rules = kind.surface_rules();
            assert!(!rules.required_any.is_empty());
            for surface in rules.required_any {
                assert!(
                    !rules.forbidden.contains(surface),
                    "{kind} both requires and forbids {surface}"
                );
            }
        }
    }

    #[test]
    fn stateful_forbids_scheduled_callbacks() {
        assert!(ComponentKind::Stateful
            .surface_rules()
            .forbidden
            .contains(&ExposureSurface::ScheduledCallback));
        assert!(!ComponentKind::Stateless
            .surface_rules()
            .forbidden
            .contains(&ExposureSurface::ScheduledCallback));
    }

    #[test]
    fn component_info_defaults_to_container_management() {
        let info: ComponentInfo =
            serde_json::from_str(r#"{"name":"Billing","kind":"stateless"}"#).unwrap();
        assert_eq!(info.management, ManagementModes::default());
        assert!(!info.metadata_complete);
        assert_eq!(info, ComponentInfo::new("Billing", ComponentKind::Stateless));
    }
}
