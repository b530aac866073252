//! Exposure surfaces: the contracts through which an operation is reachable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an operation is reachable from outside the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExposureSurface {
    /// Component-style remote interface (carries an implicit `remove`).
    RemoteComponent,
    /// Component-style local interface (carries an implicit `remove`).
    LocalComponent,
    RemoteBusiness,
    LocalBusiness,
    RemoteHome,
    LocalHome,
    ScheduledCallback,
    LifecycleCallback,
    ServiceEndpoint,
    MessageEndpoint,
}

impl ExposureSurface {
    /// Every surface, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::RemoteComponent,
        Self::LocalComponent,
        Self::RemoteBusiness,
        Self::LocalBusiness,
        Self::RemoteHome,
        Self::LocalHome,
        Self::ScheduledCallback,
        Self::LifecycleCallback,
        Self::ServiceEndpoint,
        Self::MessageEndpoint,
    ];

    #[must_use]
    pub const fn is_home(self) -> bool {
        matches!(self, Self::RemoteHome | Self::LocalHome)
    }

    #[must_use]
    pub const fn is_component(self) -> bool {
        matches!(self, Self::RemoteComponent | Self::LocalComponent)
    }

    /// Component-style interfaces implicitly declare a lifecycle-removal operation.
    #[must_use]
    pub const fn carries_remove_placeholder(self) -> bool {
        self.is_component()
    }

    /// Surfaces whose invocations pass through the interceptor chain.
    #[must_use]
    pub const fn is_interceptable(self) -> bool {
        matches!(
            self,
            Self::RemoteComponent
                | Self::LocalComponent
                | Self::RemoteBusiness
                | Self::LocalBusiness
                | Self::ServiceEndpoint
                | Self::MessageEndpoint
                | Self::ScheduledCallback
        )
    }

    /// Asynchronous dispatch is only meaningful for client-facing views.
    #[must_use]
    pub const fn supports_asynchronous(self) -> bool {
        matches!(
            self,
            Self::RemoteComponent
                | Self::LocalComponent
                | Self::RemoteBusiness
                | Self::LocalBusiness
        )
    }

    /// The surface a home surface pairs with (and the reverse).
    #[must_use]
    pub const fn paired_surface(self) -> Option<Self> {
        match self {
            Self::RemoteHome => Some(Self::RemoteComponent),
            Self::RemoteComponent => Some(Self::RemoteHome),
            Self::LocalHome => Some(Self::LocalComponent),
            Self::LocalComponent => Some(Self::LocalHome),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemoteComponent => "remote-component",
            Self::LocalComponent => "local-component",
            Self::RemoteBusiness => "remote-business",
            Self::LocalBusiness => "local-business",
            Self::RemoteHome => "remote-home",
            Self::LocalHome => "local-home",
            Self::ScheduledCallback => "scheduled-callback",
            Self::LifecycleCallback => "lifecycle-callback",
            Self::ServiceEndpoint => "service-endpoint",
            Self::MessageEndpoint => "message-endpoint",
        }
    }
}

impl fmt::Display for ExposureSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
