//! TidbCluster document model
//!
//! A `TidbCluster` bundles the declared spec with the status document the
//! external reconciler publishes. Both are read-only snapshots, fetched fresh
//! on every poll tick.

pub mod component;
pub mod spec;
pub mod status;

pub use component::Component;
pub use spec::{ClusterSpec, ComponentSpec, TlsCluster};
pub use status::{
    ClusterStatus, FailureMember, FailureStore, Member, MemberGroupStatus, StatefulSetRef, Store,
    StoreGroupStatus, STORE_STATE_UP,
};

use serde::{Deserialize, Serialize};

/// The cluster custom resource, reduced to what readiness checks read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TidbCluster {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl TidbCluster {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: ClusterSpec) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            spec,
            status: ClusterStatus::default(),
        }
    }

    /// Declared spec of a component, `None` for an omitted optional one.
    pub fn component_spec(&self, component: Component) -> Option<&ComponentSpec> {
        match component {
            Component::Pd => Some(&self.spec.pd),
            Component::Tikv => Some(&self.spec.tikv),
            Component::Tidb => Some(&self.spec.tidb),
            Component::Tiflash => self.spec.tiflash.as_ref(),
            Component::Pump => self.spec.pump.as_ref(),
        }
    }

    /// Declared replica count, zero for an omitted optional component.
    pub fn declared_replicas(&self, component: Component) -> i32 {
        self.component_spec(component).map_or(0, |c| c.replicas)
    }

    /// Whether the readiness chain should evaluate this component.
    pub fn declares(&self, component: Component) -> bool {
        if !component.is_optional() {
            return true;
        }
        self.declared_replicas(component) > 0
    }

    /// Image derived from the declared spec.
    pub fn image(&self, component: Component) -> String {
        self.component_spec(component)
            .map(|c| c.image(&self.spec.version))
            .unwrap_or_default()
    }

    pub fn tls_cluster_enabled(&self) -> bool {
        self.spec.tls_cluster.as_ref().is_some_and(|t| t.enabled)
    }

    /// Scheme for in-cluster component endpoints.
    pub fn scheme(&self) -> &'static str {
        if self.tls_cluster_enabled() {
            "https"
        } else {
            "http"
        }
    }
}
