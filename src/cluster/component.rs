//! Component vocabulary and kubernetes object naming

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NAME_LABEL_KEY: &str = "app.kubernetes.io/name";
pub const INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";
pub const COMPONENT_LABEL_KEY: &str = "app.kubernetes.io/component";
pub const MANAGED_BY_NAME: &str = "tidb-cluster";

/// A member group of the cluster, deployed as one replica set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Metadata and placement service
    Pd,
    /// Storage engine
    Tikv,
    /// SQL frontend
    Tidb,
    /// Columnar replica
    Tiflash,
    /// Binlog (log replication) service
    Pump,
}

impl Component {
    /// Evaluation order of the readiness chain.
    pub const CHAIN: [Component; 5] = [
        Component::Pd,
        Component::Tikv,
        Component::Tidb,
        Component::Tiflash,
        Component::Pump,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Pd => "pd",
            Component::Tikv => "tikv",
            Component::Tidb => "tidb",
            Component::Tiflash => "tiflash",
            Component::Pump => "pump",
        }
    }

    /// Optional components only run when declared with replicas.
    pub fn is_optional(&self) -> bool {
        matches!(self, Component::Tiflash | Component::Pump)
    }

    /// Name of the replica set (and of the primary service, where there is one).
    pub fn member_name(&self, cluster: &str) -> String {
        format!("{}-{}", cluster, self.as_str())
    }

    /// Name of the headless peer service.
    pub fn peer_member_name(&self, cluster: &str) -> String {
        format!("{}-{}-peer", cluster, self.as_str())
    }

    /// Container name inside the component's pods.
    pub fn container_name(&self) -> &'static str {
        self.as_str()
    }

    /// Services that must exist once the component is bootstrapped.
    pub fn service_names(&self, cluster: &str) -> Vec<String> {
        match self {
            Component::Pd | Component::Tidb => vec![
                self.member_name(cluster),
                self.peer_member_name(cluster),
            ],
            Component::Tikv | Component::Tiflash => vec![self.peer_member_name(cluster)],
            Component::Pump => vec![self.member_name(cluster)],
        }
    }

    /// Labels carried by every pod of this component.
    pub fn labels(&self, instance: &str) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(NAME_LABEL_KEY.to_string(), MANAGED_BY_NAME.to_string());
        labels.insert(INSTANCE_LABEL_KEY.to_string(), instance.to_string());
        labels.insert(COMPONENT_LABEL_KEY.to_string(), self.as_str().to_string());
        labels
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
