//! Declared state of a TidbCluster

use serde::{Deserialize, Serialize};

/// Desired state published by whoever created the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster-wide version, used when a component declares none
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub pd: ComponentSpec,

    #[serde(default)]
    pub tikv: ComponentSpec,

    #[serde(default)]
    pub tidb: ComponentSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiflash: Option<ComponentSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump: Option<ComponentSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cluster: Option<TlsCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default)]
    pub replicas: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Legacy full image reference, only honored without `baseImage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsCluster {
    #[serde(default)]
    pub enabled: bool,
}

impl ComponentSpec {
    pub fn new(replicas: i32, base_image: &str) -> Self {
        Self {
            replicas,
            base_image: Some(base_image.to_string()),
            ..Default::default()
        }
    }

    /// Image the component's containers are expected to run.
    pub fn image(&self, cluster_version: &str) -> String {
        match self.base_image.as_deref().filter(|b| !b.is_empty()) {
            Some(base) => {
                let version = self.version.as_deref().unwrap_or(cluster_version);
                if version.is_empty() {
                    base.to_string()
                } else {
                    format!("{}:{}", base, version)
                }
            }
            None => self.image.clone().unwrap_or_default(),
        }
    }
}
