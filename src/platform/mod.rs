//! Narrow interfaces to the orchestration platform
//!
//! The readiness checker only reads. Everything it needs from kubernetes and
//! from component status endpoints goes through the traits below, so a check
//! can run against the real API server ([`KubePlatform`], [`ReqwestProbe`])
//! or against an in-memory double in tests.

pub mod http;
pub mod kubernetes;
pub mod pods;
pub mod tls;

pub use self::http::ReqwestProbe;
pub use self::kubernetes::KubePlatform;
pub use self::pods::{desired_ordinals, is_running_and_ready, pod_name};
pub use self::tls::{client_tls_secret_name, ClientTls};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Secret};
use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::{Component, TidbCluster};
use crate::common::Result;

/// Annotation listing replica-set ordinals that must not be scheduled.
pub const DELETE_SLOTS_ANNOTATION: &str = "delete-slots";

/// Snapshot of a replica set's declared and observed counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicaSetStatus {
    pub name: String,
    pub namespace: String,
    /// `.spec.replicas`
    pub spec_replicas: i32,
    /// `.status.replicas`
    pub replicas: i32,
    pub ready_replicas: i32,
    pub current_revision: String,
    pub update_revision: String,
    pub labels: BTreeMap<String, String>,
    /// `.spec.selector.matchLabels`
    pub selector: BTreeMap<String, String>,
    pub delete_slots: BTreeSet<i32>,
}

impl ReplicaSetStatus {
    /// A rolling update is finished once both revisions agree.
    pub fn rolling_update_complete(&self) -> bool {
        self.current_revision == self.update_revision
    }
}

/// Response of a status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Read-only view of the cluster's kubernetes objects.
#[async_trait]
pub trait ClusterPlatform: Send + Sync {
    /// `None` when the replica set does not exist.
    async fn get_replica_set(&self, namespace: &str, name: &str)
        -> Result<Option<ReplicaSetStatus>>;

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// `None` when the cluster custom resource does not exist.
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<TidbCluster>>;

    /// `None` when the secret does not exist.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Every desired pod of the set exists, is running and reports ready.
    async fn pod_set_running_and_ready(&self, set: &ReplicaSetStatus) -> Result<bool>;

    /// Images of the component's containers across the set's live pods.
    async fn container_images(
        &self,
        namespace: &str,
        replica_set: &str,
        component: Component,
    ) -> Result<Vec<String>>;
}

/// Mutations used by callers that stand up or tear down a cluster.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    async fn create_secret(&self, secret: &Secret) -> Result<()>;

    async fn create_cluster(&self, cluster: &TidbCluster) -> Result<()>;

    /// Deleting a missing cluster is not an error.
    async fn delete_cluster(&self, namespace: &str, name: &str) -> Result<()>;

    /// Replace the stored spec with `cluster.spec`, retrying conflicts.
    async fn update_cluster_spec(&self, cluster: &TidbCluster) -> Result<()>;

    /// Best-effort `kubectl delete <kind> --all`.
    async fn clean_resources(&self, kind: &str, namespace: &str) -> Result<()>;
}

/// Plain requests against a component status endpoint.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// POST with an optional JSON body.
    async fn post(&self, url: &str, json: Option<String>) -> Result<HttpResponse>;
}
