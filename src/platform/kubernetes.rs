//! Platform adapter backed by the kubernetes API server

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::Client;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::time::Instant;

use super::{
    desired_ordinals, is_running_and_ready, pod_name, ClusterAdmin, ClusterPlatform,
    ReplicaSetStatus, DELETE_SLOTS_ANNOTATION,
};
use crate::cluster::{ClusterSpec, ClusterStatus, Component, TidbCluster};
use crate::common::{label_selector, Error, Result};

pub const CLUSTER_GROUP: &str = "pingcap.com";
pub const CLUSTER_VERSION: &str = "v1alpha1";
pub const CLUSTER_KIND: &str = "TidbCluster";

const UPDATE_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const UPDATE_RETRY_TIMEOUT: Duration = Duration::from_secs(180);

/// Reads and writes cluster objects through a shared `kube::Client`.
///
/// The client is cheap to clone and safe for concurrent use, so one
/// `KubePlatform` can serve any number of in-flight checks.
#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
    cluster_resource: ApiResource,
}

impl KubePlatform {
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk(CLUSTER_GROUP, CLUSTER_VERSION, CLUSTER_KIND);
        Self {
            client,
            cluster_resource: ApiResource::from_gvk(&gvk),
        }
    }

    /// Connect using the ambient kubeconfig or in-cluster service account.
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn clusters(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.cluster_resource)
    }

    async fn get_statefulset(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    fn to_dynamic(&self, cluster: &TidbCluster) -> Result<DynamicObject> {
        let spec = serde_json::to_value(&cluster.spec)?;
        Ok(DynamicObject::new(&cluster.name, &self.cluster_resource)
            .within(&cluster.namespace)
            .data(serde_json::json!({ "spec": spec })))
    }
}

fn replica_set_status(sts: &StatefulSet) -> ReplicaSetStatus {
    let spec = sts.spec.as_ref();
    let status = sts.status.as_ref();
    let delete_slots = sts
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(DELETE_SLOTS_ANNOTATION))
        .and_then(|raw| serde_json::from_str::<BTreeSet<i32>>(raw).ok())
        .unwrap_or_default();

    ReplicaSetStatus {
        name: sts.metadata.name.clone().unwrap_or_default(),
        namespace: sts.metadata.namespace.clone().unwrap_or_default(),
        // apps/v1 defaults an unset .spec.replicas to 1
        spec_replicas: spec.and_then(|s| s.replicas).unwrap_or(1),
        replicas: status.map_or(0, |s| s.replicas),
        ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
        current_revision: status
            .and_then(|s| s.current_revision.clone())
            .unwrap_or_default(),
        update_revision: status
            .and_then(|s| s.update_revision.clone())
            .unwrap_or_default(),
        labels: sts.metadata.labels.clone().unwrap_or_default(),
        selector: spec
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default(),
        delete_slots,
    }
}

fn cluster_from_dynamic(obj: DynamicObject) -> Result<TidbCluster> {
    let section = |key: &str| {
        obj.data
            .get(key)
            .cloned()
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| serde_json::json!({}))
    };
    let spec: ClusterSpec = serde_json::from_value(section("spec"))?;
    let status: ClusterStatus = serde_json::from_value(section("status"))?;
    Ok(TidbCluster {
        name: obj.metadata.name.clone().unwrap_or_default(),
        namespace: obj.metadata.namespace.clone().unwrap_or_default(),
        spec,
        status,
    })
}

#[async_trait]
impl ClusterPlatform for KubePlatform {
    async fn get_replica_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReplicaSetStatus>> {
        Ok(self
            .get_statefulset(namespace, name)
            .await?
            .as_ref()
            .map(replica_set_status))
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api.list(&ListParams::default().labels(selector)).await?;
        Ok(pods.items)
    }

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<TidbCluster>> {
        match self.clusters(namespace).get_opt(name).await? {
            Some(obj) => Ok(Some(cluster_from_dynamic(obj)?)),
            None => Ok(None),
        }
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn pod_set_running_and_ready(&self, set: &ReplicaSetStatus) -> Result<bool> {
        let pods = self
            .list_pods(&set.namespace, &label_selector(&set.selector))
            .await?;
        let by_name: BTreeMap<String, &Pod> = pods
            .iter()
            .filter_map(|p| p.metadata.name.clone().map(|n| (n, p)))
            .collect();

        for ordinal in desired_ordinals(set.spec_replicas, &set.delete_slots) {
            let name = pod_name(&set.name, ordinal);
            match by_name.get(&name) {
                Some(pod) if is_running_and_ready(pod) => {}
                Some(_) => {
                    tracing::info!(namespace = %set.namespace, pod = %name, "pod is not running and ready");
                    return Ok(false);
                }
                None => {
                    tracing::info!(namespace = %set.namespace, pod = %name, "desired pod does not exist");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    async fn container_images(
        &self,
        namespace: &str,
        replica_set: &str,
        component: Component,
    ) -> Result<Vec<String>> {
        let sts = self
            .get_statefulset(namespace, replica_set)
            .await?
            .ok_or_else(|| Error::NotFound(format!("statefulset {}/{}", namespace, replica_set)))?;
        let set = replica_set_status(&sts);
        let pods = self
            .list_pods(namespace, &label_selector(&set.selector))
            .await?;
        if pods.is_empty() {
            return Err(Error::NotFound(format!(
                "no pods for statefulset {}/{}",
                namespace, replica_set
            )));
        }

        let images: Vec<String> = pods
            .iter()
            .filter_map(|p| p.spec.as_ref())
            .flat_map(|s| s.containers.iter())
            .filter(|c| c.name == component.container_name())
            .map(|c| c.image.clone().unwrap_or_default())
            .collect();
        if images.is_empty() {
            return Err(Error::NotFound(format!(
                "containers[name={}] in statefulset {}/{}",
                component.container_name(),
                namespace,
                replica_set
            )));
        }
        Ok(images)
    }
}

#[async_trait]
impl ClusterAdmin for KubePlatform {
    async fn create_secret(&self, secret: &Secret) -> Result<()> {
        let namespace = secret
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| Error::Other("secret has no namespace".into()))?;
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), secret).await?;
        Ok(())
    }

    async fn create_cluster(&self, cluster: &TidbCluster) -> Result<()> {
        let obj = self.to_dynamic(cluster)?;
        self.clusters(&cluster.namespace)
            .create(&PostParams::default(), &obj)
            .await?;
        tracing::info!(cluster = %cluster.name, namespace = %cluster.namespace, "created tidbcluster");
        Ok(())
    }

    async fn delete_cluster(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .clusters(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_cluster_spec(&self, cluster: &TidbCluster) -> Result<()> {
        let api = self.clusters(&cluster.namespace);
        let spec = serde_json::to_value(&cluster.spec)?;
        let start = Instant::now();

        loop {
            let attempt = async {
                let mut latest = api.get(&cluster.name).await?;
                latest.data["spec"] = spec.clone();
                api.replace(&cluster.name, &PostParams::default(), &latest)
                    .await?;
                Ok::<_, Error>(())
            };
            match attempt.await {
                Ok(()) => return Ok(()),
                Err(e) if start.elapsed() < UPDATE_RETRY_TIMEOUT => {
                    tracing::warn!(cluster = %cluster.name, error = %e, "update tidbcluster failed, retrying");
                    tokio::time::sleep(UPDATE_RETRY_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn clean_resources(&self, kind: &str, namespace: &str) -> Result<()> {
        let output = tokio::process::Command::new("kubectl")
            .args(["delete", kind, "--all", "-n", namespace])
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "kubectl delete {} --all -n {}: {}",
                kind,
                namespace,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
