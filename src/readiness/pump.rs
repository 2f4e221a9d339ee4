//! Readiness of the pump (binlog) service
//!
//! Pump predates the unified status document, so its readiness is judged
//! from the replica set, the pods found by label, and each pump's own
//! `/status` endpoint. Scheduling constraints on pump pods are static
//! manifest properties: a missing one is reported as a fatal error instead
//! of a not-ready verdict.

use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::cluster::component::INSTANCE_LABEL_KEY;
use crate::cluster::{Component, TidbCluster};
use crate::common::{bounded, label_selector, CheckerConfig, Error, Result};
use crate::platform::{ClusterPlatform, HttpProbe};

use super::Verdict;

/// Terminal healthy state of a pump node.
pub const PUMP_STATE_ONLINE: &str = "online";

/// Document served at `/status` by every pump.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PumpStatus {
    #[serde(rename = "StatusMap", default)]
    pub status_map: BTreeMap<String, Option<NodeStatus>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub state: String,
}

impl PumpStatus {
    /// First node not reporting `online`.
    pub fn offline_node(&self) -> Option<(&str, &str)> {
        self.status_map.iter().find_map(|(id, status)| {
            let state = status.as_ref().map_or("", |s| s.state.as_str());
            (state != PUMP_STATE_ONLINE).then_some((id.as_str(), state))
        })
    }
}

/// Status URL of one pump pod, addressed through the headless service.
pub fn status_url(tc: &TidbCluster, pod: &str, port: u16) -> String {
    format!(
        "http://{}.{}.{}:{}/status",
        pod,
        Component::Pump.member_name(&tc.name),
        tc.namespace,
        port
    )
}

/// Pump pods must carry exactly one preferred anti-affinity term and the
/// required toleration.
pub fn check_pump_scheduling(pod: &Pod, toleration_key: &str) -> Result<()> {
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let name = pod.metadata.name.clone().unwrap_or_default();
    let spec = pod.spec.as_ref();

    let affinity = spec
        .and_then(|s| s.affinity.as_ref())
        .ok_or_else(|| Error::MissingAffinity {
            namespace: namespace.clone(),
            pod: name.clone(),
        })?;
    let preferred = affinity
        .pod_anti_affinity
        .as_ref()
        .and_then(|a| a.preferred_during_scheduling_ignored_during_execution.as_ref())
        .map_or(0, Vec::len);
    if preferred != 1 {
        return Err(Error::MalformedAntiAffinity {
            namespace,
            pod: name,
            reason: format!(
                "expected exactly 1 preferred anti-affinity term, found {}",
                preferred
            ),
        });
    }

    let tolerated = spec
        .and_then(|s| s.tolerations.as_ref())
        .is_some_and(|ts| ts.iter().any(|t| t.key.as_deref() == Some(toleration_key)));
    if !tolerated {
        return Err(Error::MissingToleration {
            namespace,
            pod: name,
            key: toleration_key.to_string(),
        });
    }
    Ok(())
}

pub struct PumpCheck<'a> {
    pub platform: &'a dyn ClusterPlatform,
    pub http: &'a dyn HttpProbe,
    pub config: &'a CheckerConfig,
}

impl<'a> PumpCheck<'a> {
    pub fn new(
        platform: &'a dyn ClusterPlatform,
        http: &'a dyn HttpProbe,
        config: &'a CheckerConfig,
    ) -> Self {
        Self {
            platform,
            http,
            config,
        }
    }

    pub async fn check(&self, tc: &TidbCluster) -> Verdict {
        let ns = tc.namespace.as_str();
        let set_name = Component::Pump.member_name(&tc.name);
        let timeout = self.config.fetch_timeout();
        tracing::debug!(cluster = %tc.name, namespace = ns, "checking pump members");

        let set = match bounded(
            "get statefulset",
            timeout,
            self.platform.get_replica_set(ns, &set_name),
        )
        .await
        {
            Ok(Some(set)) => set,
            Ok(None) => return Verdict::not_ready(format!("statefulset {}/{} not found", ns, set_name)),
            Err(e) => {
                return Verdict::not_ready(format!(
                    "failed to get statefulset {}/{}: {}",
                    ns, set_name, e
                ))
            }
        };
        if set.replicas != set.ready_replicas {
            return Verdict::not_ready(format!(
                "statefulset {}/{} .status.readyReplicas({}) != .status.replicas({})",
                ns, set_name, set.ready_replicas, set.replicas
            ));
        }

        let instance = set
            .labels
            .get(INSTANCE_LABEL_KEY)
            .cloned()
            .unwrap_or_else(|| tc.name.clone());
        let selector = label_selector(&Component::Pump.labels(&instance));
        let pods = match bounded("list pods", timeout, self.platform.list_pods(ns, &selector)).await {
            Ok(pods) => pods,
            Err(e) => {
                return Verdict::not_ready(format!(
                    "failed to list pods {} in {}: {}",
                    selector, ns, e
                ))
            }
        };
        if pods.is_empty() {
            return Verdict::not_ready(format!("no pump pods found in {} for {}", ns, selector));
        }

        for pod in &pods {
            if let Err(e) = check_pump_scheduling(pod, &self.config.required_toleration_key) {
                return Verdict::Error(e);
            }
        }

        for pod in &pods {
            let name = pod.metadata.name.as_deref().unwrap_or_default();
            if let Some(reason) = self.probe(tc, name).await {
                return Verdict::NotReady(reason);
            }
        }
        Verdict::Ready
    }

    /// `None` when every node reported by this pump is online.
    async fn probe(&self, tc: &TidbCluster, pod: &str) -> Option<String> {
        let url = status_url(tc, pod, self.config.pump_status_port);
        let res = match bounded("pump status", self.config.http_timeout(), self.http.get(&url)).await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(cluster = %tc.name, url = %url, error = %e, "pump status request failed");
                return Some(format!("call {} failed: {}", url, e));
            }
        };
        if res.status >= 400 {
            return Some(format!("{} answered {}", url, res.status));
        }
        let status: PumpStatus = match serde_json::from_str(&res.body) {
            Ok(status) => status,
            Err(e) => return Some(format!("{} returned an unreadable document: {}", url, e)),
        };
        status.offline_node().map(|(id, state)| {
            format!(
                "pump {} reports node {} in state {:?}, not {}",
                pod, id, state, PUMP_STATE_ONLINE
            )
        })
    }
}
