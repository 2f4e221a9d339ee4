//! Disaster-tolerance validation
//!
//! Verifies that scheduling constraints spread a component's pods across
//! failure domains. This validates a static scheduling decision and runs
//! once after the cluster is ready, not on every poll tick.

use k8s_openapi::api::core::v1::Pod;
use std::time::Duration;

use crate::cluster::{Component, TidbCluster};
use crate::common::{bounded, label_selector, Error, Result};
use crate::platform::ClusterPlatform;

/// Components whose pods must be spread across failure domains.
pub const SPREAD_COMPONENTS: [Component; 3] = [Component::Pd, Component::Tikv, Component::Tidb];

/// Every pod needs at least one preferred anti-affinity term and every such
/// term must use `topology_key`.
pub fn check_pods_affinity(pods: &[Pod], topology_key: &str) -> Result<()> {
    for pod in pods {
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        let name = pod.metadata.name.clone().unwrap_or_default();
        let violation = |reason: String| Error::DisasterTolerance {
            namespace: namespace.clone(),
            pod: name.clone(),
            reason,
        };

        let affinity = pod
            .spec
            .as_ref()
            .and_then(|s| s.affinity.as_ref())
            .ok_or_else(|| violation("no affinity".into()))?;
        let anti_affinity = affinity
            .pod_anti_affinity
            .as_ref()
            .ok_or_else(|| violation("no pod anti-affinity".into()))?;
        let preferred = anti_affinity
            .preferred_during_scheduling_ignored_during_execution
            .as_deref()
            .unwrap_or_default();
        if preferred.is_empty() {
            return Err(violation(
                "no preferredDuringSchedulingIgnoredDuringExecution terms".into(),
            ));
        }
        if let Some(term) = preferred
            .iter()
            .find(|t| t.pod_affinity_term.topology_key != topology_key)
        {
            return Err(violation(format!(
                "topology key {:?} is not {:?}",
                term.pod_affinity_term.topology_key, topology_key
            )));
        }
    }
    Ok(())
}

/// Check pd, tikv and tidb pods of `tc`, stopping at the first violation.
/// Each pod listing is bounded by `fetch_timeout`.
pub async fn check_disaster_tolerance(
    platform: &dyn ClusterPlatform,
    tc: &TidbCluster,
    topology_key: &str,
    fetch_timeout: Duration,
) -> Result<()> {
    for component in SPREAD_COMPONENTS {
        let selector = label_selector(&component.labels(&tc.name));
        let pods = bounded(
            "list pods",
            fetch_timeout,
            platform.list_pods(&tc.namespace, &selector),
        )
        .await?;
        check_pods_affinity(&pods, topology_key)?;
        tracing::info!(cluster = %tc.name, component = %component, pods = pods.len(), "disaster tolerance verified");
    }
    Ok(())
}
