//! Pod helpers shared by the platform adapters

use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeSet;

/// Name of the pod holding `ordinal` in replica set `set`.
pub fn pod_name(set: &str, ordinal: i32) -> String {
    format!("{}-{}", set, ordinal)
}

/// Ordinals the replica set should run, skipping deleted slots.
pub fn desired_ordinals(replicas: i32, delete_slots: &BTreeSet<i32>) -> Vec<i32> {
    let wanted = usize::try_from(replicas).unwrap_or(0);
    (0..)
        .filter(|ordinal| !delete_slots.contains(ordinal))
        .take(wanted)
        .collect()
}

/// Phase `Running` and a `Ready=True` condition.
pub fn is_running_and_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    if status.phase.as_deref() != Some("Running") {
        return false;
    }
    status
        .conditions
        .as_ref()
        .is_some_and(|conds| conds.iter().any(|c| c.type_ == "Ready" && c.status == "True"))
}
