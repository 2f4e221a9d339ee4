//! Observed state published by the external reconciler

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal healthy state of a store.
pub const STORE_STATE_UP: &str = "Up";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub pd: MemberGroupStatus,

    #[serde(default)]
    pub tikv: StoreGroupStatus,

    #[serde(default)]
    pub tidb: MemberGroupStatus,

    #[serde(default)]
    pub tiflash: StoreGroupStatus,
}

/// Replica-set summary copied into the status document by the reconciler.
/// Its presence means the reconciler has started reporting on the component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSetRef {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    #[serde(default)]
    pub current_revision: String,
    #[serde(default)]
    pub update_revision: String,
}

/// Status of a component whose participants are members (pd, tidb).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberGroupStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful_set: Option<StatefulSetRef>,

    #[serde(default)]
    pub members: BTreeMap<String, Member>,

    #[serde(default)]
    pub failure_members: BTreeMap<String, FailureMember>,
}

/// Status of a component whose participants are stores (tikv, tiflash).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreGroupStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful_set: Option<StatefulSetRef>,

    #[serde(default)]
    pub stores: BTreeMap<String, Store>,

    #[serde(default)]
    pub failure_stores: BTreeMap<String, FailureStore>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub health: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureMember {
    #[serde(default)]
    pub pod_name: String,
    #[serde(default, rename = "memberID")]
    pub member_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureStore {
    #[serde(default)]
    pub pod_name: String,
    #[serde(default, rename = "storeID")]
    pub store_id: String,
}

impl Store {
    pub fn is_up(&self) -> bool {
        self.state == STORE_STATE_UP
    }
}
