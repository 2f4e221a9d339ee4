//! In-memory platform used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Affinity, Pod, PodAffinityTerm, PodAntiAffinity, PodSpec, Secret, Toleration,
    WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tcready::cluster::{
    ClusterSpec, ComponentSpec, FailureStore, Member, StatefulSetRef, Store,
};
use tcready::common::Result;
use tcready::platform::{ClusterPlatform, HttpProbe, HttpResponse, ReplicaSetStatus};
use tcready::{Component, Error, TidbCluster};

pub const NAMESPACE: &str = "e2e";
pub const CLUSTER: &str = "basic";

/// Everything the platform reports on one tick.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub cluster: Option<TidbCluster>,
    pub replica_sets: BTreeMap<String, ReplicaSetStatus>,
    pub unready_pod_sets: BTreeSet<String>,
    pub images: BTreeMap<String, Vec<String>>,
    pub services: BTreeSet<String>,
    pub pods: Vec<Pod>,
    pub secrets: BTreeMap<String, Secret>,
    pub fail_reads: bool,
    /// Pod listings hang instead of answering
    pub stall_reads: bool,
}

impl World {
    pub fn replica_set_mut(&mut self, component: Component) -> &mut ReplicaSetStatus {
        self.replica_sets
            .get_mut(&component.member_name(CLUSTER))
            .expect("replica set present")
    }

    pub fn cluster_mut(&mut self) -> &mut TidbCluster {
        self.cluster.as_mut().expect("cluster present")
    }
}

/// Replays a script of worlds, advancing one step per cluster fetch.
pub struct FakePlatform {
    worlds: Vec<World>,
    fetches: AtomicUsize,
}

impl FakePlatform {
    pub fn new(world: World) -> Self {
        Self::scripted(vec![world])
    }

    pub fn scripted(worlds: Vec<World>) -> Self {
        assert!(!worlds.is_empty());
        Self {
            worlds,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of cluster documents fetched so far, i.e. ticks run.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn current(&self) -> &World {
        let step = self.fetches().saturating_sub(1);
        &self.worlds[step.min(self.worlds.len() - 1)]
    }

    fn read_guard(&self) -> Result<&World> {
        let world = self.current();
        if world.fail_reads {
            return Err(Error::Other("connection refused".into()));
        }
        Ok(world)
    }
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    selector.split(',').filter(|s| !s.is_empty()).all(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        labels.get(k).map(String::as_str) == Some(v)
    })
}

#[async_trait]
impl ClusterPlatform for FakePlatform {
    async fn get_replica_set(&self, _ns: &str, name: &str) -> Result<Option<ReplicaSetStatus>> {
        Ok(self.read_guard()?.replica_sets.get(name).cloned())
    }

    async fn list_pods(&self, _ns: &str, selector: &str) -> Result<Vec<Pod>> {
        if self.current().stall_reads {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self
            .read_guard()?
            .pods
            .iter()
            .filter(|p| matches_selector(p, selector))
            .cloned()
            .collect())
    }

    async fn service_exists(&self, _ns: &str, name: &str) -> Result<bool> {
        Ok(self.read_guard()?.services.contains(name))
    }

    async fn get_cluster(&self, _ns: &str, _name: &str) -> Result<Option<TidbCluster>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.read_guard()?.cluster.clone())
    }

    async fn get_secret(&self, _ns: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.read_guard()?.secrets.get(name).cloned())
    }

    async fn pod_set_running_and_ready(&self, set: &ReplicaSetStatus) -> Result<bool> {
        Ok(!self.read_guard()?.unready_pod_sets.contains(&set.name))
    }

    async fn container_images(
        &self,
        ns: &str,
        replica_set: &str,
        _component: Component,
    ) -> Result<Vec<String>> {
        self.read_guard()?
            .images
            .get(replica_set)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("pods of {}/{}", ns, replica_set)))
    }
}

/// Answers every pump status request with one document.
pub struct FakeProbe {
    response: Mutex<HttpResponse>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn online() -> Self {
        Self::answering(200, r#"{"StatusMap": {"basic-pump-0:8250": {"state": "online"}}}"#)
    }

    pub fn answering(status: u16, body: &str) -> Self {
        Self {
            response: Mutex::new(HttpResponse {
                status,
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpProbe for FakeProbe {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.response.lock().unwrap().clone())
    }

    async fn post(&self, url: &str, _json: Option<String>) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.response.lock().unwrap().clone())
    }
}

pub fn basic_cluster() -> TidbCluster {
    TidbCluster::new(
        CLUSTER,
        NAMESPACE,
        ClusterSpec {
            version: "v4.0.0".into(),
            pd: ComponentSpec::new(3, "pingcap/pd"),
            tikv: ComponentSpec::new(3, "pingcap/tikv"),
            tidb: ComponentSpec::new(2, "pingcap/tidb"),
            ..Default::default()
        },
    )
}

pub fn with_pump(mut tc: TidbCluster, replicas: i32) -> TidbCluster {
    tc.spec.pump = Some(ComponentSpec::new(replicas, "pingcap/tidb-binlog"));
    tc
}

pub fn with_tiflash(mut tc: TidbCluster, replicas: i32) -> TidbCluster {
    tc.spec.tiflash = Some(ComponentSpec::new(replicas, "pingcap/tiflash"));
    tc
}

fn healthy_set(component: Component, replicas: i32) -> ReplicaSetStatus {
    let name = component.member_name(CLUSTER);
    ReplicaSetStatus {
        name: name.clone(),
        namespace: NAMESPACE.into(),
        spec_replicas: replicas,
        replicas,
        ready_replicas: replicas,
        current_revision: format!("{}-5d8f", name),
        update_revision: format!("{}-5d8f", name),
        labels: component.labels(CLUSTER),
        selector: component.labels(CLUSTER),
        delete_slots: BTreeSet::new(),
    }
}

pub fn pump_pod(ordinal: i32, preferred_terms: usize, toleration: Option<&str>) -> Pod {
    let term = WeightedPodAffinityTerm {
        weight: 50,
        pod_affinity_term: PodAffinityTerm {
            topology_key: "rack".into(),
            ..Default::default()
        },
    };
    Pod {
        metadata: ObjectMeta {
            name: Some(format!("{}-pump-{}", CLUSTER, ordinal)),
            namespace: Some(NAMESPACE.into()),
            labels: Some(Component::Pump.labels(CLUSTER)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            affinity: Some(Affinity {
                pod_anti_affinity: Some(PodAntiAffinity {
                    preferred_during_scheduling_ignored_during_execution: Some(vec![
                        term;
                        preferred_terms
                    ]),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            tolerations: toleration.map(|key| {
                vec![Toleration {
                    key: Some(key.into()),
                    operator: Some("Exists".into()),
                    ..Default::default()
                }]
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A world in which every component declared by `declared` has converged.
pub fn converged(declared: &TidbCluster) -> World {
    let mut world = World::default();
    let mut observed = declared.clone();

    for component in Component::CHAIN {
        if !declared.declares(component) {
            continue;
        }
        let replicas = declared.declared_replicas(component);
        let set = healthy_set(component, replicas);
        world.replica_sets.insert(set.name.clone(), set);
        for service in component.service_names(CLUSTER) {
            world.services.insert(service);
        }

        let image = declared.image(component);
        let set_name = component.member_name(CLUSTER);
        world
            .images
            .insert(set_name.clone(), vec![image; replicas as usize]);

        let sts_ref = Some(StatefulSetRef {
            replicas,
            ready_replicas: replicas,
            ..Default::default()
        });
        match component {
            Component::Pd | Component::Tidb => {
                let status = if component == Component::Pd {
                    &mut observed.status.pd
                } else {
                    &mut observed.status.tidb
                };
                status.stateful_set = sts_ref;
                for ordinal in 0..replicas {
                    let name = format!("{}-{}", set_name, ordinal);
                    status.members.insert(
                        name.clone(),
                        Member {
                            id: format!("{}", 100 + ordinal),
                            name,
                            health: true,
                        },
                    );
                }
            }
            Component::Tikv | Component::Tiflash => {
                let status = if component == Component::Tikv {
                    &mut observed.status.tikv
                } else {
                    &mut observed.status.tiflash
                };
                status.stateful_set = sts_ref;
                for ordinal in 0..replicas {
                    let id = format!("{}", 1 + ordinal);
                    status.stores.insert(
                        id.clone(),
                        Store {
                            id,
                            pod_name: format!("{}-{}", set_name, ordinal),
                            state: "Up".into(),
                        },
                    );
                }
            }
            Component::Pump => {
                for ordinal in 0..replicas {
                    world.pods.push(pump_pod(ordinal, 1, Some("node-role")));
                }
            }
        }
    }

    world.cluster = Some(observed);
    world
}

/// A failed store that still holds a replica slot.
pub fn add_failure_store(world: &mut World, component: Component, id: &str) {
    let tc = world.cluster_mut();
    let status = if component == Component::Tikv {
        &mut tc.status.tikv
    } else {
        &mut tc.status.tiflash
    };
    status.failure_stores.insert(
        id.to_string(),
        FailureStore {
            pod_name: format!("{}-{}", component.member_name(CLUSTER), id),
            store_id: id.to_string(),
        },
    );
}
