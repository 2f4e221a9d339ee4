//! Readiness predicates for the replica-set backed components
//!
//! pd, tikv, tidb and tiflash share one algorithm. They differ only in how
//! their participants are reported (members with a health flag, or stores
//! with a state) and in which participant count the status document must
//! reach.

use crate::cluster::{Component, MemberGroupStatus, StoreGroupStatus, TidbCluster};
use crate::common::{bounded, CheckerConfig};
use crate::platform::ClusterPlatform;

use super::Verdict;

/// What the status document reports for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct Participants {
    /// The reconciler has populated a sub-status for the component
    pub status_present: bool,
    /// Failed members still holding a replica slot
    pub failure_count: i32,
    /// Participants counted toward replica parity
    pub count: i32,
    /// First participant not in its terminal healthy state
    pub unhealthy: Option<String>,
}

impl Participants {
    /// Every listed member, failed or not, counts and must be healthy.
    pub fn from_members(status: &MemberGroupStatus) -> Self {
        Self {
            status_present: status.stateful_set.is_some(),
            failure_count: len_i32(status.failure_members.len()),
            count: len_i32(status.members.len()),
            unhealthy: status
                .members
                .values()
                .find(|m| !m.health)
                .map(|m| format!("member({}/{}) is not healthy", m.id, m.name)),
        }
    }

    /// Failed stores are excluded from both the count and the health sweep.
    pub fn from_stores(status: &StoreGroupStatus) -> Self {
        let failed: Vec<&str> = status
            .failure_stores
            .iter()
            .map(|(id, f)| if f.store_id.is_empty() { id.as_str() } else { f.store_id.as_str() })
            .collect();
        let live: Vec<_> = status
            .stores
            .iter()
            .filter(|(id, s)| {
                let store_id = if s.id.is_empty() { id.as_str() } else { s.id.as_str() };
                !failed.contains(&store_id)
            })
            .map(|(_, s)| s)
            .collect();

        Self {
            status_present: status.stateful_set.is_some(),
            failure_count: len_i32(status.failure_stores.len()),
            count: len_i32(live.len()),
            unhealthy: live
                .iter()
                .find(|s| !s.is_up())
                .map(|s| format!("store({}) state {} != Up", s.id, s.state)),
        }
    }
}

fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Participants reported for `component` in the observed cluster.
pub fn participants(tc: &TidbCluster, component: Component) -> Participants {
    match component {
        Component::Pd => Participants::from_members(&tc.status.pd),
        Component::Tidb => Participants::from_members(&tc.status.tidb),
        Component::Tikv => Participants::from_stores(&tc.status.tikv),
        Component::Tiflash => Participants::from_stores(&tc.status.tiflash),
        Component::Pump => Participants {
            status_present: false,
            failure_count: 0,
            count: 0,
            unhealthy: None,
        },
    }
}

/// Participant count the status document must reach.
///
/// Member groups keep failed members listed, so they must reach the
/// effective target. Store groups drop failed stores from the list and must
/// match the declared count.
pub fn expected_participants(component: Component, declared: i32, effective: i32) -> i32 {
    match component {
        Component::Pd | Component::Tidb => effective,
        _ => declared,
    }
}

/// Evaluates one replica-set backed component against the observed cluster.
pub struct MemberCheck<'a> {
    pub platform: &'a dyn ClusterPlatform,
    pub config: &'a CheckerConfig,
}

impl<'a> MemberCheck<'a> {
    pub fn new(platform: &'a dyn ClusterPlatform, config: &'a CheckerConfig) -> Self {
        Self { platform, config }
    }

    pub async fn check(&self, tc: &TidbCluster, component: Component) -> Verdict {
        let ns = tc.namespace.as_str();
        let set_name = component.member_name(&tc.name);
        let timeout = self.config.fetch_timeout();

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
                tracing::warn!(namespace = ns, statefulset = %set_name, error = %e, "failed to get statefulset");
                return Verdict::not_ready(format!(
                    "failed to get statefulset {}/{}: {}",
                    ns, set_name, e
                ));
            }
        };

        if !set.rolling_update_complete() {
            return Verdict::not_ready(format!(
                "statefulset {}/{} .status.currentRevision ({}) != .status.updateRevision ({})",
                ns, set_name, set.current_revision, set.update_revision
            ));
        }

        match bounded(
            "check pods running and ready",
            timeout,
            self.platform.pod_set_running_and_ready(&set),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => {
                return Verdict::not_ready(format!(
                    "statefulset {}/{} desired pods are not all running and ready",
                    ns, set_name
                ))
            }
            Err(e) => {
                return Verdict::not_ready(format!(
                    "failed to check pods of statefulset {}/{}: {}",
                    ns, set_name, e
                ))
            }
        }

        let observed = participants(tc, component);
        if !observed.status_present {
            return Verdict::not_ready(format!(
                "tidbcluster {}/{} .status.{}.statefulSet is nil",
                ns, tc.name, component
            ));
        }

        let declared = tc.declared_replicas(component);
        let effective = declared + observed.failure_count;
        if set.spec_replicas != effective {
            return Verdict::not_ready(format!(
                "statefulset {}/{} .spec.replicas({}) != {}",
                ns, set_name, set.spec_replicas, effective
            ));
        }
        if set.ready_replicas != declared {
            return Verdict::not_ready(format!(
                "statefulset {}/{} .status.readyReplicas({}) != {}",
                ns, set_name, set.ready_replicas, declared
            ));
        }
        let expected = expected_participants(component, declared, effective);
        if observed.count != expected {
            return Verdict::not_ready(format!(
                "tidbcluster {}/{} .status.{} participants count({}) != {}",
                ns, tc.name, component, observed.count, expected
            ));
        }

        let expected_image = tc.image(component);
        let images = match bounded(
            "get member containers",
            timeout,
            self.platform.container_images(ns, &set_name, component),
        )
        .await
        {
            Ok(images) => images,
            Err(e) => {
                return Verdict::not_ready(format!(
                    "statefulset {}/{} containers[name={}] not found: {}",
                    ns,
                    set_name,
                    component.container_name(),
                    e
                ))
            }
        };
        if let Some(image) = images.iter().find(|i| **i != expected_image) {
            return Verdict::not_ready(format!(
                "statefulset {}/{} containers[name={}].image({}) != {}",
                ns,
                set_name,
                component.container_name(),
                image,
                expected_image
            ));
        }

        if let Some(unhealthy) = observed.unhealthy {
            return Verdict::not_ready(format!(
                "tidbcluster {}/{} {} {}",
                ns, tc.name, component, unhealthy
            ));
        }

        for service in component.service_names(&tc.name) {
            match bounded(
                "get service",
                timeout,
                self.platform.service_exists(ns, &service),
            )
            .await
            {
                Ok(true) => {}
                Ok(false) => {
                    return Verdict::not_ready(format!("service {}/{} not found", ns, service))
                }
                Err(e) => {
                    return Verdict::not_ready(format!(
                        "failed to get service {}/{}: {}",
                        ns, service, e
                    ))
                }
            }
        }

        Verdict::Ready
    }
}
