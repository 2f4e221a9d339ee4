//! Replica arithmetic under failover, over arbitrary declared and failed counts

mod common;

use common::*;
use proptest::prelude::*;
use tcready::cluster::{ComponentSpec, FailureMember, FailureStore, Member, Store};
use tcready::common::CheckerConfig;
use tcready::readiness::{MemberCheck, Verdict};
use tcready::Component;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(fut)
}

fn evaluate(world: World, component: Component) -> Verdict {
    let observed = world.cluster.clone().unwrap();
    let platform = FakePlatform::new(world);
    let config = CheckerConfig::default();
    block_on(MemberCheck::new(&platform, &config).check(&observed, component))
}

/// pd with `declared` healthy members plus `failures` replacements,
/// the failed members still listed.
fn pd_after_failover(declared: i32, failures: i32) -> World {
    let mut tc = basic_cluster();
    tc.spec.pd = ComponentSpec::new(declared, "pingcap/pd");
    let mut world = converged(&tc);
    world.replica_set_mut(Component::Pd).spec_replicas = declared + failures;
    world.replica_set_mut(Component::Pd).replicas = declared + failures;

    let pd = &mut world.cluster_mut().status.pd;
    for i in 0..failures {
        let name = format!("basic-pd-{}", declared + i);
        pd.members.insert(
            name.clone(),
            Member {
                id: format!("{}", 900 + i),
                name: name.clone(),
                health: true,
            },
        );
        pd.failure_members.insert(
            name.clone(),
            FailureMember {
                pod_name: name,
                member_id: format!("{}", 900 + i),
            },
        );
    }
    world
}

/// tikv with `declared` Up stores plus `failures` failed stores that the
/// status document still lists.
fn tikv_after_failover(declared: i32, failures: i32) -> World {
    let mut tc = basic_cluster();
    tc.spec.tikv = ComponentSpec::new(declared, "pingcap/tikv");
    let mut world = converged(&tc);
    world.replica_set_mut(Component::Tikv).spec_replicas = declared + failures;
    world.replica_set_mut(Component::Tikv).replicas = declared + failures;

    let tikv = &mut world.cluster_mut().status.tikv;
    for i in 0..failures {
        let id = format!("{}", 100 + i);
        tikv.stores.insert(
            id.clone(),
            Store {
                id: id.clone(),
                pod_name: format!("basic-tikv-{}", declared + i),
                state: "Down".into(),
            },
        );
        tikv.failure_stores.insert(
            id.clone(),
            FailureStore {
                pod_name: format!("basic-tikv-{}", declared + i),
                store_id: id,
            },
        );
    }
    world
}

fn deviate(world: &mut World, component: Component, deviation: u8) {
    match deviation {
        0 => world.replica_set_mut(component).spec_replicas += 1,
        1 => world.replica_set_mut(component).spec_replicas -= 1,
        2 => world.replica_set_mut(component).ready_replicas += 1,
        3 => world.replica_set_mut(component).ready_replicas -= 1,
        _ => {
            let status = &mut world.cluster_mut().status;
            if component == Component::Pd {
                let first = status.pd.members.keys().next().cloned().unwrap();
                status.pd.members.remove(&first);
            } else {
                let first = status.tikv.stores.keys().next().cloned().unwrap();
                status.tikv.stores.remove(&first);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_member_failover_converges(declared in 0i32..6, failures in 0i32..4) {
        prop_assert!(evaluate(pd_after_failover(declared, failures), Component::Pd).is_ready());
    }

    #[test]
    fn prop_member_deviation_is_not_ready(
        declared in 0i32..6,
        failures in 0i32..4,
        deviation in 0u8..5,
    ) {
        prop_assume!(deviation != 4 || declared + failures > 0);
        let mut world = pd_after_failover(declared, failures);
        deviate(&mut world, Component::Pd, deviation);
        let verdict = evaluate(world, Component::Pd);
        prop_assert!(matches!(verdict, Verdict::NotReady(_)), "{:?}", verdict);
    }

    #[test]
    fn prop_store_failover_converges(declared in 1i32..6, failures in 0i32..4) {
        prop_assert!(evaluate(tikv_after_failover(declared, failures), Component::Tikv).is_ready());
    }

    #[test]
    fn prop_store_deviation_is_not_ready(
        declared in 1i32..6,
        failures in 0i32..4,
        deviation in 0u8..5,
    ) {
        let mut world = tikv_after_failover(declared, failures);
        if deviation == 4 {
            // drop a live store, not one of the failed ones
            world.cluster_mut().status.tikv.stores.remove("1");
        } else {
            deviate(&mut world, Component::Tikv, deviation);
        }
        let verdict = evaluate(world, Component::Tikv);
        prop_assert!(matches!(verdict, Verdict::NotReady(_)), "{:?}", verdict);
    }
}
