//! Ops commands run against a converged cluster

pub mod disaster;
pub mod tidb_control;

pub use disaster::{check_disaster_tolerance, check_pods_affinity};
pub use tidb_control::{DbInfo, TidbControl};
