//! Readiness-convergence checking
//!
//! Each tick re-fetches the cluster document and evaluates the predicate
//! chain pd → tikv → tidb → tiflash → pump from scratch. Transient
//! conditions (missing objects, counter mismatches, unhealthy members,
//! fetch errors) fold into [`Verdict::NotReady`] and are retried; manifest
//! defects surface as [`Verdict::Error`] and stop the poller.

pub mod engine;
pub mod members;
pub mod pump;
pub mod verdict;

pub use engine::{ReadinessEngine, TickReport};
pub use members::{MemberCheck, Participants};
pub use pump::{check_pump_scheduling, PumpCheck, PumpStatus};
pub use verdict::Verdict;
