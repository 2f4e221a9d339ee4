//! # tcready
//!
//! Readiness-convergence checker for TiDB clusters on Kubernetes:
//! - Per-component predicates for pd, tikv, tidb, tiflash and pump
//! - Fixed-interval poller with a hard deadline
//! - Retryable not-ready vs. fatal manifest defects
//! - Disaster-tolerance (anti-affinity) validation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            ReadinessEngine               │
//! │  (re-fetches the TidbCluster each tick)  │
//! └───────────┬──────────────────────────────┘
//!             │ ordered chain
//!   ┌─────────┴──────┬───────────┬───────────┬────────────┐
//!   │                │           │           │            │
//! ┌─▼────┐      ┌────▼───┐  ┌────▼───┐  ┌────▼────┐  ┌────▼────┐
//! │  pd  │      │  tikv  │  │  tidb  │  │ tiflash │  │  pump   │
//! │      │      │        │  │        │  │ (opt.)  │  │ (opt.)  │
//! └──┬───┘      └───┬────┘  └───┬────┘  └────┬────┘  └──┬───┬──┘
//!    └──────────────┴───────────┴────────────┴──────────┘   │
//!              ClusterPlatform (kubernetes reads)      HttpProbe (/status)
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Wait up to 10 minutes for cluster `basic` to converge
//! tcready --namespace e2e wait basic --timeout 10m
//!
//! # Check anti-affinity once the cluster is up
//! tcready --namespace e2e disaster-tolerance basic
//! ```

pub mod cluster;
pub mod common;
pub mod ops;
pub mod platform;
pub mod readiness;

// Re-export commonly used types
pub use cluster::{Component, TidbCluster};
pub use common::{CheckerConfig, Config, Error, Result};
pub use readiness::{ReadinessEngine, Verdict};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
