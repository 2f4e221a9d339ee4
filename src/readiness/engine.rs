//! Poll the predicate chain until the cluster converges or the deadline passes

use tokio::time::Instant;

use crate::cluster::{Component, TidbCluster};
use crate::common::{bounded, CheckerConfig, Error, Result};
use crate::platform::{ClusterPlatform, HttpProbe};

use super::{MemberCheck, PumpCheck, Verdict};

/// Outcome of one pass over the predicate chain.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Why the cluster document itself could not be observed this tick
    pub unobserved: Option<String>,
    /// Verdict per evaluated component, in chain order
    pub components: Vec<(Component, Verdict)>,
}

impl TickReport {
    /// Cluster-wide verdict: the first fatal error, otherwise every
    /// not-ready reason, otherwise ready.
    pub fn verdict(self) -> Verdict {
        if let Some(reason) = self.unobserved {
            return Verdict::NotReady(reason);
        }
        let mut reasons = Vec::new();
        for (component, verdict) in self.components {
            match verdict {
                Verdict::Ready => {}
                Verdict::NotReady(reason) => reasons.push(format!("{}: {}", component, reason)),
                Verdict::Error(e) => return Verdict::Error(e),
            }
        }
        if reasons.is_empty() {
            Verdict::Ready
        } else {
            Verdict::NotReady(reasons.join("; "))
        }
    }
}

/// Judges whether a TidbCluster has converged to its declared state.
///
/// Holds no state between calls besides its configuration; concurrent checks
/// of different clusters may share one platform and one HTTP probe.
pub struct ReadinessEngine<'a> {
    platform: &'a dyn ClusterPlatform,
    http: &'a dyn HttpProbe,
    config: CheckerConfig,
}

impl<'a> ReadinessEngine<'a> {
    pub fn new(
        platform: &'a dyn ClusterPlatform,
        http: &'a dyn HttpProbe,
        config: CheckerConfig,
    ) -> Self {
        Self {
            platform,
            http,
            config,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Evaluate the whole chain once against a freshly fetched cluster.
    ///
    /// `declared` decides which optional components take part; the
    /// predicates themselves read the fetched copy. Every declared component
    /// is evaluated even when an earlier one is not ready, except that a
    /// fatal verdict ends the pass.
    pub async fn tick(&self, declared: &TidbCluster) -> TickReport {
        let ns = declared.namespace.as_str();
        let name = declared.name.as_str();
        let observed = match self.fetch_cluster(ns, name).await {
            Ok(tc) => tc,
            Err(reason) => {
                return TickReport {
                    unobserved: Some(reason),
                    components: Vec::new(),
                }
            }
        };
        let mut components = Vec::new();

        let members = MemberCheck::new(self.platform, &self.config);
        let pump = PumpCheck::new(self.platform, self.http, &self.config);

        for component in Component::CHAIN {
            if !declared.declares(component) {
                tracing::debug!(cluster = name, component = %component, "not declared in tc spec, skipping");
                continue;
            }
            let verdict = match component {
                Component::Pump => pump.check(&observed).await,
                _ => members.check(&observed, component).await,
            };
            match &verdict {
                Verdict::Ready => {
                    tracing::info!(cluster = name, namespace = ns, component = %component, "members are ready")
                }
                Verdict::NotReady(reason) => {
                    tracing::info!(cluster = name, namespace = ns, component = %component, reason = %reason, "members are not ready")
                }
                Verdict::Error(e) => {
                    tracing::error!(cluster = name, namespace = ns, component = %component, error = %e, "fatal readiness error")
                }
            }
            let fatal = verdict.is_fatal();
            components.push((component, verdict));
            if fatal {
                break;
            }
        }

        TickReport {
            unobserved: None,
            components,
        }
    }

    /// Fetch the cluster document, folding absence and errors into a
    /// not-ready reason.
    async fn fetch_cluster(&self, ns: &str, name: &str) -> std::result::Result<TidbCluster, String> {
        match bounded(
            "get tidbcluster",
            self.config.fetch_timeout(),
            self.platform.get_cluster(ns, name),
        )
        .await
        {
            Ok(Some(tc)) => Ok(tc),
            Ok(None) => {
                tracing::info!(cluster = name, namespace = ns, "tidbcluster not found");
                Err(format!("tidbcluster {}/{} not found", ns, name))
            }
            Err(e) => {
                tracing::warn!(cluster = name, namespace = ns, error = %e, "failed to get tidbcluster");
                Err(format!("failed to get tidbcluster {}/{}: {}", ns, name, e))
            }
        }
    }

    /// Single evaluation folded into one verdict.
    pub async fn check_once(&self, declared: &TidbCluster) -> Verdict {
        self.tick(declared).await.verdict()
    }

    /// Poll immediately, then every `poll_interval`, until all declared
    /// components are ready on the same tick.
    ///
    /// A `None` cluster or a fatal verdict fails at once; otherwise the call
    /// fails with [`Error::DeadlineExceeded`] once `timeout` has elapsed.
    pub async fn wait_for_ready(&self, cluster: Option<&TidbCluster>) -> Result<()> {
        let Some(tc) = cluster else {
            return Err(Error::NilCluster);
        };
        let start = Instant::now();
        self.poll_until_ready(tc, start, start + self.config.timeout())
            .await
    }

    /// Like [`wait_for_ready`](Self::wait_for_ready) for a cluster known
    /// only by name. The declared spec is whatever the first successful
    /// fetch returns; a cluster that is missing or cannot be read is retried
    /// within the same deadline.
    pub async fn wait_for_named(&self, namespace: &str, name: &str) -> Result<TidbCluster> {
        let start = Instant::now();
        let deadline = start + self.config.timeout();

        let declared = loop {
            let last_reason = match self.fetch_cluster(namespace, name).await {
                Ok(tc) => break tc,
                Err(reason) => reason,
            };
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::DeadlineExceeded {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    elapsed: now - start,
                    last_reason,
                });
            }
            tokio::time::sleep_until(deadline.min(now + self.config.poll_interval())).await;
        };

        self.poll_until_ready(&declared, start, deadline).await?;
        Ok(declared)
    }

    async fn poll_until_ready(&self, tc: &TidbCluster, start: Instant, deadline: Instant) -> Result<()> {
        let mut ticks: u64 = 0;

        loop {
            ticks += 1;
            let last_reason = match self.check_once(tc).await {
                Verdict::Ready => {
                    tracing::info!(cluster = %tc.name, namespace = %tc.namespace, ticks, "TidbCluster is ready");
                    return Ok(());
                }
                Verdict::Error(e) => return Err(e),
                Verdict::NotReady(reason) => reason,
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::DeadlineExceeded {
                    namespace: tc.namespace.clone(),
                    name: tc.name.clone(),
                    elapsed: now - start,
                    last_reason,
                });
            }
            tokio::time::sleep_until(deadline.min(now + self.config.poll_interval())).await;
        }
    }
}
