//! CLI for TidbCluster readiness checks

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tcready::common::{duration_millis, parse_duration, Config};
use tcready::ops::{check_disaster_tolerance, TidbControl};
use tcready::platform::{ClusterAdmin, ClusterPlatform, KubePlatform, ReqwestProbe};
use tcready::{ReadinessEngine, TidbCluster};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tcready")]
#[command(about = "Readiness checks for TiDB clusters on Kubernetes")]
#[command(version)]
struct Cli {
    /// Namespace of the TidbCluster
    #[arg(long, short = 'n', default_value = "default")]
    namespace: String,

    /// Config file (defaults to $TCREADY_CONFIG or ./tcready.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait until every declared component is ready
    Wait {
        /// TidbCluster name
        cluster: String,

        /// Overall deadline (e.g. 10m)
        #[arg(long)]
        timeout: Option<String>,

        /// Poll interval (e.g. 5s)
        #[arg(long)]
        interval: Option<String>,

        /// Validate anti-affinity once the cluster is ready
        #[arg(long)]
        disaster_tolerance: bool,
    },

    /// Validate anti-affinity of pd, tikv and tidb pods
    DisasterTolerance {
        /// TidbCluster name
        cluster: String,
    },

    /// Probe the status endpoint of one tidb server
    TidbHealth {
        /// TidbCluster name
        cluster: String,

        /// Ordinal of the tidb pod
        #[arg(long, default_value = "0")]
        ordinal: i32,
    },

    /// Show whether a tidb server is the DDL owner
    TidbInfo {
        /// TidbCluster name
        cluster: String,

        /// Ordinal of the tidb pod
        #[arg(long, default_value = "0")]
        ordinal: i32,
    },

    /// Replace the labels config of a tidb server
    TidbLabels {
        /// TidbCluster name
        cluster: String,

        /// Ordinal of the tidb pod
        #[arg(long, default_value = "0")]
        ordinal: i32,

        /// Labels as key=value
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Delete every object of a kind in the namespace
    Clean {
        /// Resource kind (e.g. pvc)
        kind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let platform = KubePlatform::try_default().await?;
    let http = ReqwestProbe::new(config.checker.http_timeout())?;

    match cli.command {
        Commands::Wait {
            cluster,
            timeout,
            interval,
            disaster_tolerance,
        } => {
            if let Some(timeout) = timeout {
                config.checker.timeout_ms = duration_millis(parse_duration(&timeout)?)?;
            }
            if let Some(interval) = interval {
                config.checker.poll_interval_ms = duration_millis(parse_duration(&interval)?)?;
            }
            config.checker.validate()?;

            let engine = ReadinessEngine::new(&platform, &http, config.checker.clone());
            let declared = engine.wait_for_named(&cli.namespace, &cluster).await?;
            println!("TidbCluster {}/{} is ready", cli.namespace, cluster);

            if disaster_tolerance {
                check_disaster_tolerance(
                    &platform,
                    &declared,
                    &config.checker.failure_domain_key,
                    config.checker.fetch_timeout(),
                )
                .await?;
                println!("Disaster tolerance verified");
            }
        }

        Commands::DisasterTolerance { cluster } => {
            let tc = existing_cluster(&platform, &cli.namespace, &cluster).await?;
            check_disaster_tolerance(
                &platform,
                &tc,
                &config.checker.failure_domain_key,
                config.checker.fetch_timeout(),
            )
            .await?;
            println!("Disaster tolerance verified");
        }

        Commands::TidbHealth { cluster, ordinal } => {
            let tc = existing_cluster(&platform, &cli.namespace, &cluster).await?;
            let http = ReqwestProbe::for_cluster(&platform, &tc, config.checker.http_timeout()).await?;
            let control = TidbControl::new(&http, config.checker.tidb_status_port);
            let healthy = control.get_health(&tc, ordinal).await;
            println!("tidb {}-tidb-{} healthy: {}", cluster, ordinal, healthy);
            if !healthy {
                std::process::exit(1);
            }
        }

        Commands::TidbInfo { cluster, ordinal } => {
            let tc = existing_cluster(&platform, &cli.namespace, &cluster).await?;
            let http = ReqwestProbe::for_cluster(&platform, &tc, config.checker.http_timeout()).await?;
            let info = TidbControl::new(&http, config.checker.tidb_status_port)
                .get_info(&tc, ordinal)
                .await?;
            println!("tidb {}-tidb-{} ddl owner: {}", cluster, ordinal, info.is_owner);
        }

        Commands::TidbLabels {
            cluster,
            ordinal,
            labels,
        } => {
            let labels = labels
                .iter()
                .map(|pair| {
                    pair.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| anyhow::anyhow!("invalid label {:?}, expected key=value", pair))
                })
                .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
            let tc = existing_cluster(&platform, &cli.namespace, &cluster).await?;
            let http = ReqwestProbe::for_cluster(&platform, &tc, config.checker.http_timeout()).await?;
            TidbControl::new(&http, config.checker.tidb_status_port)
                .set_server_labels(&tc, ordinal, &labels)
                .await?;
            println!("Updated labels of {}-tidb-{}", cluster, ordinal);
        }

        Commands::Clean { kind } => {
            platform.clean_resources(&kind, &cli.namespace).await?;
            println!("Deleted all {} in {}", kind, cli.namespace);
        }
    }

    Ok(())
}

async fn existing_cluster(
    platform: &KubePlatform,
    namespace: &str,
    name: &str,
) -> anyhow::Result<TidbCluster> {
    platform
        .get_cluster(namespace, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tidbcluster {}/{} not found", namespace, name))
}
