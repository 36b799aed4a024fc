//! Composition root (spec §1, §6). Mirrors
//! original_source/cmd/image-cache-daemon.go's `NewImageCacheDaemonCommand`
//! and services/node-agent/src/main.rs's tracing-init + spawn +
//! wait-for-signal shape.
//!
//! Building concrete `Catalog<T>` / `Orchestrator` adapters against a real
//! cluster control plane is an external collaborator per spec §1 ("the
//! concrete client libraries for talking to the cluster control plane...
//! are treated as external") and is out of scope for this crate; the two
//! `build_*` functions below are the seam a production deployment fills in.

use std::sync::Arc;

use image_cache_daemon::catalog::Catalog;
use image_cache_daemon::config::Config;
use image_cache_daemon::extractor::WorkloadObject;
use image_cache_daemon::puller::Puller;
use image_cache_daemon::source::{
    config_object_source, static_source, workload_template_source, ConfigObject, LabelSelector,
};
use image_cache_daemon::strategy::{Orchestrator, WorkloadPullStrategy};

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Production `Catalog<T>` backends for every watch-based source, supplied
/// by whatever concrete Kubernetes/Argo client adapter a deployment wires
/// in. `None` for a catalog means that watch flag is enabled in config but
/// no backend was supplied; the daemon logs and skips that source rather
/// than failing the whole process, matching spec §7's "per-source faults
/// stay within the source" propagation policy.
#[derive(Default)]
struct ProductionCatalogs {
    config_objects: Option<Arc<dyn Catalog<ConfigObject>>>,
    workflow_templates: Option<Arc<dyn Catalog<WorkloadObject>>>,
    cluster_workflow_templates: Option<Arc<dyn Catalog<WorkloadObject>>>,
    cron_workflows: Option<Arc<dyn Catalog<WorkloadObject>>>,
}

/// Out of scope here: a production deployment links in a concrete
/// Kubernetes/Argo client crate and returns its informer-backed catalogs.
fn build_catalogs(_config: &Config) -> ProductionCatalogs {
    ProductionCatalogs::default()
}

/// Out of scope here: a production deployment links in a concrete
/// Kubernetes client crate and returns a pod-backed `Orchestrator`.
fn build_orchestrator(_config: &Config) -> Option<Arc<dyn Orchestrator>> {
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse_args();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(node = %config.node_name, pod = %config.pod_name, "starting image-cache-daemon");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx.clone());

    let Some(orchestrator) = build_orchestrator(&config) else {
        warn!("no Orchestrator backend configured; the daemon cannot dispatch pulls in this build");
        anyhow::bail!("no Orchestrator backend configured");
    };

    let strategy = WorkloadPullStrategy::new(orchestrator);
    let puller = Arc::new(Puller::new(strategy.clone()));

    let catalogs = build_catalogs(&config);

    if !config.images.is_empty() {
        let handle = static_source(
            config.images.iter().map(|s| s.as_str().into()).collect(),
            config.resync_period,
        );
        puller.add_source("static", handle);
    }

    if config.watch_configmaps {
        match catalogs.config_objects {
            Some(catalog) => {
                let (key, value) = config.configmap_selector_parts()?;
                let handle = config_object_source("config-object", catalog, LabelSelector { key, value });
                puller.add_source("config-object", handle);
            }
            None => warn!("--watch-configmaps is set but no configuration-object catalog backend is configured, skipping"),
        }
    }

    if config.watch_argo_workflow_templates {
        match catalogs.workflow_templates {
            Some(catalog) => {
                let handle = workload_template_source("workflow-template", catalog);
                puller.add_source("workflow-template", handle);
            }
            None => warn!("--watch-argo-workflow-templates is set but no backend is configured, skipping"),
        }
    }

    if config.watch_argo_cluster_workflow_templates {
        match catalogs.cluster_workflow_templates {
            Some(catalog) => {
                let handle = workload_template_source("cluster-workflow-template", catalog);
                puller.add_source("cluster-workflow-template", handle);
            }
            None => warn!("--watch-argo-cluster-workflow-templates is set but no backend is configured, skipping"),
        }
    }

    if config.watch_argo_cron_workflows {
        match catalogs.cron_workflows {
            Some(catalog) => {
                let handle = workload_template_source("cron-workflow", catalog);
                puller.add_source("cron-workflow", handle);
            }
            None => warn!("--watch-argo-cron-workflows is set but no backend is configured, skipping"),
        }
    }

    let monitor = tokio::spawn({
        let strategy = strategy.clone();
        let shutdown_rx = shutdown_rx.clone();
        async move { strategy.run(shutdown_rx).await }
    });

    puller.run(shutdown_rx).await;
    monitor.await?;

    info!("image-cache-daemon shut down cleanly");
    Ok(())
}

fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }

        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });
}
