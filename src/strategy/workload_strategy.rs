//! The side-effect-workload pull strategy and its embedded monitor (spec
//! §4.4, §4.5). Grounded on original_source/strategy/kubernetes.go's
//! `PullImage` (pod create) and `handlePodEvent` (classify, delete, react),
//! with the per-workload waiter shape borrowed from
//! services/node-agent/src/actors/image.rs's `PullInProgress` (waiters
//! notified once on completion).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::orchestrator::{Orchestrator, WorkloadPhase, WorkloadStatus};
use super::PullStrategy;
use crate::error::{InvariantViolation, PullDispatchError};
use crate::image_ref::ImageRef;

enum WorkloadOutcome {
    Succeeded,
    Failed(String),
}

/// Dispatches pulls as ephemeral side-effect workloads and watches their
/// lifecycle via a single shared `Orchestrator::watch` stream, the same way
/// one `MonitorPods` informer serves every pod `PullImage` creates.
struct Waiter {
    image: ImageRef,
    reply_to: oneshot::Sender<WorkloadOutcome>,
}

pub struct WorkloadPullStrategy {
    orchestrator: Arc<dyn Orchestrator>,
    waiters: Mutex<HashMap<String, Waiter>>,
}

impl WorkloadPullStrategy {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            waiters: Mutex::new(HashMap::new()),
        })
    }

    /// Runs the shared monitor loop until `shutdown` fires. Must be spawned
    /// once, alongside the puller, in `main`.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let (tx, mut rx) = mpsc::channel(64);
        let orchestrator = self.orchestrator.clone();
        let watch_task = tokio::spawn(async move { orchestrator.watch(tx, shutdown).await });

        while let Some(status) = rx.recv().await {
            self.handle_status(status).await;
        }

        let _ = watch_task.await;
    }

    async fn handle_status(&self, status: WorkloadStatus) {
        let WorkloadStatus { workload_name, phase } = status;

        let outcome = match phase {
            WorkloadPhase::Pending | WorkloadPhase::Running => return,
            WorkloadPhase::PullSucceeded => WorkloadOutcome::Succeeded,
            WorkloadPhase::PullFailed(reason) => WorkloadOutcome::Failed(reason),
            WorkloadPhase::Unknown(detail) => {
                let image = self
                    .waiters
                    .lock()
                    .await
                    .get(&workload_name)
                    .map(|waiter| waiter.image.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let violation = InvariantViolation {
                    workload: workload_name.clone(),
                    image,
                    detail,
                };
                error!(workload = %workload_name, error = %violation, "fatal invariant violation");
                panic!("{violation}");
            }
        };

        info!(workload = %workload_name, "pull workload reached a terminal state, deleting it");
        if let Err(err) = self.orchestrator.delete_workload(&workload_name).await {
            warn!(workload = %workload_name, error = %err, "failed to delete terminal pull workload");
        }

        if let Some(waiter) = self.waiters.lock().await.remove(&workload_name) {
            let _ = waiter.reply_to.send(outcome);
        }
    }
}

#[async_trait]
impl PullStrategy for WorkloadPullStrategy {
    async fn pull_image(&self, image: ImageRef) -> anyhow::Result<()> {
        let workload_name = format!("image-cache-daemon-pull-{}", Uuid::new_v4());
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.insert(
            workload_name.clone(),
            Waiter {
                image: image.clone(),
                reply_to: tx,
            },
        );

        if let Err(err) = self.orchestrator.create_pull_workload(&workload_name, &image).await {
            self.waiters.lock().await.remove(&workload_name);
            return Err(PullDispatchError::WorkloadCreateFailed {
                image: image.to_string(),
                cause: err,
            }
            .into());
        }

        match rx.await {
            Ok(WorkloadOutcome::Succeeded) => Ok(()),
            Ok(WorkloadOutcome::Failed(reason)) => {
                anyhow::bail!("image pull failed for {image}: {reason}")
            }
            Err(_) => {
                anyhow::bail!("pull workload monitor dropped before reporting an outcome for {image}")
            }
        }
    }
}
