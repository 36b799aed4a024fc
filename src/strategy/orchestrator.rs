//! The external-collaborator boundary for dispatching and observing
//! side-effect pull workloads (spec §1, §4.4, §4.5). Grounded on
//! original_source/strategy/kubernetes.go, whose `KubernetesPodPullStrategy`
//! is itself a thin adapter over `client-go`'s pod create/delete/informer
//! calls — the real Kubernetes/Argo client wiring behind this trait is out
//! of scope here, exactly as spec §1 describes external systems.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::image_ref::ImageRef;

/// The classification kubernetes.go's `podImagePullError` /
/// `podImagePullSucceeded` / `handlePodEvent` produce for one observed
/// workload state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadPhase {
    /// Scheduled but not yet running.
    Pending,
    /// Running; no terminal state observed yet.
    Running,
    /// The main container reached a terminal, non-error state (spec §4.4).
    PullSucceeded,
    /// The main container (or its init container) entered an image-pull
    /// error state (`ErrImagePull` / `ImagePullBackOff` in the original).
    PullFailed(String),
    /// Neither success nor a recognized failure — spec §4.4 calls this
    /// impossible and treats it as fatal.
    Unknown(String),
}

/// One observed state transition of a named pull workload.
#[derive(Debug, Clone)]
pub struct WorkloadStatus {
    pub workload_name: String,
    pub phase: WorkloadPhase,
}

/// The side-effect-workload orchestrator: creates the ephemeral workload
/// that attempts to pull an image (init container `copy-warden` + main
/// container `main` with an always-pull policy and a shared `emptyDir`
/// volume, per spec §4.4), reports its lifecycle, and deletes it once
/// terminal.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Creates the pull workload for `image`, named `workload_name`.
    async fn create_pull_workload(&self, workload_name: &str, image: &ImageRef) -> anyhow::Result<()>;

    /// Watches every pull workload's lifecycle until `shutdown` fires,
    /// reporting each observed state over `events`. A single call serves
    /// every workload the orchestrator has been asked to create, the same
    /// way `MonitorPods` runs one shared informer for every pod
    /// `PullImage` creates.
    async fn watch(&self, events: mpsc::Sender<WorkloadStatus>, shutdown: watch::Receiver<bool>);

    /// Deletes a terminal workload.
    async fn delete_workload(&self, workload_name: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
pub mod testing {
    //! An in-memory `Orchestrator` test double, in the spirit of
    //! `catalog::testing::InMemoryCatalog` — test tooling only, never wired
    //! into `main`.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    pub struct MockOrchestrator {
        created: Mutex<HashMap<String, ImageRef>>,
        deleted: Mutex<Vec<String>>,
        pending_events: Mutex<VecDeque<WorkloadStatus>>,
        notify: Notify,
    }

    impl MockOrchestrator {
        pub fn new() -> Self {
            Self {
                created: Mutex::new(HashMap::new()),
                deleted: Mutex::new(Vec::new()),
                pending_events: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
            }
        }

        /// Schedules a status to be reported the next time `watch` polls.
        pub fn push_event(&self, workload_name: impl Into<String>, phase: WorkloadPhase) {
            self.pending_events.lock().unwrap().push_back(WorkloadStatus {
                workload_name: workload_name.into(),
                phase,
            });
            self.notify.notify_one();
        }

        pub fn created_workloads(&self) -> Vec<String> {
            self.created.lock().unwrap().keys().cloned().collect()
        }

        pub fn deleted_workloads(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Orchestrator for MockOrchestrator {
        async fn create_pull_workload(&self, workload_name: &str, image: &ImageRef) -> anyhow::Result<()> {
            self.created
                .lock()
                .unwrap()
                .insert(workload_name.to_string(), image.clone());
            Ok(())
        }

        async fn watch(&self, events: mpsc::Sender<WorkloadStatus>, mut shutdown: watch::Receiver<bool>) {
            loop {
                let next = self.pending_events.lock().unwrap().pop_front();
                match next {
                    Some(status) => {
                        if events.send(status).await.is_err() {
                            return;
                        }
                    }
                    None => {
                        tokio::select! {
                            _ = self.notify.notified() => continue,
                            _ = shutdown.changed() => {
                                if *shutdown.borrow() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        }

        async fn delete_workload(&self, workload_name: &str) -> anyhow::Result<()> {
            self.deleted.lock().unwrap().push(workload_name.to_string());
            Ok(())
        }
    }
}
