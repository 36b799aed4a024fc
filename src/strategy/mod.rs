//! Pull strategy (spec §4.4, §4.5): how a single image reference gets
//! materialized onto the node, and how the daemon watches that process to
//! completion. Grounded on original_source/strategy/kubernetes.go's
//! `KubernetesPodPullStrategy`, generalized behind an `Orchestrator` trait
//! so the concrete side-effect-workload client (a real Kubernetes/Argo
//! client per spec §1) stays external.

mod orchestrator;
mod workload_strategy;

pub use orchestrator::{Orchestrator, WorkloadPhase, WorkloadStatus};
pub use workload_strategy::WorkloadPullStrategy;

use async_trait::async_trait;

use crate::image_ref::ImageRef;

/// Pulls a single image onto the node, returning once the pull has either
/// succeeded or definitively failed (spec §4.4).
#[async_trait]
pub trait PullStrategy: Send + Sync {
    async fn pull_image(&self, image: ImageRef) -> anyhow::Result<()>;
}
